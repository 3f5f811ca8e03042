//! End-to-end connection tests against a local HTTP server.
//!
//! The token scheme always targets `https://`, so token tests route requests
//! through a loopback transport that rewrites them onto the mock server.

use async_trait::async_trait;
use ipam_api::{Connection, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use ipam_core::client::ClientConfig;
use ipam_core::{ConnectionConfig, Error, Params, SigningScheme};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_fixture(name: &str) -> Value {
    let fixture_path = fixtures_dir().join(name);
    let raw = fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    });
    serde_json::from_str(&raw).unwrap()
}

struct LoopbackTransport {
    inner: ReqwestTransport,
    target: Url,
}

impl LoopbackTransport {
    fn new(server: &MockServer) -> Arc<Self> {
        Arc::new(Self {
            inner: ReqwestTransport::new(&ClientConfig::new(), false).unwrap(),
            target: Url::parse(&server.uri()).unwrap(),
        })
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&self, mut request: HttpRequest) -> ipam_api::Result<HttpResponse> {
        request.url.set_scheme(self.target.scheme()).unwrap();
        request.url.set_host(self.target.host_str()).unwrap();
        request.url.set_port(self.target.port()).unwrap();
        self.inner.send(request).await
    }
}

fn token_config() -> ConnectionConfig {
    ConnectionConfig::new("ipam.example.com", "test", SigningScheme::TlsToken)
        .unwrap()
        .with_credentials("user", "pass")
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/test/user/"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(load_fixture("login.json")))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_then_list_subnets() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let listing = load_fixture("subnet_list.json");
    Mock::given(method("GET"))
        .and(path("/api/test/subnets/"))
        .and(header("token", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let connection = Connection::initialize(token_config(), LoopbackTransport::new(&server))
        .await
        .unwrap();
    assert_eq!(connection.token().await.as_deref(), Some("abc"));

    let response = connection
        .call("get", "subnets", &[], &Params::new())
        .await
        .unwrap();

    assert_eq!(response.success(), Some(true));
    assert_eq!(response.code(), 200);
    assert_eq!(response.data(), listing.get("data"));
}

#[tokio::test]
async fn test_terminate_deletes_user_session() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/api/test/user/"))
        .and(header("token", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"code":200,"success":true,"data":"User destroyed","time":0.002}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let connection = Connection::initialize(token_config(), LoopbackTransport::new(&server))
        .await
        .unwrap();
    connection.terminate().await;

    let err = connection
        .call("get", "sections", &[], &Params::new())
        .await
        .unwrap_err();
    assert!(err.is_config());
}

#[tokio::test]
async fn test_proxy_error_page_is_a_request_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/test/vlan/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let connection = Connection::initialize(token_config(), LoopbackTransport::new(&server))
        .await
        .unwrap();
    let err = connection
        .call("GET", "VLAN", &[], &Params::new())
        .await
        .unwrap_err();

    match err {
        Error::RequestError { response, message } => {
            assert_eq!(response.code(), 502);
            assert_eq!(message, "Bad Gateway");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_shared_secret_request_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .and(query_param("app_id", "test"))
        .and(header("cipher", "openssl"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"code":200,"success":true,"data":[{"id":"1","name":"Customers"}],"time":0.003}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let config = ConnectionConfig::new(server.uri(), "test", SigningScheme::SharedSecret)
        .unwrap()
        .with_api_key("0123456789abcdef0123456789abcdef");
    assert!(config.base_url().starts_with("http://"));

    let connection = Connection::connect(config).await.unwrap();
    let response = connection
        .call("get", "sections", &[], &Params::new())
        .await
        .unwrap();

    assert!(response.is_success());
    assert!(connection.token().await.is_none());

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or_default().to_string();
    assert!(query.contains("enc_request="));
}
