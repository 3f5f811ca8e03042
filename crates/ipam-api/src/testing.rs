//! In-memory transport for tests.
//!
//! [`ScriptedTransport`] answers requests from a queue of canned responses and
//! records every request it receives. Enabled by the `test-util` feature.

use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::Result;
use async_trait::async_trait;
use ipam_core::Error;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Transport that replays queued responses in order.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Creates a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw response.
    pub fn push(&self, response: HttpResponse) -> &Self {
        self.push_result(Ok(response))
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: Error) -> &Self {
        self.push_result(Err(error))
    }

    /// Queues a successful envelope carrying `data`.
    pub fn push_data(&self, data: Value) -> &Self {
        self.push(ok_envelope(data))
    }

    /// Queues an envelope body with the given HTTP status.
    pub fn push_json(&self, status: StatusCode, body: &Value) -> &Self {
        self.push(HttpResponse::new(status, body.to_string()))
    }

    /// Queues a successful login answer.
    pub fn push_login(&self, token: &str, expires: &str) -> &Self {
        self.push_data(json!({"token": token, "expires": expires}))
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push_result(&self, reply: Result<HttpResponse>) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(Error::HttpError(format!(
                    "no scripted response for {} {}",
                    request.method, request.url
                )))
            })
    }
}

/// A `200` response with a successful envelope around `data`.
#[must_use]
pub fn ok_envelope(data: Value) -> HttpResponse {
    HttpResponse::new(
        StatusCode::OK,
        json!({"code": 200, "success": true, "data": data, "time": 0.001}).to_string(),
    )
}

/// A response with a failed envelope.
#[must_use]
pub fn error_envelope(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::new(
        status,
        json!({"code": status.as_u16(), "success": false, "message": message, "time": 0.001})
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use url::Url;

    #[tokio::test]
    async fn replays_in_order_and_records() {
        let transport = ScriptedTransport::new();
        transport
            .push_data(json!([1]))
            .push(error_envelope(StatusCode::NOT_FOUND, "gone"));

        let url = Url::parse("https://ipam.example.com/api/app/").unwrap();
        let first = transport
            .send(HttpRequest::new(Method::GET, url.clone()))
            .await
            .unwrap();
        assert_eq!(first.status, StatusCode::OK);

        let second = transport
            .send(HttpRequest::new(Method::DELETE, url.clone()))
            .await
            .unwrap();
        assert_eq!(second.status, StatusCode::NOT_FOUND);

        assert!(transport.send(HttpRequest::new(Method::GET, url)).await.is_err());
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(transport.remaining(), 0);
    }
}
