//! The server's response envelope.
//!
//! Every endpoint answers with `{code, success?, message?, data?, time}`. A
//! [`Response`] is immutable once decoded.

use crate::{Error, Result};
use reqwest::StatusCode;
use serde_json::{Map, Value};

/// Parsed response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    code: i64,
    success: Option<bool>,
    message: Option<String>,
    data: Option<Value>,
    time: f64,
    body: Map<String, Value>,
}

impl Response {
    /// Decodes an envelope from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the value is not an object or carries no integer `code`.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(body) = value else {
            return Err(Error::ParseError(
                "response envelope is not a JSON object".to_string(),
            ));
        };

        let code = body
            .get("code")
            .and_then(value_to_i64)
            .ok_or_else(|| Error::ParseError("response envelope has no code".to_string()))?;
        let success = body.get("success").and_then(value_to_bool);
        let message = body
            .get("message")
            .and_then(|value| value.as_str().map(str::to_string));
        let data = body.get("data").filter(|value| !value.is_null()).cloned();
        let time = body.get("time").and_then(value_to_f64).unwrap_or_default();

        Ok(Self {
            code,
            success,
            message,
            data,
            time,
            body,
        })
    }

    /// Decodes an envelope from a raw HTTP exchange.
    ///
    /// Error statuses whose body is not an envelope (a proxy error page, for instance)
    /// are turned into a failed response carrying the HTTP status and body text.
    ///
    /// # Errors
    ///
    /// Returns a parse error if a successful status carries a body that is not an envelope.
    pub fn from_http(status: StatusCode, bytes: &[u8]) -> Result<Self> {
        let decoded = serde_json::from_slice::<Value>(bytes)
            .map_err(Error::from)
            .and_then(Self::from_value);

        match decoded {
            Ok(response) => Ok(response),
            Err(err) if status.is_success() => Err(err),
            Err(_) => {
                let text = String::from_utf8_lossy(bytes).trim().to_string();
                let mut body = Map::new();
                body.insert("code".to_string(), Value::from(status.as_u16()));
                body.insert("success".to_string(), Value::Bool(false));
                body.insert("message".to_string(), Value::String(text.clone()));
                Ok(Self {
                    code: i64::from(status.as_u16()),
                    success: Some(false),
                    message: Some(text).filter(|text| !text.is_empty()),
                    data: None,
                    time: 0.0,
                    body,
                })
            }
        }
    }

    /// Status code reported by the envelope.
    #[must_use]
    pub const fn code(&self) -> i64 {
        self.code
    }

    /// Success flag, when the envelope carries one.
    #[must_use]
    pub const fn success(&self) -> Option<bool> {
        self.success
    }

    /// Whether the call succeeded; falls back to the code when no flag was sent.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or((200..300).contains(&self.code))
    }

    /// Server message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Payload, absent when the envelope has no data or `data: null`.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Consumes the response and returns its payload.
    #[must_use]
    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    /// Server-side processing time in seconds.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// The full decoded envelope.
    #[must_use]
    pub const fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Top-level `id` of the envelope, as returned after a create.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.body.get("id").and_then(value_to_u64)
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_full_envelope() {
        let response = Response::from_value(json!({
            "code": 200,
            "success": true,
            "message": "ok",
            "data": [{"id": "1"}],
            "time": 0.012
        }))
        .unwrap();

        assert_eq!(response.code(), 200);
        assert_eq!(response.success(), Some(true));
        assert!(response.is_success());
        assert_eq!(response.message(), Some("ok"));
        assert_eq!(response.data(), Some(&json!([{"id": "1"}])));
        assert!((response.time() - 0.012).abs() < f64::EPSILON);
        assert_eq!(response.body().len(), 5);
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let response = Response::from_value(json!({"code": 201, "time": 0.5})).unwrap();
        assert_eq!(response.success(), None);
        assert!(response.is_success());
        assert!(response.message().is_none());
        assert!(response.data().is_none());
    }

    #[test]
    fn null_data_is_absent() {
        let response = Response::from_value(json!({"code": 200, "data": null, "time": 0.1})).unwrap();
        assert!(response.data().is_none());
    }

    #[test]
    fn success_flag_accepts_integers() {
        let response =
            Response::from_value(json!({"code": 200, "success": 0, "time": 0.1})).unwrap();
        assert_eq!(response.success(), Some(false));
        assert!(!response.is_success());

        let response =
            Response::from_value(json!({"code": "200", "success": "1", "time": "0.1"})).unwrap();
        assert_eq!(response.code(), 200);
        assert_eq!(response.success(), Some(true));
    }

    #[test]
    fn missing_code_is_a_parse_error() {
        let err = Response::from_value(json!({"success": true})).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));

        let err = Response::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn create_id_is_read_from_envelope() {
        let response =
            Response::from_value(json!({"code": 201, "success": true, "id": "42", "time": 0.1}))
                .unwrap();
        assert_eq!(response.id(), Some(42));
    }

    #[test]
    fn error_page_becomes_failed_response() {
        let response =
            Response::from_http(StatusCode::BAD_GATEWAY, b"<html>Bad Gateway</html>").unwrap();
        assert_eq!(response.code(), 502);
        assert_eq!(response.success(), Some(false));
        assert_eq!(response.message(), Some("<html>Bad Gateway</html>"));
    }

    #[test]
    fn garbage_with_success_status_is_parse_error() {
        let err = Response::from_http(StatusCode::OK, b"not json").unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn error_status_with_envelope_keeps_envelope() {
        let body = br#"{"code":409,"success":false,"message":"Section already exists","time":0.01}"#;
        let response = Response::from_http(StatusCode::CONFLICT, body).unwrap();
        assert_eq!(response.code(), 409);
        assert_eq!(response.message(), Some("Section already exists"));
    }
}
