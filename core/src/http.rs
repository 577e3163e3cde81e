//! HTTP types shared by the transport and the endpoint registry.
//!
//! # Design
//! Requests and responses are plain data. Endpoints build `HttpRequest`
//! values with a path relative to the API root; a `Transport` resolves the
//! path against its base URL and executes the round-trip. Keeping the
//! request as data lets the validating layer inspect the body before any
//! I/O happens and lets tests script responses without a network.

use serde_json::Value;

use crate::error::OperationError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Path relative to the API root, without a leading slash (`posts/1`).
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            ..Self::get(path)
        }
    }

    /// A request carrying a JSON body.
    pub fn with_json(method: HttpMethod, path: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Map the raw response onto the transport contract.
    ///
    /// A 2xx with an empty body carries no data. Any non-2xx becomes
    /// `OperationError::Transport` with the raw body attached.
    pub fn into_payload(self) -> Result<Option<Value>, OperationError> {
        if !(200..300).contains(&self.status) {
            return Err(OperationError::Transport {
                status: self.status,
                raw_data: self.body,
            });
        }
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&self.body)
            .map(Some)
            .map_err(|_| OperationError::Parsing {
                status: self.status,
                raw_data: self.body,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn json_body_becomes_data() {
        let data = response(200, r#"{"id":"1","name":"A"}"#).into_payload().unwrap();
        assert_eq!(data.unwrap()["name"], "A");
    }

    #[test]
    fn empty_success_has_no_data() {
        assert!(response(204, "").into_payload().unwrap().is_none());
    }

    #[test]
    fn non_success_keeps_status_and_raw_body() {
        let err = response(500, r#"{"error":"Oh no"}"#).into_payload().unwrap_err();
        assert_eq!(
            err,
            OperationError::Transport {
                status: 500,
                raw_data: r#"{"error":"Oh no"}"#.to_string()
            }
        );
    }

    #[test]
    fn non_json_success_is_a_parsing_error() {
        let err = response(200, "not json").into_payload().unwrap_err();
        assert!(matches!(err, OperationError::Parsing { status: 200, .. }));
    }

    #[test]
    fn json_request_sets_content_type() {
        let req = HttpRequest::with_json(HttpMethod::Post, "posts", serde_json::json!({}));
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        assert_eq!(req.method.as_str(), "POST");
    }
}
