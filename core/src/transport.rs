//! The transport seam and its reqwest-backed implementation.
//!
//! # Design
//! A `Transport` takes an `HttpRequest` plus the per-endpoint `CallOptions`
//! and yields the response payload or an `OperationError`. Base transports
//! ignore the options; decorators such as `WithValidation` read them. Both
//! sides share the one trait so wrappers compose statically around any base.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{OperationError, SchemaError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::schema::Schema;

/// Check-only response validator; it never transforms the payload.
pub type ResponseCheck = fn(&Value) -> Result<(), SchemaError>;

/// Per-endpoint options handed to every transport layer.
#[derive(Clone, Copy, Default)]
pub struct CallOptions {
    /// Validates the outgoing body before any I/O.
    pub argument_schema: Option<&'static dyn Schema>,
    /// Validates and normalizes the response payload.
    pub data_schema: Option<&'static dyn Schema>,
    pub validate: Option<ResponseCheck>,
}

impl CallOptions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_argument_schema(mut self, schema: &'static dyn Schema) -> Self {
        self.argument_schema = Some(schema);
        self
    }

    pub fn with_data_schema(mut self, schema: &'static dyn Schema) -> Self {
        self.data_schema = Some(schema);
        self
    }

    pub fn with_validate(mut self, check: ResponseCheck) -> Self {
        self.validate = Some(check);
        self
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("argument_schema", &self.argument_schema.map(|s| s.name()))
            .field("data_schema", &self.data_schema.map(|s| s.name()))
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// Performs one request and returns its payload, if any.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn call(
        &self,
        request: HttpRequest,
        options: &CallOptions,
    ) -> Result<Option<Value>, OperationError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    async fn call(
        &self,
        request: HttpRequest,
        options: &CallOptions,
    ) -> Result<Option<Value>, OperationError> {
        (**self).call(request, options).await
    }
}

/// Base transport over HTTP, rooted at a base URL.
#[derive(Debug, Clone)]
pub struct FetchTransport {
    base_url: String,
    client: reqwest::Client,
}

impl FetchTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(&config.base_url)
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Execute the round-trip without interpreting the status.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, OperationError> {
        let url = self.url_for(&request.path);
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        debug!(method = request.method.as_str(), %url, "sending request");

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            let bytes =
                serde_json::to_vec(body).map_err(|e| OperationError::Serialization(e.to_string()))?;
            builder = builder.body(bytes);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| OperationError::Fetch(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| OperationError::Fetch(e.to_string()))?;
        debug!(status, %url, "received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for FetchTransport {
    async fn call(
        &self,
        request: HttpRequest,
        _options: &CallOptions,
    ) -> Result<Option<Value>, OperationError> {
        self.execute(request).await?.into_payload()
    }
}
