//! Schema validation wrapped around an arbitrary transport.
//!
//! # Design
//! `WithValidation` is a decorator: it implements `Transport` over any inner
//! `Transport` and is composed once when the API is built. It holds no
//! mutable state, so one instance serves any number of in-flight calls.
//!
//! Order of a call:
//! 1. the argument schema gates the body; the normalized value is discarded
//!    and the original body is sent,
//! 2. the inner transport runs; its errors pass through untouched,
//! 3. the data schema parses the payload and its normalized value replaces
//!    the payload,
//! 4. when no data schema is set, the optional check runs against the
//!    payload instead.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::OperationError;
use crate::http::HttpRequest;
use crate::transport::{CallOptions, Transport};

/// Validating decorator over an inner transport.
#[derive(Debug, Clone)]
pub struct WithValidation<T> {
    inner: T,
}

/// Wrap `base` so every call is validated against its `CallOptions`.
pub fn with_validation<T: Transport>(base: T) -> WithValidation<T> {
    WithValidation { inner: base }
}

impl<T: Transport> Transport for WithValidation<T> {
    async fn call(
        &self,
        request: HttpRequest,
        options: &CallOptions,
    ) -> Result<Option<Value>, OperationError> {
        if let Some(schema) = options.argument_schema {
            let null = Value::Null;
            let body = request.body.as_ref().unwrap_or(&null);
            if let Err(err) = schema.parse(body) {
                warn!(schema = schema.name(), path = %request.path, %err, "request body rejected");
                return Err(OperationError::from_argument_failure(err));
            }
            debug!(schema = schema.name(), path = %request.path, "request body accepted");
        }

        let path = request.path.clone();
        let Some(mut data) = self.inner.call(request, options).await? else {
            return Ok(None);
        };

        if let Some(schema) = options.data_schema {
            data = schema.parse(&data).map_err(|err| {
                warn!(schema = schema.name(), %path, %err, "response payload rejected");
                OperationError::from_response_failure(&err)
            })?;
            debug!(schema = schema.name(), %path, "response payload accepted");
        } else if let Some(check) = options.validate {
            check(&data).map_err(|err| {
                warn!(%path, %err, "response payload failed check");
                OperationError::from_response_failure(&err)
            })?;
        }

        Ok(Some(data))
    }
}
