//! Error types for the posts client.
//!
//! # Design
//! Every failure of an operation is returned as an `OperationError` value so
//! callers can branch on its shape: argument rejections (`Issues`,
//! `Argument`) happen before any I/O, transport failures (`Transport`,
//! `Fetch`, `Parsing`) come from the wire, and `Validation` means the server
//! answered with something the client contract does not accept.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status reported for response-validation failures.
pub const VALIDATION_STATUS: u16 = 400;

/// One problem found by a schema parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub message: String,
}

impl ValidationIssue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure of a schema parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Structured failure exposing every issue found.
    #[error("{} validation issue(s): {}", .0.len(), join_messages(.0))]
    Issues(Vec<ValidationIssue>),

    /// Failure without an issue list.
    #[error("{0}")]
    Other(String),
}

impl SchemaError {
    pub fn issue(message: impl Into<String>) -> Self {
        SchemaError::Issues(vec![ValidationIssue::new(message)])
    }

    /// Stringified form carried in `OperationError::Validation::raw_data`.
    pub fn to_raw_data(&self) -> String {
        match self {
            SchemaError::Issues(issues) => {
                serde_json::to_string(issues).unwrap_or_else(|_| join_messages(issues))
            }
            SchemaError::Other(msg) => msg.clone(),
        }
    }
}

/// Errors returned by every posts operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {raw_data}")]
    Transport { status: u16, raw_data: String },

    /// The request never produced a response (connection refused, reset, ...).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A 2xx response whose body is not JSON.
    #[error("HTTP {status}: unparseable body: {raw_data}")]
    Parsing { status: u16, raw_data: String },

    /// The response payload failed its data schema or check.
    #[error("response validation failed (HTTP {status}): {raw_data}")]
    Validation { status: u16, raw_data: String },

    /// The request body failed its argument schema. `message` is a JSON array
    /// of the issue messages.
    #[error("invalid arguments: {message}")]
    Issues { message: String },

    /// The request body failed its argument schema without an issue list.
    #[error("invalid arguments: {0}")]
    Argument(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl OperationError {
    /// Build the argument-rejection error for a failed argument parse.
    pub fn from_argument_failure(err: SchemaError) -> Self {
        match err {
            SchemaError::Issues(issues) => {
                let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
                OperationError::Issues {
                    message: serde_json::to_string(&messages)
                        .unwrap_or_else(|_| messages.join("; ")),
                }
            }
            SchemaError::Other(msg) => OperationError::Argument(msg),
        }
    }

    /// Build the response-validation error for a failed data parse.
    pub fn from_response_failure(err: &SchemaError) -> Self {
        OperationError::Validation {
            status: VALIDATION_STATUS,
            raw_data: err.to_raw_data(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, OperationError::Validation { .. })
    }

    /// True for failures raised before the transport was invoked.
    pub fn is_argument_rejection(&self) -> bool {
        matches!(
            self,
            OperationError::Issues { .. } | OperationError::Argument(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OperationError::Transport { status: 404, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            OperationError::Transport { status, .. }
            | OperationError::Parsing { status, .. }
            | OperationError::Validation { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Issue messages of an `Issues` error, decoded back into a list.
    pub fn issue_messages(&self) -> Option<Vec<String>> {
        match self {
            OperationError::Issues { message } => serde_json::from_str(message).ok(),
            _ => None,
        }
    }
}

fn join_messages(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_issues_serialize_to_message_list() {
        let err = OperationError::from_argument_failure(SchemaError::Issues(vec![
            ValidationIssue::new("first"),
            ValidationIssue::new("second"),
        ]));
        assert_eq!(
            err,
            OperationError::Issues {
                message: r#"["first","second"]"#.to_string()
            }
        );
        assert_eq!(
            err.issue_messages().unwrap(),
            vec!["first".to_string(), "second".to_string()]
        );
        assert!(err.is_argument_rejection());
    }

    #[test]
    fn unstructured_argument_failure_is_wrapped() {
        let err = OperationError::from_argument_failure(SchemaError::Other("boom".into()));
        assert_eq!(err, OperationError::Argument("boom".into()));
        assert!(err.issue_messages().is_none());
    }

    #[test]
    fn response_failure_is_validation_tagged_with_400() {
        let err = OperationError::from_response_failure(&SchemaError::issue("missing field `id`"));
        assert!(err.is_validation());
        assert_eq!(err.status(), Some(400));
        match err {
            OperationError::Validation { raw_data, .. } => {
                assert_eq!(raw_data, r#"[{"message":"missing field `id`"}]"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn not_found_is_a_transport_404() {
        let err = OperationError::Transport {
            status: 404,
            raw_data: String::new(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn schema_error_display_lists_messages() {
        let err = SchemaError::Issues(vec![ValidationIssue::new("a"), ValidationIssue::new("b")]);
        assert_eq!(err.to_string(), "2 validation issue(s): a; b");
    }
}
