//! Scripted transport shared by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::Value;

use crate::error::OperationError;
use crate::http::HttpRequest;
use crate::transport::{CallOptions, Transport};

pub type Outcome = Result<Option<Value>, OperationError>;

/// Answers with queued outcomes and records what it was asked.
#[derive(Default)]
pub struct Scripted {
    outcomes: RefCell<VecDeque<Outcome>>,
    seen: RefCell<Vec<HttpRequest>>,
}

impl Scripted {
    pub fn answering(outcome: Outcome) -> Self {
        let scripted = Self::default();
        scripted.push(outcome);
        scripted
    }

    pub fn push(&self, outcome: Outcome) {
        self.outcomes.borrow_mut().push_back(outcome);
    }

    pub fn calls(&self) -> usize {
        self.seen.borrow().len()
    }

    pub fn request(&self, index: usize) -> HttpRequest {
        self.seen.borrow()[index].clone()
    }
}

impl Transport for Scripted {
    async fn call(&self, request: HttpRequest, _options: &CallOptions) -> Outcome {
        self.seen.borrow_mut().push(request);
        self.outcomes.borrow_mut().pop_front().unwrap_or(Ok(None))
    }
}

pub fn server_error() -> OperationError {
    OperationError::Transport {
        status: 500,
        raw_data: r#"{"error":"Oh no, there was an error"}"#.to_string(),
    }
}
