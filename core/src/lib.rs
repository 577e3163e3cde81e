//! Client-side data access for the posts API.
//!
//! # Overview
//! Typed query and mutation endpoints over a pluggable transport, with
//! runtime validation of outgoing bodies and incoming payloads, tag-based
//! cache invalidation, and optimistic updates that roll back on failure.
//!
//! # Design
//! - `Transport` is the I/O seam. `FetchTransport` speaks HTTP via reqwest;
//!   tests substitute scripted transports.
//! - `WithValidation` decorates any transport with the argument and data
//!   schemas each `Endpoint` declares. Every failure comes back as an
//!   `OperationError` value.
//! - `PostsApi` owns the decorated transport and an injected `CacheStore`
//!   handle; reads provide cache tags, writes invalidate them.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod schema;
pub mod transport;
pub mod types;
pub mod validation;

#[cfg(test)]
mod testing;

pub use api::{Endpoint, EndpointKind, PostsApi};
pub use cache::{CacheStore, CacheTag, CachedValue, PatchRecord, QueryKey, TagId, TagType};
pub use config::{ApiConfig, ConfigError};
pub use error::{OperationError, SchemaError, ValidationIssue};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use schema::{Schema, Shape, ShapeSchema};
pub use transport::{CallOptions, FetchTransport, Transport};
pub use types::{
    DeletePostResponse, NewPost, Post, PostAuthor, PostDraft, PostExcerpt, PostPatch,
};
pub use validation::{with_validation, WithValidation};
