//! Endpoint registry for the posts resource.
//!
//! # Design
//! `Endpoint` declares each named operation: whether it reads or writes and
//! which schemas guard it. `PostsApi` executes them over a validating
//! transport and keeps the injected `CacheStore` in step:
//!
//! - reads serve fresh cache entries, otherwise fetch and store the result
//!   together with the tags it provides,
//! - successful writes invalidate the tags they may have changed,
//! - `update_post` patches the cached post before the request and rolls the
//!   patch back if the request fails; a rollback that cannot restore the
//!   pre-call value stales the post instead.
//!
//! No operation retries.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::cache::{CacheStore, CacheTag, CachedValue, QueryKey};
use crate::error::{OperationError, SchemaError};
use crate::http::{HttpMethod, HttpRequest};
use crate::schema::{NEW_POST_SCHEMA, POSTS_RESPONSE_SCHEMA};
use crate::transport::{CallOptions, Transport};
use crate::types::{DeletePostResponse, Post, PostDraft, PostPatch};
use crate::validation::{with_validation, WithValidation};

/// Message surfaced in place of schema details when the post list is rejected.
pub const LIST_VALIDATION_MESSAGE: &str = "Validation error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Query,
    Mutation,
}

/// The named operations over the posts resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    GetPosts,
    GetPost,
    AddPost,
    UpdatePost,
    DeletePost,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::GetPosts,
        Endpoint::GetPost,
        Endpoint::AddPost,
        Endpoint::UpdatePost,
        Endpoint::DeletePost,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Endpoint::GetPosts => "getPosts",
            Endpoint::GetPost => "getPost",
            Endpoint::AddPost => "addPost",
            Endpoint::UpdatePost => "updatePost",
            Endpoint::DeletePost => "deletePost",
        }
    }

    pub fn kind(self) -> EndpointKind {
        match self {
            Endpoint::GetPosts | Endpoint::GetPost => EndpointKind::Query,
            Endpoint::AddPost | Endpoint::UpdatePost | Endpoint::DeletePost => {
                EndpointKind::Mutation
            }
        }
    }

    pub fn options(self) -> CallOptions {
        match self {
            Endpoint::GetPosts => CallOptions::none().with_data_schema(&POSTS_RESPONSE_SCHEMA),
            Endpoint::AddPost => CallOptions::none().with_argument_schema(&NEW_POST_SCHEMA),
            Endpoint::GetPost | Endpoint::UpdatePost | Endpoint::DeletePost => CallOptions::none(),
        }
    }
}

/// Client for the posts API.
#[derive(Debug, Clone)]
pub struct PostsApi<T> {
    transport: WithValidation<T>,
    cache: CacheStore,
}

impl<T: Transport> PostsApi<T> {
    pub fn new(base: T, cache: CacheStore) -> Self {
        Self {
            transport: with_validation(base),
            cache,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    async fn run(
        &self,
        endpoint: Endpoint,
        request: HttpRequest,
    ) -> Result<Option<Value>, OperationError> {
        debug!(
            endpoint = endpoint.name(),
            method = request.method.as_str(),
            path = %request.path,
            "running endpoint"
        );
        self.transport.call(request, &endpoint.options()).await
    }

    /// All posts, served from cache while fresh.
    pub async fn get_posts(&self) -> Result<Vec<Post>, OperationError> {
        if let Some(CachedValue::Posts(posts)) = self.cache.fresh(&QueryKey::Posts) {
            return Ok(posts);
        }
        self.refetch_posts().await
    }

    /// All posts from the server, replacing any cached list.
    pub async fn refetch_posts(&self) -> Result<Vec<Post>, OperationError> {
        let data = self
            .run(Endpoint::GetPosts, build_list_posts())
            .await
            .map_err(mask_list_validation)?;
        let posts: Vec<Post> = decode_payload(data)?;

        let mut tags: Vec<CacheTag> = posts.iter().map(|p| CacheTag::post(&p.id)).collect();
        tags.push(CacheTag::post_list());
        self.cache
            .insert(QueryKey::Posts, CachedValue::Posts(posts.clone()), tags);
        Ok(posts)
    }

    /// One post, served from cache while fresh.
    pub async fn get_post(&self, id: &str) -> Result<Post, OperationError> {
        if let Some(CachedValue::Post(post)) = self.cache.fresh(&QueryKey::Post(id.to_string())) {
            return Ok(post);
        }
        self.refetch_post(id).await
    }

    pub async fn refetch_post(&self, id: &str) -> Result<Post, OperationError> {
        let data = self.run(Endpoint::GetPost, build_get_post(id)).await?;
        let post: Post = decode_payload(data)?;
        self.cache.insert(
            QueryKey::Post(id.to_string()),
            CachedValue::Post(post.clone()),
            vec![CacheTag::post(id)],
        );
        Ok(post)
    }

    /// Create a post. The draft must carry a name longer than three
    /// characters; otherwise nothing is sent.
    pub async fn add_post(&self, draft: &PostDraft) -> Result<Post, OperationError> {
        let data = self.run(Endpoint::AddPost, build_add_post(draft)?).await?;
        let post: Post = decode_payload(data)?;
        self.cache.invalidate(&[CacheTag::post_list()]);
        Ok(post)
    }

    /// Update a post, showing the change in the cached post immediately.
    ///
    /// If the request fails the cached post is restored and the error is
    /// returned. When another update to the same post raced this one and the
    /// restore cannot reach the pre-call value, the post is invalidated so the
    /// next read refetches it. On success the optimistic value is kept
    /// without a refetch.
    pub async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<(), OperationError> {
        let request = build_update_post(id, patch)?;
        let pending = self.cache.patch_post(id, patch);

        match self.run(Endpoint::UpdatePost, request).await {
            Ok(_) => {
                let tags = [CacheTag::post(id)];
                match &pending {
                    Some(record) => self.cache.commit_patch(record, &tags),
                    None => self.cache.invalidate(&tags),
                };
                debug!(id, optimistic = pending.is_some(), "update committed");
                Ok(())
            }
            Err(err) => {
                if let Some(record) = &pending {
                    self.cache.revert(record);
                    warn!(id, %err, "update failed, optimistic patch rolled back");
                    // A racing update left its value behind; let the server settle it.
                    if self.cache.post(id).as_ref() != Some(record.before()) {
                        self.cache.invalidate(&[CacheTag::post(id)]);
                    }
                }
                Err(err)
            }
        }
    }

    pub async fn delete_post(&self, id: &str) -> Result<DeletePostResponse, OperationError> {
        let data = self.run(Endpoint::DeletePost, build_delete_post(id)).await?;
        let response: DeletePostResponse = decode_payload(data)?;
        self.cache.invalidate(&[CacheTag::post(id)]);
        Ok(response)
    }
}

fn build_list_posts() -> HttpRequest {
    HttpRequest::get("posts")
}

fn build_get_post(id: &str) -> HttpRequest {
    HttpRequest::get(format!("posts/{id}"))
}

fn build_add_post(draft: &PostDraft) -> Result<HttpRequest, OperationError> {
    let body =
        serde_json::to_value(draft).map_err(|e| OperationError::Serialization(e.to_string()))?;
    Ok(HttpRequest::with_json(HttpMethod::Post, "posts", body))
}

fn build_update_post(id: &str, patch: &PostPatch) -> Result<HttpRequest, OperationError> {
    let body =
        serde_json::to_value(patch).map_err(|e| OperationError::Serialization(e.to_string()))?;
    Ok(HttpRequest::with_json(
        HttpMethod::Put,
        format!("posts/{id}"),
        body,
    ))
}

fn build_delete_post(id: &str) -> HttpRequest {
    HttpRequest::delete(format!("posts/{id}"))
}

/// A payload that does not match the endpoint's type is a contract mismatch.
fn decode_payload<D: DeserializeOwned>(data: Option<Value>) -> Result<D, OperationError> {
    serde_json::from_value(data.unwrap_or(Value::Null))
        .map_err(|e| OperationError::from_response_failure(&SchemaError::issue(e.to_string())))
}

/// Log the details of a rejected list and hand the caller a plain message.
fn mask_list_validation(err: OperationError) -> OperationError {
    match err {
        OperationError::Validation { status, raw_data } => {
            error!(%raw_data, "posts response failed validation");
            OperationError::Validation {
                status,
                raw_data: LIST_VALIDATION_MESSAGE.to_string(),
            }
        }
        other => other,
    }
}
