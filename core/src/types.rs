//! Domain DTOs for the posts API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently.
//! Integration tests catch any schema drift between the two crates.
//!
//! Post ids are strings everywhere on the client side. The delete endpoint
//! historically answered with a numeric id, so `DeletePostResponse` accepts
//! both forms and normalizes to `String`.

use serde::{Deserialize, Deserializer, Serialize};

/// A single post as stored by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Argument shape accepted by the create endpoint's validator.
///
/// Write-only: it gates the outgoing body and is never returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPost {
    pub name: String,
}

/// A partial post, as sent to `POST /posts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl PostDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Fields of an update. Only the fields present in the JSON are applied;
/// omitted fields remain unchanged on the server and in the cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl PostPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            content: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_none()
    }

    /// Merge the present fields into `post`.
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(name) = &self.name {
            post.name = name.clone();
        }
        if let Some(content) = &self.content {
            post.content = Some(content.clone());
        }
    }
}

/// Body returned by `DELETE /posts/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletePostResponse {
    pub success: bool,
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: String,
}

/// Display shape for post lists; `content` is cut to 100 characters when parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostExcerpt {
    pub id: String,
    pub name: String,
    pub content: String,
}

pub const DEFAULT_AUTHOR_PHOTO: &str = "/dummy-author-photo.jpg";

/// Author attached to a post in richer payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostAuthor {
    pub name: String,
    #[serde(default = "default_author_photo")]
    pub photo: String,
    pub email: String,
}

fn default_author_photo() -> String {
    DEFAULT_AUTHOR_PHOTO.to_string()
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}
