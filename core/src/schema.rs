//! Runtime validators for request bodies and response payloads.
//!
//! # Design
//! A `Schema` takes an arbitrary JSON value and either returns a normalized
//! value or fails with a `SchemaError`. The provided schemas are derived from
//! serde shapes: the value is deserialized into the shape, the shape's
//! `refine` step runs its extra checks and documented transforms, and the
//! result is serialized back. Unknown keys are therefore stripped, and an
//! already-valid value comes back unchanged unless a transform applies.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{SchemaError, ValidationIssue};
use crate::types::{NewPost, Post, PostAuthor, PostExcerpt, DEFAULT_AUTHOR_PHOTO};

/// Minimum number of characters a new post's name must exceed.
pub const MIN_NAME_LEN: usize = 3;
/// Excerpt content is cut to this many characters.
pub const EXCERPT_LEN: usize = 100;

pub const SHORT_NAME_MESSAGE: &str = "Name can't be shorter than 3 characters.";

/// A validator with a parse/fail contract.
pub trait Schema: Sync {
    fn name(&self) -> &'static str;

    fn parse(&self, value: &Value) -> Result<Value, SchemaError>;
}

/// A serde type usable as a schema.
///
/// `refine` runs after a successful deserialize; it may transform the value
/// and reports rule violations by pushing into `issues`.
pub trait Shape: DeserializeOwned + Serialize {
    fn refine(self, _issues: &mut Vec<ValidationIssue>) -> Self {
        self
    }
}

impl<T: Shape> Shape for Vec<T> {
    fn refine(self, issues: &mut Vec<ValidationIssue>) -> Self {
        self.into_iter().map(|item| item.refine(issues)).collect()
    }
}

impl Shape for Post {}

impl Shape for NewPost {
    fn refine(self, issues: &mut Vec<ValidationIssue>) -> Self {
        if self.name.chars().count() <= MIN_NAME_LEN {
            issues.push(ValidationIssue::new(SHORT_NAME_MESSAGE));
        }
        self
    }
}

impl Shape for PostExcerpt {
    fn refine(mut self, _issues: &mut Vec<ValidationIssue>) -> Self {
        if self.content.chars().count() > EXCERPT_LEN {
            self.content = self.content.chars().take(EXCERPT_LEN).collect();
        }
        self
    }
}

impl Shape for PostAuthor {
    fn refine(self, issues: &mut Vec<ValidationIssue>) -> Self {
        if self.photo != DEFAULT_AUTHOR_PHOTO && !is_url(&self.photo) {
            issues.push(ValidationIssue::new("Invalid url"));
        }
        if !is_email(&self.email) {
            issues.push(ValidationIssue::new("Invalid email"));
        }
        self
    }
}

fn is_url(value: &str) -> bool {
    value
        .split_once("://")
        .is_some_and(|(scheme, rest)| !scheme.is_empty() && !rest.is_empty())
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

/// Schema backed by a `Shape`.
pub struct ShapeSchema<T> {
    name: &'static str,
    _shape: PhantomData<fn() -> T>,
}

impl<T> ShapeSchema<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _shape: PhantomData,
        }
    }
}

impl<T: Shape> Schema for ShapeSchema<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parse(&self, value: &Value) -> Result<Value, SchemaError> {
        let shaped = T::deserialize(value).map_err(|e| SchemaError::issue(e.to_string()))?;
        let mut issues = Vec::new();
        let refined = shaped.refine(&mut issues);
        if !issues.is_empty() {
            return Err(SchemaError::Issues(issues));
        }
        serde_json::to_value(refined).map_err(|e| SchemaError::Other(e.to_string()))
    }
}

pub static POST_SCHEMA: ShapeSchema<Post> = ShapeSchema::new("Post");
pub static POSTS_RESPONSE_SCHEMA: ShapeSchema<Vec<Post>> = ShapeSchema::new("PostsResponse");
pub static NEW_POST_SCHEMA: ShapeSchema<NewPost> = ShapeSchema::new("NewPost");
pub static POST_EXCERPT_SCHEMA: ShapeSchema<PostExcerpt> = ShapeSchema::new("PostExcerpt");
pub static POST_AUTHOR_SCHEMA: ShapeSchema<PostAuthor> = ShapeSchema::new("PostAuthor");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_post_parses_to_itself() {
        let input = json!({"id": "1", "name": "A", "content": "body"});
        assert_eq!(POST_SCHEMA.parse(&input).unwrap(), input);
    }

    #[test]
    fn unknown_keys_are_stripped() {
        let input = json!({"id": "1", "name": "A", "likes": 3});
        assert_eq!(
            POST_SCHEMA.parse(&input).unwrap(),
            json!({"id": "1", "name": "A"})
        );
    }

    #[test]
    fn post_missing_id_fails_with_issue() {
        let err = POST_SCHEMA.parse(&json!({"name": "A"})).unwrap_err();
        match err {
            SchemaError::Issues(issues) => {
                assert_eq!(issues.len(), 1);
                assert!(issues[0].message.contains("id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn one_bad_item_fails_the_whole_list() {
        let input = json!([{"id": "1", "name": "A"}, {"id": 2, "name": "B"}]);
        assert!(POSTS_RESPONSE_SCHEMA.parse(&input).is_err());
    }

    #[test]
    fn short_name_is_rejected_with_message() {
        for name in ["", "a", "ab", "abc"] {
            let err = NEW_POST_SCHEMA.parse(&json!({ "name": name })).unwrap_err();
            assert_eq!(
                err,
                SchemaError::Issues(vec![ValidationIssue::new(SHORT_NAME_MESSAGE)]),
                "name {name:?}"
            );
        }
    }

    #[test]
    fn four_character_name_is_accepted() {
        assert!(NEW_POST_SCHEMA.parse(&json!({"name": "abcd"})).is_ok());
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        assert!(NEW_POST_SCHEMA.parse(&json!({"name": "äöü"})).is_err());
    }

    #[test]
    fn excerpt_content_is_truncated() {
        let long = "x".repeat(150);
        let parsed = POST_EXCERPT_SCHEMA
            .parse(&json!({"id": "1", "name": "A", "content": long}))
            .unwrap();
        assert_eq!(parsed["content"].as_str().unwrap().len(), EXCERPT_LEN);
    }

    #[test]
    fn short_excerpt_is_unchanged() {
        let input = json!({"id": "1", "name": "A", "content": "short"});
        assert_eq!(POST_EXCERPT_SCHEMA.parse(&input).unwrap(), input);
    }

    #[test]
    fn author_without_photo_gets_default() {
        let parsed = POST_AUTHOR_SCHEMA
            .parse(&json!({"name": "Ada", "email": "ada@example.com"}))
            .unwrap();
        assert_eq!(
            parsed,
            json!({"name": "Ada", "photo": DEFAULT_AUTHOR_PHOTO, "email": "ada@example.com"})
        );
    }

    #[test]
    fn author_rejects_bad_email_and_photo() {
        let err = POST_AUTHOR_SCHEMA
            .parse(&json!({"name": "Ada", "photo": "me.png", "email": "ada.example.com"}))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::Issues(vec![
                ValidationIssue::new("Invalid url"),
                ValidationIssue::new("Invalid email"),
            ])
        );
    }

    #[test]
    fn author_accepts_photo_url() {
        let input = json!({
            "name": "Ada",
            "photo": "https://cdn.example.com/a.jpg",
            "email": "a@b.io"
        });
        assert_eq!(POST_AUTHOR_SCHEMA.parse(&input).unwrap(), input);
    }
}
