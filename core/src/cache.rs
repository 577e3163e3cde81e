//! Client-side query cache with tag-based invalidation.
//!
//! # Design
//! `CacheStore` is a cloneable handle over shared state; every operation that
//! reads, patches or invalidates the cache is handed one explicitly. The lock
//! is only ever held inside a single synchronous method, never across an
//! await point.
//!
//! Each cached read result records the tags it provides. Invalidating a tag
//! marks every entry providing it as stale; stale entries keep their value
//! until the next read of that key refetches it.
//!
//! Optimistic edits go through `PatchRecord`, which remembers the value before
//! and after the patch. Reverting restores a field only while it still holds
//! this patch's value, so rolling back one edit does not clobber a later edit
//! to the same post.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::types::{Post, PostPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagId {
    Id(String),
    /// Membership of the whole collection.
    List,
}

/// Invalidation key linking cached reads to the writes that may stale them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheTag {
    pub kind: TagType,
    pub id: TagId,
}

impl CacheTag {
    pub fn post(id: impl Into<String>) -> Self {
        Self {
            kind: TagType::Post,
            id: TagId::Id(id.into()),
        }
    }

    pub fn post_list() -> Self {
        Self {
            kind: TagType::Post,
            id: TagId::List,
        }
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TagType::Post => "Post",
        };
        match &self.id {
            TagId::Id(id) => write!(f, "{kind}:{id}"),
            TagId::List => write!(f, "{kind}:LIST"),
        }
    }
}

/// Identifies one cached read result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Posts,
    Post(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Posts(Vec<Post>),
    Post(Post),
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    tags: Vec<CacheTag>,
    stale: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
}

/// An optimistic edit of one cached post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    patch: PostPatch,
    before: Post,
    after: Post,
}

impl PatchRecord {
    pub fn new(before: Post, patch: &PostPatch) -> Self {
        let mut after = before.clone();
        patch.apply_to(&mut after);
        Self {
            patch: patch.clone(),
            before,
            after,
        }
    }

    pub fn id(&self) -> &str {
        &self.before.id
    }

    pub fn before(&self) -> &Post {
        &self.before
    }

    pub fn after(&self) -> &Post {
        &self.after
    }

    pub fn apply(&self, post: &mut Post) {
        self.patch.apply_to(post);
    }

    /// Undo this patch on `post`, leaving fields another patch has since
    /// overwritten untouched.
    pub fn revert(&self, post: &mut Post) {
        if self.patch.name.is_some() && post.name == self.after.name {
            post.name = self.before.name.clone();
        }
        if self.patch.content.is_some() && post.content == self.after.content {
            post.content = self.before.content.clone();
        }
    }
}

/// Shared handle to the query cache.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    state: Arc<Mutex<CacheState>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a fresh read result and the tags it provides.
    pub fn insert(&self, key: QueryKey, value: CachedValue, tags: Vec<CacheTag>) {
        debug!(?key, tags = tags.len(), "caching query result");
        self.lock().entries.insert(
            key,
            CacheEntry {
                value,
                tags,
                stale: false,
            },
        );
    }

    pub fn get(&self, key: &QueryKey) -> Option<CachedValue> {
        self.lock().entries.get(key).map(|e| e.value.clone())
    }

    /// The cached value, only if it has not been invalidated.
    pub fn fresh(&self, key: &QueryKey) -> Option<CachedValue> {
        self.lock()
            .entries
            .get(key)
            .filter(|e| !e.stale)
            .map(|e| e.value.clone())
    }

    pub fn posts(&self) -> Option<Vec<Post>> {
        match self.get(&QueryKey::Posts)? {
            CachedValue::Posts(posts) => Some(posts),
            CachedValue::Post(_) => None,
        }
    }

    pub fn post(&self, id: &str) -> Option<Post> {
        match self.get(&QueryKey::Post(id.to_string()))? {
            CachedValue::Post(post) => Some(post),
            CachedValue::Posts(_) => None,
        }
    }

    pub fn provided_tags(&self, key: &QueryKey) -> Vec<CacheTag> {
        self.lock()
            .entries
            .get(key)
            .map(|e| e.tags.clone())
            .unwrap_or_default()
    }

    /// True when `key` is cached and has been invalidated.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.lock().entries.get(key).is_some_and(|e| e.stale)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Mark every entry providing one of `tags` as stale; returns those keys.
    pub fn invalidate(&self, tags: &[CacheTag]) -> Vec<QueryKey> {
        self.invalidate_matching(tags, |_, _| true)
    }

    /// Invalidate `tags` after `record`'s write was confirmed. The post entry
    /// still showing the optimistic value stays fresh.
    pub fn commit_patch(&self, record: &PatchRecord, tags: &[CacheTag]) -> Vec<QueryKey> {
        let own_key = QueryKey::Post(record.id().to_string());
        self.invalidate_matching(tags, |key, value| {
            !(key == &own_key && value == &CachedValue::Post(record.after.clone()))
        })
    }

    fn invalidate_matching<F>(&self, tags: &[CacheTag], should_stale: F) -> Vec<QueryKey>
    where
        F: Fn(&QueryKey, &CachedValue) -> bool,
    {
        let mut state = self.lock();
        let mut staled = Vec::new();
        for (key, entry) in state.entries.iter_mut() {
            let provides = entry.tags.iter().any(|t| tags.contains(t));
            if provides && should_stale(key, &entry.value) {
                entry.stale = true;
                staled.push(key.clone());
            }
        }
        if !staled.is_empty() {
            let tags: Vec<String> = tags.iter().map(ToString::to_string).collect();
            debug!(?tags, ?staled, "invalidated cached queries");
        }
        staled
    }

    pub fn remove(&self, key: &QueryKey) -> Option<CachedValue> {
        self.lock().entries.remove(key).map(|e| e.value)
    }

    /// Apply `patch` to the cached post `id`, if one is cached.
    pub fn patch_post(&self, id: &str, patch: &PostPatch) -> Option<PatchRecord> {
        let mut state = self.lock();
        let entry = state.entries.get_mut(&QueryKey::Post(id.to_string()))?;
        let CachedValue::Post(post) = &mut entry.value else {
            return None;
        };
        let record = PatchRecord::new(post.clone(), patch);
        record.apply(post);
        debug!(id, "applied optimistic patch");
        Some(record)
    }

    /// Roll back `record` on the cached post. Returns false when the entry is
    /// gone.
    pub fn revert(&self, record: &PatchRecord) -> bool {
        let mut state = self.lock();
        let Some(entry) = state.entries.get_mut(&QueryKey::Post(record.id().to_string())) else {
            return false;
        };
        let CachedValue::Post(post) = &mut entry.value else {
            return false;
        };
        record.revert(post);
        debug!(id = record.id(), "reverted optimistic patch");
        true
    }
}
