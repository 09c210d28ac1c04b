//! Core traits for galdex abstractions.
//!
//! These traits define the seams between the workflow layer and its
//! collaborators (relational store, object storage), enabling pluggable
//! backends and testability with in-memory doubles.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::models::EntryRef;

/// Read-only entry lookups used by the duplicate resolver.
///
/// All lookups are exact-match over normalized identifiers except
/// `find_by_title_or_alias`, which is case-insensitive. "Not found" is a
/// normal `Ok(None)` / empty-vec outcome, never an error.
#[async_trait]
pub trait EntryLookup: Send + Sync {
    /// First entry holding this VNDB release id, if any.
    async fn find_by_release_id(&self, release_id: &str) -> Result<Option<EntryRef>>;

    /// First entry holding this DLsite code, if any.
    async fn find_by_dlsite_code(&self, code: &str) -> Result<Option<EntryRef>>;

    /// All entries sharing this VNDB work id (distinct editions), capped at
    /// `limit`.
    async fn find_all_by_work_id(&self, work_id: &str, limit: i64) -> Result<Vec<EntryRef>>;

    /// First entry whose title or any alias equals `title`
    /// case-insensitively.
    async fn find_by_title_or_alias(&self, title: &str) -> Result<Option<EntryRef>>;
}

/// Gallery image row lifecycle used by the upload pipeline.
///
/// `insert_placeholder` creates an empty-URL row before the binary exists;
/// the pipeline later either completes it with `set_url` or compensates with
/// `delete`.
#[async_trait]
pub trait GalleryStore: Send + Sync {
    async fn insert_placeholder(&self, entry_id: i64, is_nsfw: bool) -> Result<i64>;

    async fn set_url(&self, image_id: i64, url: &str) -> Result<()>;

    async fn delete(&self, image_id: i64) -> Result<()>;
}

/// Search-index submission endpoint for newly public entry URLs.
///
/// Submissions are best-effort; callers log failures and move on.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Submit one URL. Returns the upstream HTTP status code.
    async fn submit(&self, url: &str) -> Result<u16>;
}

/// Object storage boundary: hierarchical keys, opaque bytes.
///
/// Keys follow `entry/{id}/banner/...` and `entry/{id}/gallery/{imageId}.ext`.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}
