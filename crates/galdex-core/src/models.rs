//! Domain models and request/response types for galdex.
//!
//! Request structs are the strongly-typed boundary replacing loosely-typed
//! multipart form input: embedded metadata (gallery plans, alias lists) is
//! decoded into typed sub-structures before it reaches the pipeline.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content classification for a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRating {
    /// Safe for work; eligible for search-index pings.
    Sfw,
    /// Adult content; excluded from search-index pings.
    Nsfw,
}

impl ContentRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentRating::Sfw => "sfw",
            ContentRating::Nsfw => "nsfw",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sfw" => Some(ContentRating::Sfw),
            "nsfw" => Some(ContentRating::Nsfw),
            _ => None,
        }
    }
}

/// A cataloged creative work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Internal identifier.
    pub id: i64,
    /// External-facing slug: 4 random bytes, hex-encoded (8 characters).
    pub slug: String,
    pub title: String,
    /// VNDB work id (`v123`). May repeat across distinct editions.
    pub vndb_work_id: Option<String>,
    /// VNDB release id (`r123`). Globally unique when present.
    pub vndb_release_id: Option<String>,
    /// DLsite product code (`RJ123456`). Globally unique when present.
    pub dlsite_code: Option<String>,
    /// Public banner URL. Empty until the banner upload completes.
    pub banner: String,
    pub introduction: String,
    pub content_rating: ContentRating,
    /// Release date as reported by the identifier provider (may be "TBA").
    pub released: Option<String>,
    /// Union of child resources' kinds. Never manually edited.
    pub kinds: Vec<String>,
    /// Union of child resources' languages. Never manually edited.
    pub languages: Vec<String>,
    /// Union of child resources' platforms. Never manually edited.
    pub platforms: Vec<String>,
    /// Submitting user.
    pub user_id: i64,
    pub created: DateTime<Utc>,
    /// Bumped whenever a child resource is created, edited, or removed.
    pub resource_update_time: DateTime<Utc>,
}

/// Minimal entry projection used by duplicate lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRef {
    pub id: i64,
    pub slug: String,
    pub title: String,
}

/// An ordered gallery image owned by one catalog entry.
///
/// A row with an empty `url` is an in-flight placeholder: it is either
/// completed with a final URL or compensating-deleted on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: i64,
    pub entry_id: i64,
    pub url: String,
    pub is_nsfw: bool,
    pub created: DateTime<Utc>,
}

/// A downloadable resource attached to a catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub entry_id: i64,
    pub user_id: i64,
    pub kinds: Vec<String>,
    pub languages: Vec<String>,
    pub platforms: Vec<String>,
    /// Download link or storage key, depending on `storage`.
    pub content: String,
    /// Storage backend kind: "s3" or "user" (external link).
    pub storage: String,
    pub note: String,
    pub size: String,
    pub created: DateTime<Utc>,
}

// =============================================================================
// DUPLICATE RESOLVER TYPES
// =============================================================================

/// How a matched identifier field is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrength {
    /// Blocks creation outright.
    Hard,
    /// Informational; overridable by explicit confirmation.
    Soft,
}

/// Which input field matched an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchedField {
    VndbReleaseId,
    DlsiteCode,
    VndbWorkId,
    Title,
}

impl MatchedField {
    /// Release ids and DLsite codes are non-repeatable; work ids and titles
    /// are shared across editions and only informational.
    pub fn strength(&self) -> MatchStrength {
        match self {
            MatchedField::VndbReleaseId | MatchedField::DlsiteCode => MatchStrength::Hard,
            MatchedField::VndbWorkId | MatchedField::Title => MatchStrength::Soft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchedField::VndbReleaseId => "vndbReleaseId",
            MatchedField::DlsiteCode => "dlsiteCode",
            MatchedField::VndbWorkId => "vndbWorkId",
            MatchedField::Title => "title",
        }
    }
}

/// One matched entry in a duplicate report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub slug: String,
    pub title: String,
}

/// Result of the duplicate resolver. Not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Slug of the first matched entry (kept for caller compatibility).
    pub first_slug: Option<String>,
    /// Which input fields matched, in check order.
    pub matched_fields: Vec<MatchedField>,
    /// De-duplicated matches across all strategies, first-seen order.
    pub matches: Vec<MatchCandidate>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// True when any matched field is a hard (non-repeatable) identifier.
    pub fn has_hard_match(&self) -> bool {
        self.matched_fields
            .iter()
            .any(|f| f.strength() == MatchStrength::Hard)
    }
}

/// Candidate identifiers for a duplicate check. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DuplicateQuery {
    pub vndb_work_id: Option<String>,
    pub vndb_release_id: Option<String>,
    pub dlsite_code: Option<String>,
    pub title: Option<String>,
}

// =============================================================================
// PUBLICATION PIPELINE REQUESTS
// =============================================================================

/// One raw gallery image submitted for processing.
#[derive(Debug, Clone)]
pub struct GalleryUpload {
    pub bytes: Bytes,
    pub is_nsfw: bool,
    pub watermark: bool,
}

/// Request for creating a catalog entry.
#[derive(Debug, Clone)]
pub struct CreateEntryRequest {
    pub title: String,
    pub vndb_work_id: Option<String>,
    pub vndb_release_id: Option<String>,
    pub dlsite_code: Option<String>,
    pub introduction: String,
    pub released: Option<String>,
    pub content_rating: ContentRating,
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    /// Raw banner image. Required on create.
    pub banner: Bytes,
    /// Gallery images processed after the response is prepared.
    pub gallery: Vec<GalleryUpload>,
    /// Caller confirmed a known soft duplicate (shared work id).
    pub is_duplicate: bool,
}

/// A kept image in a gallery reconciliation plan.
#[derive(Debug, Clone, Deserialize)]
pub struct KeepImage {
    pub id: i64,
    pub is_nsfw: bool,
}

/// Gallery reconciliation plan supplied on update.
///
/// Existing images absent from `keep` are deleted outright; kept images get
/// their NSFW flag patched; `new` images run through the upload pipeline.
#[derive(Debug, Clone, Default)]
pub struct GalleryPlan {
    pub keep: Vec<KeepImage>,
    pub new: Vec<GalleryUpload>,
    pub watermark: bool,
}

/// Request for updating a catalog entry.
#[derive(Debug, Clone)]
pub struct UpdateEntryRequest {
    pub id: i64,
    pub title: String,
    pub vndb_work_id: Option<String>,
    pub vndb_release_id: Option<String>,
    pub dlsite_code: Option<String>,
    pub introduction: String,
    pub released: Option<String>,
    pub content_rating: ContentRating,
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    /// Replacement banner, when supplied.
    pub banner: Option<Bytes>,
    /// Gallery reconciliation plan, when supplied.
    pub gallery: Option<GalleryPlan>,
    pub is_duplicate: bool,
}

/// Success payload for entry creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryOutcome {
    pub entry_id: i64,
    pub slug: String,
}

/// Request for creating a resource under an entry.
#[derive(Debug, Clone)]
pub struct CreateResourceRequest {
    pub entry_id: i64,
    pub user_id: i64,
    pub kinds: Vec<String>,
    pub languages: Vec<String>,
    pub platforms: Vec<String>,
    pub content: String,
    pub storage: String,
    pub note: String,
    pub size: String,
}

/// Request for updating an existing resource.
#[derive(Debug, Clone)]
pub struct UpdateResourceRequest {
    pub id: i64,
    pub kinds: Vec<String>,
    pub languages: Vec<String>,
    pub platforms: Vec<String>,
    pub content: String,
    pub note: String,
    pub size: String,
}
