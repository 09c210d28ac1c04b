//! Structured logging schema and field name constants for galdex.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "media", "providers", "cache", "pipeline"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "resolver", "gallery", "banner", "pool", "singleflight"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "update", "derive_banner", "purge"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Internal id of the catalog entry being operated on.
pub const ENTRY_ID: &str = "entry_id";

/// External slug of the catalog entry.
pub const SLUG: &str = "slug";

/// Gallery image row id.
pub const IMAGE_ID: &str = "image_id";

/// Resource row id.
pub const RESOURCE_ID: &str = "resource_id";

/// Submitting user id.
pub const USER_ID: &str = "user_id";

/// External identifier field under examination ("vndbWorkId", ...).
pub const FIELD: &str = "field";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of duplicate matches found.
pub const MATCH_COUNT: &str = "match_count";

/// Number of gallery images in a batch.
pub const IMAGE_COUNT: &str = "image_count";

/// Encoded size of a derived image in bytes.
pub const ENCODED_BYTES: &str = "encoded_bytes";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table or entity affected.
pub const DB_TABLE: &str = "db_table";

// ─── Provider fields ───────────────────────────────────────────────────────

/// External provider name ("vndb", "dlsite", "cdn", "indexnow").
pub const PROVIDER: &str = "provider";

/// Number of URLs in a CDN purge request.
pub const URL_COUNT: &str = "url_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
