//! Default values and tunable constants shared across galdex crates.

// ─── Image derivation ──────────────────────────────────────────────────────

/// Maximum width of the full-size banner and of gallery images.
pub const IMAGE_MAX_WIDTH: u32 = 1920;

/// Maximum height of the full-size banner and of gallery images.
pub const IMAGE_MAX_HEIGHT: u32 = 1080;

/// Maximum width of the banner thumbnail variant.
pub const THUMB_MAX_WIDTH: u32 = 460;

/// Maximum height of the banner thumbnail variant.
pub const THUMB_MAX_HEIGHT: u32 = 259;

/// AVIF quality for all derived variants (size/quality tradeoff).
pub const AVIF_QUALITY: u8 = 60;

/// AVIF encoder speed (1 = slowest/best, 10 = fastest).
pub const AVIF_SPEED: u8 = 8;

/// Reference encoded size (bytes) against which the ceilings are applied.
pub const REFERENCE_IMAGE_BYTES: usize = 1024 * 1024;

/// Max encoded banner-thumbnail size as a multiple of the reference size.
/// Safety guard against pathological inputs, not a business rule.
pub const THUMB_SIZE_RATIO: f64 = 1.007;

/// Max encoded gallery-image size as a multiple of the reference size.
pub const GALLERY_SIZE_RATIO: f64 = 1.5;

// ─── Watermark (fixed configuration, never user input) ─────────────────────

/// Side length of the repeating watermark tile, pixels.
pub const WATERMARK_TILE_SIZE: u32 = 200;

/// Watermark text.
pub const WATERMARK_TEXT: &str = "galdex";

/// Watermark font size, pixels.
pub const WATERMARK_FONT_SIZE: f32 = 24.0;

/// Watermark text opacity (0.0–1.0).
pub const WATERMARK_OPACITY: f32 = 0.12;

/// Watermark rotation, degrees counter-clockwise.
pub const WATERMARK_ANGLE_DEGREES: f32 = -45.0;

// ─── Publication pipeline ──────────────────────────────────────────────────

/// Random bytes behind the external slug (hex-encoded to 8 characters).
pub const SLUG_RANDOM_BYTES: usize = 4;

/// Max simultaneous in-flight gallery image uploads.
pub const GALLERY_CONCURRENCY: usize = 2;

/// Create-transaction statement timeout in seconds. Generous because the
/// transaction spans at least one image encode.
pub const CREATE_TX_TIMEOUT_SECS: u64 = 60;

/// Points awarded to the submitting user on publish.
pub const PUBLISH_POINT_AWARD: i32 = 3;

/// Cap on entries returned for a shared VNDB work id.
pub const WORK_ID_MATCH_LIMIT: i64 = 20;

// ─── Caching ───────────────────────────────────────────────────────────────

/// TTL for read-through list-query caching, seconds.
pub const LIST_CACHE_TTL_SECS: u64 = 10;

/// Redis key prefix for all galdex cache entries.
pub const CACHE_KEY_PREFIX: &str = "galdex:";

// ─── External providers ────────────────────────────────────────────────────

/// VNDB kana API endpoint.
pub const VNDB_API_URL: &str = "https://api.vndb.org/kana";

/// Default DLsite metadata API endpoint.
pub const DLSITE_API_URL: &str = "https://dlapi.arnebiae.com/api/dlsite";

/// IndexNow ping endpoint.
pub const INDEXNOW_API_URL: &str = "https://api.indexnow.org/indexnow";

/// Default timeout for provider HTTP requests, seconds.
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;
