//! # galdex-providers
//!
//! External HTTP integrations for galdex:
//! - VNDB kana API (work id → titles, release date)
//! - DLsite metadata API (product code → titles, release date, circle)
//! - CDN edge-cache purge
//! - IndexNow search-index ping
//!
//! Identifier providers fail closed (errors surface to the caller); the CDN
//! and IndexNow clients are best-effort by contract of their call sites.

pub mod cdn;
pub mod dlsite;
pub mod indexnow;
pub mod vndb;

// Re-export core types
pub use galdex_core::*;

pub use cdn::CdnPurgeClient;
pub use dlsite::{normalize_code, DlsiteClient, DlsiteMetadata};
pub use indexnow::IndexNowClient;
pub use vndb::{VndbClient, WorkMetadata};
