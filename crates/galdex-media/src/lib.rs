//! # galdex-media
//!
//! Image derivation and the object-storage boundary for galdex.
//!
//! This crate provides:
//! - Banner and gallery image derivation (fit-inside resize, AVIF encode,
//!   size ceilings)
//! - The repeating text watermark tile
//! - `ObjectStorage` backends: S3-style HTTP image bed and an in-memory
//!   test double

pub mod derive;
pub mod storage;
pub mod watermark;

// Re-export core types
pub use galdex_core::*;

pub use derive::{
    banner_key, banner_mini_key, derive_banner, derive_gallery_image, fit_within, gallery_key,
    within_size_ceiling, DerivedBanner,
};
pub use storage::{HttpObjectStorage, MemoryObjectStorage};
pub use watermark::{WatermarkConfig, WatermarkTile};
