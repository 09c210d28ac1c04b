//! # galdex-pipeline
//!
//! The catalog's mutating workflows: duplicate resolution over external
//! identifiers, entry publication (create and update), gallery processing,
//! and resource attachment with attribute aggregation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use galdex_cache::{KvCache, ReadThroughCache};
//! use galdex_db::Database;
//! use galdex_media::storage::HttpObjectStorage;
//! use galdex_pipeline::{EntryPipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(Database::connect("postgres://localhost/galdex").await?);
//!     let storage = Arc::new(HttpObjectStorage::from_env()?);
//!     let cache = ReadThroughCache::new(KvCache::from_env().await);
//!     let pipeline = EntryPipeline::new(db, storage, cache, PipelineConfig::from_env());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod create;
pub mod gallery;
pub mod resolver;
pub mod resources;
pub mod slug;
pub mod update;

// Re-export core types
pub use galdex_core::*;

pub use config::PipelineConfig;
pub use create::EntryPipeline;
pub use gallery::{FailureMode, GalleryOutcome, GalleryProcessor};
pub use resolver::DuplicateResolver;
