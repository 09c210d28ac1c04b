//! Redis caching layer: advisory key-value access, request coalescing, and
//! read-through helpers for listing endpoints.

pub mod kv;
pub mod read_through;
pub mod singleflight;

pub use kv::KvCache;
pub use read_through::ReadThroughCache;
pub use singleflight::Singleflight;
