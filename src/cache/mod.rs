//! Versioned in-memory cache for remote-backed collections.

pub mod store;

pub use store::{CacheChange, CacheEvent, CacheSnapshot, CacheTopic, ResourceCache};
