//! Response caching.

pub mod response_cache;

pub use response_cache::{MemoryCache, ResponseCache, json_key, wire_key};
