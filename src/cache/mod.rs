//! Response caching for upstream provider calls
//!
//! This module provides a provider-agnostic, disk-backed memoization layer.
//! Each provider response is stored in its own file, addressed by a digest of
//! the operation name and its canonicalized parameters, and honored for a
//! fixed time-to-live. Hit/miss counters are persisted next to the entries
//! so savings survive restarts.

mod key;
mod store;

pub use key::{canonical_json, CacheKey};
pub use store::{CacheEntry, CacheStats, CacheStore, CacheSummary, STATS_FILE};
