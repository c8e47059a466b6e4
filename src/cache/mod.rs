//! In-memory cache for fetched JSON resources.
//!
//! This module holds no I/O. It provides:
//! - A keyed store of the last successful payload per resource
//! - Freshness classification (fresh, stale, expired) against a fetch policy
//! - Lazy expiry: an expired entry is removed when it is next looked up
//! - Per-key sequence numbers so an older fetch cannot overwrite a newer one

mod policy;
mod store;

pub use policy::{
  FetchPolicy, DEFAULT_CACHE_TIME, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY, DEFAULT_STALE_TIME,
};
pub(crate) use policy::deserialize_millis;
pub use store::{CacheEntry, CacheStats, CacheStore, Freshness, STATS_EXPIRY_THRESHOLD};
