//! Cache Module
//!
//! Provides in-memory caching bounded by entry count and estimated memory,
//! with TTL expiration and pluggable eviction.

mod entry;
mod handle;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, Ttl};
pub use handle::Cache;
pub use stats::{CacheStats, StatsRecorder};
pub use store::{CacheStore, Evicted};

use std::sync::Arc;

// == Public Constants ==
/// Per-entry bookkeeping overhead: one pointer
pub const ENTRY_OVERHEAD: usize = std::mem::size_of::<usize>();

/// Computes the estimated byte size of a value.
pub type Sizer<V> = Box<dyn Fn(&V) -> usize + Send + Sync>;

/// Called with the key and value of every entry removed by `remove`,
/// `expire_all` or eviction. Runs after the cache lock is released, so it
/// may call back into the cache.
pub type EvictionCallback<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;
