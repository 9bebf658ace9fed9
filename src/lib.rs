//! Memcap Cache - A memory-bounded in-process key-value cache
//!
//! Provides TTL expiration, pluggable eviction with a FIFO default, deep
//! memory estimation of stored values and a background expiration sweeper.

pub mod cache;
pub mod config;
pub mod error;
pub mod policy;
pub mod sizing;
pub mod tasks;

pub use cache::{Cache, CacheStats, EvictionCallback, Ttl};
pub use config::Config;
pub use error::{CacheError, Result};
pub use policy::{EvictionPolicy, FifoPolicy, PolicyKind};
pub use sizing::{estimate_size, DeepSizeOf};
pub use tasks::Sweeper;
