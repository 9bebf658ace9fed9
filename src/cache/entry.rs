//! Cache Entry Module
//!
//! Defines individual cache entries and the TTL requested on insert.

use std::time::{Duration, Instant};

// == TTL ==
/// Time-to-live requested for an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Use the cache's configured default expiration
    #[default]
    Default,
    /// Never expires
    Never,
    /// Expires this long after the insert
    After(Duration),
}

impl Ttl {
    // == Resolve ==
    /// Computes the absolute expiration instant, `None` meaning never.
    ///
    /// A zero default expiration means default entries never expire.
    pub fn expires_at(self, now: Instant, default: Duration) -> Option<Instant> {
        let ttl = match self {
            Ttl::Never => return None,
            Ttl::Default => default,
            Ttl::After(ttl) if ttl.is_zero() => default,
            Ttl::After(ttl) => ttl,
        };
        if ttl.is_zero() {
            None
        } else {
            now.checked_add(ttl)
        }
    }
}

/// A zero duration selects the default expiration.
impl From<Duration> for Ttl {
    fn from(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Ttl::Default
        } else {
            Ttl::After(ttl)
        }
    }
}

impl From<Option<Duration>> for Ttl {
    fn from(ttl: Option<Duration>) -> Self {
        ttl.map_or(Ttl::Never, Ttl::from)
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Estimated bytes held: key + value + per-entry overhead
    pub size: usize,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    pub fn new(value: V, expires_at: Option<Instant>, size: usize) -> Self {
        Self {
            value,
            expires_at,
            size,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry expires once the current time is strictly past its
    /// expiration instant. Entries without an expiration never expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}
