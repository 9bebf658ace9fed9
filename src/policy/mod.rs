//! Eviction Policy Module
//!
//! Decides which key the cache gives up when it needs room. The cache store
//! only talks to [`EvictionPolicy`]; [`FifoPolicy`] is the built-in policy.
//!
//! A policy must track exactly the keys present in the store: every stored key
//! appears once in the policy, and the policy references no key the store
//! does not hold.

mod fifo;

use std::fmt;
use std::str::FromStr;

use crate::error::{CacheError, Result};

pub use fifo::FifoPolicy;

// == Eviction Policy ==
/// Ordered key selection used by the cache store to pick eviction victims.
pub trait EvictionPolicy: Send + Sync + fmt::Debug {
    /// Registers a key as newly present.
    ///
    /// Returns `false` only when the policy enforces its own bound and is full.
    fn track(&mut self, key: &str) -> bool;

    /// Removes a key if tracked. No-op otherwise.
    fn untrack(&mut self, key: &str);

    /// Returns the next eviction candidate without removing it.
    fn peek_victim(&self) -> Result<&str>;

    /// Returns the number of tracked keys.
    fn count(&self) -> usize;

    /// Iterates tracked keys in eviction order, next victim first.
    fn candidates(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    /// Forgets every tracked key.
    fn clear(&mut self);

    /// Maximum number of keys the policy accepts, `None` when unbounded.
    ///
    /// The store plans evictions against this bound, so a policy whose
    /// `track` can refuse must report it here.
    fn bound(&self) -> Option<usize>;
}

// == Policy Kind ==
/// Built-in policies selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Oldest inserted key is evicted first
    Fifo,
}

impl PolicyKind {
    /// Creates an unbounded instance of the policy.
    pub fn build(self) -> Box<dyn EvictionPolicy> {
        match self {
            PolicyKind::Fifo => Box::new(FifoPolicy::new()),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "fifo" | "queue" => Ok(PolicyKind::Fifo),
            other => Err(CacheError::Config(format!(
                "unsupported eviction policy: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Fifo => f.write_str("fifo"),
        }
    }
}
