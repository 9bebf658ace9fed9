//! FIFO Policy Module
//!
//! Evicts keys in insertion order.

use std::collections::VecDeque;

use crate::error::{CacheError, Result};
use crate::policy::EvictionPolicy;

// == FIFO Policy ==
/// Tracks insertion order for FIFO eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest (next victim)
/// - Back = Newest
#[derive(Debug, Default)]
pub struct FifoPolicy {
    /// Keys in insertion order
    order: VecDeque<String>,
    /// Optional cap on tracked keys
    limit: Option<usize>,
}

impl FifoPolicy {
    // == Constructor ==
    /// Creates a new unbounded FIFO policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a FIFO policy refusing keys beyond `limit`.
    pub fn bounded(limit: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(limit),
            limit: Some(limit),
        }
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }
}

impl EvictionPolicy for FifoPolicy {
    // == Track ==
    /// Appends a key to the back of the queue unless the bound is reached.
    fn track(&mut self, key: &str) -> bool {
        if let Some(limit) = self.limit {
            if self.order.len() >= limit {
                return false;
            }
        }
        self.order.push_back(key.to_string());
        true
    }

    // == Untrack ==
    /// Removes the first occurrence of a key.
    fn untrack(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    // == Peek Victim ==
    /// Returns the oldest key without removing it.
    fn peek_victim(&self) -> Result<&str> {
        self.order
            .front()
            .map(String::as_str)
            .ok_or(CacheError::PolicyEmpty)
    }

    fn count(&self) -> usize {
        self.order.len()
    }

    fn candidates(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.order.iter().map(String::as_str))
    }

    fn clear(&mut self) {
        self.order.clear();
    }

    fn bound(&self) -> Option<usize> {
        self.limit
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_new() {
        let fifo = FifoPolicy::new();
        assert!(fifo.is_empty());
        assert_eq!(fifo.count(), 0);
        assert_eq!(fifo.bound(), None);
    }

    #[test]
    fn test_fifo_unbounded_accepts_many() {
        let mut fifo = FifoPolicy::new();
        for i in 0..10_000 {
            assert!(fifo.track(&format!("key{}", i)));
        }
        assert_eq!(fifo.count(), 10_000);
    }

    #[test]
    fn test_fifo_peek_empty() {
        let fifo = FifoPolicy::new();
        assert!(matches!(fifo.peek_victim(), Err(CacheError::PolicyEmpty)));
    }

    #[test]
    fn test_fifo_peek_oldest() {
        let mut fifo = FifoPolicy::bounded(3);
        fifo.track("key0");
        fifo.track("key1");

        assert_eq!(fifo.peek_victim().unwrap(), "key0");
        // Peek does not remove
        assert_eq!(fifo.count(), 2);
    }

    #[test]
    fn test_fifo_bounded_refuses_when_full() {
        let mut fifo = FifoPolicy::bounded(3);
        for i in 0..10 {
            let added = fifo.track(&format!("key{}", i));
            assert_eq!(added, i < 3, "track #{} returned {}", i, added);
        }
        assert_eq!(fifo.count(), 3);
        assert_eq!(fifo.bound(), Some(3));
    }

    #[test]
    fn test_fifo_untrack_positions() {
        let mut fifo = FifoPolicy::new();
        for key in ["1", "2", "3", "4", "5"] {
            fifo.track(key);
        }

        // Last
        fifo.untrack("5");
        assert_eq!(fifo.candidates().collect::<Vec<_>>(), ["1", "2", "3", "4"]);

        // First
        fifo.untrack("1");
        assert_eq!(fifo.candidates().collect::<Vec<_>>(), ["2", "3", "4"]);

        // Middle
        fifo.untrack("3");
        assert_eq!(fifo.candidates().collect::<Vec<_>>(), ["2", "4"]);
    }

    #[test]
    fn test_fifo_untrack_nonexistent_key() {
        let mut fifo = FifoPolicy::new();
        fifo.track("key1");
        fifo.track("key2");

        fifo.untrack("nonexistent");

        assert_eq!(fifo.count(), 2);
        assert!(fifo.contains("key1"));
        assert!(fifo.contains("key2"));
    }

    #[test]
    fn test_fifo_retrack_moves_to_back() {
        let mut fifo = FifoPolicy::new();
        fifo.track("a");
        fifo.track("b");
        fifo.track("c");

        fifo.untrack("a");
        fifo.track("a");

        assert_eq!(fifo.peek_victim().unwrap(), "b");
        assert_eq!(fifo.candidates().collect::<Vec<_>>(), ["b", "c", "a"]);
    }

    #[test]
    fn test_fifo_untrack_frees_bounded_slot() {
        let mut fifo = FifoPolicy::bounded(2);
        assert!(fifo.track("a"));
        assert!(fifo.track("b"));
        assert!(!fifo.track("c"));

        fifo.untrack("a");
        assert!(fifo.track("c"));
        assert_eq!(fifo.candidates().collect::<Vec<_>>(), ["b", "c"]);
    }

    #[test]
    fn test_fifo_clear() {
        let mut fifo = FifoPolicy::bounded(10);
        fifo.track("key1");
        assert!(!fifo.is_empty());

        fifo.clear();
        assert!(fifo.is_empty());
        assert_eq!(fifo.count(), 0);
        assert!(fifo.peek_victim().is_err());
    }
}
