//! Cache Store Module
//!
//! Entry map, memory accounting and eviction, without locking. [`Cache`]
//! wraps the store in a lock and delivers eviction notifications.
//!
//! The store keeps three things in agreement after every operation:
//! - the policy tracks exactly the keys of the entry map,
//! - `memory_used` equals the sum of entry sizes,
//! - a failed insert leaves all of the above untouched.
//!
//! [`Cache`]: crate::cache::Cache

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::mem;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cache::{CacheEntry, EvictionCallback, Sizer, Ttl, ENTRY_OVERHEAD};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::policy::EvictionPolicy;

/// Key and value removed from the store, waiting for notification.
pub type Evicted<V> = Vec<(String, V)>;

// == Cache Store ==
/// Main cache storage with memory accounting, eviction and TTL support.
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Victim selection
    policy: Box<dyn EvictionPolicy>,
    /// Sizes values
    sizer: Sizer<V>,
    /// Estimated bytes held by all entries
    memory_used: usize,
    /// Upper bound on `memory_used`
    memory_limit: usize,
    /// Maximum number of entries, 0 = unbounded
    capacity: usize,
    /// TTL for inserts requesting the default
    default_ttl: Duration,
    /// Notified about removed entries once the lock is released
    on_evicted: Option<EvictionCallback<V>>,
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store with the limits from `config`.
    ///
    /// `config` is expected to be validated already.
    pub fn new(config: &Config, policy: Box<dyn EvictionPolicy>, sizer: Sizer<V>) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
            sizer,
            memory_used: 0,
            memory_limit: config.memory_limit,
            capacity: config.capacity,
            default_ttl: config.default_expiration,
            on_evicted: None,
        }
    }

    // == Insert ==
    /// Stores a key-value pair, replacing any existing entry for the key.
    ///
    /// Evicts entries as needed to respect the capacity and memory limits.
    /// The victims are chosen before anything is changed: if the policy runs
    /// out of candidates the insert fails and the store is left as it was.
    ///
    /// Returns the evicted entries. An overwritten entry is not among them.
    ///
    /// A policy that refuses the key without having reported a
    /// [`bound`](EvictionPolicy::bound) also fails the insert. The detached
    /// entries are then re-registered, at the back of the eviction order.
    pub fn insert(&mut self, key: String, value: V, ttl: Ttl) -> Result<Evicted<V>> {
        let expires_at = ttl.expires_at(Instant::now(), self.default_ttl);
        let size = self.estimate_entry(&key, &value);

        let victims = self.plan_evictions(&key, size)?;

        // Overwrite is a delete followed by an insert
        let previous = self.detach(&key);

        let detached: Vec<(String, CacheEntry<V>)> = victims
            .into_iter()
            .filter_map(|victim| self.detach(&victim).map(|entry| (victim, entry)))
            .collect();

        if !self.policy.track(&key) {
            // Policy refused without announcing a bound; put everything back
            let mut restore = detached;
            restore.extend(previous.map(|entry| (key.clone(), entry)));
            self.restore(restore);
            return Err(CacheError::PolicyExhausted {
                key,
                required: size,
            });
        }

        if !detached.is_empty() {
            debug!(
                "Evicted {} entries to make room for '{}' ({} bytes)",
                detached.len(),
                key,
                size
            );
        }
        self.memory_used += size;
        self.entries
            .insert(key, CacheEntry::new(value, expires_at, size));

        Ok(detached
            .into_iter()
            .map(|(victim, entry)| (victim, entry.value))
            .collect())
    }

    // == Insert If Absent ==
    /// Inserts only if the key is absent or expired.
    pub fn insert_if_absent(&mut self, key: String, value: V, ttl: Ttl) -> Result<Evicted<V>> {
        if self.get(&key).is_some() {
            return Err(CacheError::AlreadyExists(key));
        }
        self.insert(key, value, ttl)
    }

    // == Replace ==
    /// Replaces the value of a live key.
    ///
    /// The key is re-registered with the policy as newly inserted.
    pub fn replace(&mut self, key: String, value: V, ttl: Ttl) -> Result<Evicted<V>> {
        if self.get(&key).is_none() {
            return Err(CacheError::NotFound(key));
        }
        self.insert(key, value, ttl)
    }

    // == Remove ==
    /// Removes an entry by key, expired or not.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.detach(key).map(|entry| entry.value)
    }

    // == Expire All ==
    /// Removes all expired entries and returns them.
    pub fn expire_all(&mut self) -> Evicted<V> {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| self.detach(&key).map(|entry| (key, entry.value)))
            .collect()
    }

    // == Get ==
    /// Returns the value of a live entry.
    ///
    /// Expired entries read as absent but stay in the store until removed.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.get_entry(key).map(|entry| &entry.value)
    }

    /// Returns a live entry with its metadata.
    pub fn get_entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    // == Clear ==
    /// Removes every entry and resets memory accounting and the policy.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.policy.clear();
        self.memory_used = 0;
    }

    // == Replace Policy ==
    /// Swaps the eviction policy, registering current keys in the present
    /// eviction order.
    ///
    /// Fails without changes if the new policy refuses any key.
    pub fn set_policy(&mut self, mut policy: Box<dyn EvictionPolicy>) -> Result<()> {
        policy.clear();
        for key in self.policy.candidates() {
            if !policy.track(key) {
                return Err(CacheError::Config(format!(
                    "replacement eviction policy cannot hold {} keys",
                    self.entries.len()
                )));
            }
        }
        self.policy = policy;
        Ok(())
    }

    pub fn set_eviction_callback(&mut self, callback: Option<EvictionCallback<V>>) {
        self.on_evicted = callback;
    }

    pub fn eviction_callback(&self) -> Option<EvictionCallback<V>> {
        self.on_evicted.clone()
    }

    // == Accessors ==
    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    pub fn memory_limit(&self) -> usize {
        self.memory_limit
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> &dyn EvictionPolicy {
        self.policy.as_ref()
    }

    // == Estimate Entry ==
    /// Bytes an entry for `key` holding `value` is accounted as.
    pub fn estimate_entry(&self, key: &str, value: &V) -> usize {
        // Key is stored as an owned String. Saturates so that an absurd
        // estimate fails the memory check instead of wrapping.
        mem::size_of::<String>()
            .saturating_add(key.len())
            .saturating_add((self.sizer)(value))
            .saturating_add(ENTRY_OVERHEAD)
    }

    // == Check Invariants ==
    /// Verifies that the policy and memory counter agree with the entries.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for key in self.policy.candidates() {
            if !seen.insert(key) {
                return Err(format!("policy tracks '{}' more than once", key));
            }
            if !self.entries.contains_key(key) {
                return Err(format!("policy tracks missing key '{}'", key));
            }
        }
        if self.policy.count() != self.entries.len() {
            return Err(format!(
                "policy tracks {} keys, store holds {}",
                self.policy.count(),
                self.entries.len()
            ));
        }
        if seen.len() != self.entries.len() {
            return Err(format!(
                "{} stored keys are not tracked by the policy",
                self.entries.len() - seen.len()
            ));
        }
        let total: usize = self.entries.values().map(|entry| entry.size).sum();
        if total != self.memory_used {
            return Err(format!(
                "memory counter is {}, entries hold {}",
                self.memory_used, total
            ));
        }
        Ok(())
    }

    // == Internals ==
    /// Chooses the victims needed to fit an entry of `size` bytes under `key`.
    fn plan_evictions(&self, key: &str, size: usize) -> Result<Vec<String>> {
        let exhausted = || CacheError::PolicyExhausted {
            key: key.to_string(),
            required: size,
        };

        if size > self.memory_limit {
            return Err(exhausted());
        }

        // The entry being overwritten is released first
        let (count, mut memory) = match self.entries.get(key) {
            Some(old) => (self.entries.len() - 1, self.memory_used - old.size),
            None => (self.entries.len(), self.memory_used),
        };

        let max_entries = match (self.capacity, self.policy.bound()) {
            (0, bound) => bound,
            (capacity, Some(bound)) => Some(capacity.min(bound)),
            (capacity, None) => Some(capacity),
        };

        let mut candidates = self.policy.candidates().filter(|candidate| *candidate != key);
        let mut victims = Vec::new();

        if let Some(max_entries) = max_entries {
            if count >= max_entries {
                let victim = candidates.next().ok_or_else(exhausted)?;
                memory -= self.entries.get(victim).map_or(0, |entry| entry.size);
                victims.push(victim.to_string());
            }
        }

        while memory
            .checked_add(size)
            .map_or(true, |total| total > self.memory_limit)
        {
            let victim = candidates.next().ok_or_else(exhausted)?;
            memory -= self.entries.get(victim).map_or(0, |entry| entry.size);
            victims.push(victim.to_string());
        }

        Ok(victims)
    }

    /// Re-registers detached entries. An entry the policy still refuses is
    /// dropped so the map never holds an untracked key.
    fn restore(&mut self, detached: Vec<(String, CacheEntry<V>)>) {
        for (key, entry) in detached {
            if self.policy.track(&key) {
                self.memory_used += entry.size;
                self.entries.insert(key, entry);
            } else {
                warn!("Policy refused to re-register '{}'; entry dropped", key);
            }
        }
    }

    /// Removes an entry and releases its accounting.
    fn detach(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.memory_used = self.memory_used.saturating_sub(entry.size);
        self.policy.untrack(key);
        Some(entry)
    }
}

impl<V> fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .field("memory_used", &self.memory_used)
            .field("memory_limit", &self.memory_limit)
            .field("capacity", &self.capacity)
            .field("default_ttl", &self.default_ttl)
            .field("policy", &self.policy)
            .finish()
    }
}
