//! Cache Handle Module
//!
//! Thread-safe front end over [`CacheStore`]: a single reader/writer lock,
//! shared statistics and the optional expiration sweeper.
//!
//! Eviction notifications are collected while the lock is held and delivered
//! after it is released, so a callback may call back into the cache.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::cache::{CacheStats, CacheStore, EvictionCallback, Evicted, StatsRecorder, Ttl};
use crate::config::Config;
use crate::error::Result;
use crate::policy::EvictionPolicy;
use crate::sizing::{estimate_size, DeepSizeOf};
use crate::tasks::Sweeper;

// == Cache ==
/// Memory-bounded key-value cache with TTL expiration.
///
/// Cloning is cheap and every clone shares the same entries. The sweeper,
/// when configured, stops once the last clone is dropped.
///
/// # Example
/// ```
/// use memcap_cache::{Cache, Config, Ttl};
///
/// let config = Config::default()
///     .with_memory_limit(1024 * 1024)
///     .with_cleanup_interval(std::time::Duration::ZERO);
/// let cache: Cache<String> = Cache::new(config).unwrap();
///
/// cache.insert("greeting", "hello".to_string(), Ttl::Default).unwrap();
/// assert_eq!(cache.get("greeting").as_deref(), Some("hello"));
/// ```
pub struct Cache<V> {
    inner: Arc<Inner<V>>,
}

struct Inner<V> {
    store: RwLock<CacheStore<V>>,
    stats: StatsRecorder,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<V> Inner<V> {
    fn expire_all(&self) -> usize {
        let (expired, callback) = {
            let mut store = self.store.write();
            let expired = store.expire_all();
            (expired, store.eviction_callback())
        };
        self.stats.record_expirations(expired.len());
        notify(callback, &expired);
        expired.len()
    }
}

fn notify<V>(callback: Option<EvictionCallback<V>>, removed: &[(String, V)]) {
    if let Some(callback) = callback {
        for (key, value) in removed {
            callback(key, value);
        }
    }
}

impl<V: DeepSizeOf + Send + Sync + 'static> Cache<V> {
    // == Constructor ==
    /// Creates a cache sizing values with [`estimate_size`].
    ///
    /// # Errors
    /// Returns [`CacheError::Config`](crate::CacheError::Config) when the
    /// memory limit is missing, the eviction policy is unknown, or a cleanup
    /// interval is set outside a Tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_sizer(config, estimate_size::<V>)
    }

    /// Creates a cache and stores `entries` in order with the default
    /// expiration. Later entries may evict earlier ones under the limits.
    ///
    /// # Errors
    /// Fails like [`Cache::new`], or with
    /// [`CacheError::PolicyExhausted`](crate::CacheError::PolicyExhausted)
    /// for an entry that cannot fit on its own.
    pub fn with_entries<K, I>(config: Config, entries: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let cache = Self::new(config)?;
        for (key, value) in entries {
            cache.set_default(key, value)?;
        }
        Ok(cache)
    }
}

impl<V: Send + Sync + 'static> Cache<V> {
    /// Creates a cache sizing values with `sizer`.
    ///
    /// Useful for payloads whose footprint is known better than a deep
    /// estimate can tell, or which do not implement [`DeepSizeOf`].
    pub fn with_sizer<F>(config: Config, sizer: F) -> Result<Self>
    where
        F: Fn(&V) -> usize + Send + Sync + 'static,
    {
        let kind = config.validate()?;
        Self::build(config, kind.build(), Box::new(sizer))
    }

    /// Creates a cache evicting with a caller-supplied policy.
    ///
    /// The policy selector in `config` is ignored.
    pub fn with_policy<F>(config: Config, policy: Box<dyn EvictionPolicy>, sizer: F) -> Result<Self>
    where
        F: Fn(&V) -> usize + Send + Sync + 'static,
    {
        config.validate_limits()?;
        Self::build(config, policy, Box::new(sizer))
    }

    fn build(
        config: Config,
        policy: Box<dyn EvictionPolicy>,
        sizer: Box<dyn Fn(&V) -> usize + Send + Sync>,
    ) -> Result<Self> {
        let inner = Arc::new(Inner {
            store: RwLock::new(CacheStore::new(&config, policy, sizer)),
            stats: StatsRecorder::new(),
            sweeper: Mutex::new(None),
        });

        if !config.cleanup_interval.is_zero() {
            let weak: Weak<Inner<V>> = Arc::downgrade(&inner);
            let sweeper = Sweeper::spawn(config.cleanup_interval, move || {
                weak.upgrade().map(|inner| inner.expire_all())
            })?;
            *inner.sweeper.lock() = Some(sweeper);
        }

        info!(
            "Cache initialized: memory_limit={} bytes, capacity={}, cleanup_interval={:?}, default_ttl={:?}",
            config.memory_limit, config.capacity, config.cleanup_interval, config.default_expiration
        );

        Ok(Self { inner })
    }

    // == Writes ==
    /// Stores `value` under `key`, replacing any existing entry.
    ///
    /// # Errors
    /// Returns [`CacheError::PolicyExhausted`](crate::CacheError::PolicyExhausted)
    /// if the entry cannot fit even after evicting everything else. The cache
    /// is unchanged in that case.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: impl Into<Ttl>) -> Result<()> {
        let key = key.into();
        let ttl = ttl.into();
        self.mutate(|store| store.insert(key, value, ttl))
    }

    /// Stores `value` under `key` with the default expiration.
    pub fn set_default(&self, key: impl Into<String>, value: V) -> Result<()> {
        self.insert(key, value, Ttl::Default)
    }

    /// Stores `value` only if `key` is absent or expired.
    ///
    /// # Errors
    /// Returns [`CacheError::AlreadyExists`](crate::CacheError::AlreadyExists)
    /// if a live entry exists.
    pub fn insert_if_absent(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: impl Into<Ttl>,
    ) -> Result<()> {
        let key = key.into();
        let ttl = ttl.into();
        self.mutate(|store| store.insert_if_absent(key, value, ttl))
    }

    /// Replaces the value of a live entry. The key moves to the back of the
    /// eviction order.
    ///
    /// # Errors
    /// Returns [`CacheError::NotFound`](crate::CacheError::NotFound) if
    /// there is no live entry.
    pub fn replace(&self, key: impl Into<String>, value: V, ttl: impl Into<Ttl>) -> Result<()> {
        let key = key.into();
        let ttl = ttl.into();
        self.mutate(|store| store.replace(key, value, ttl))
    }

    /// Removes `key`, expired or not, and returns its value.
    pub fn remove(&self, key: &str) -> Option<V> {
        let (removed, callback) = {
            let mut store = self.inner.store.write();
            (store.remove(key), store.eviction_callback())
        };
        if let (Some(value), Some(callback)) = (&removed, callback) {
            callback(key, value);
        }
        removed
    }

    /// Removes every expired entry and returns how many were removed.
    pub fn expire_all(&self) -> usize {
        self.inner.expire_all()
    }

    /// Removes every entry without notifying.
    pub fn clear(&self) {
        self.inner.store.write().clear();
    }

    fn mutate<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut CacheStore<V>) -> Result<Evicted<V>>,
    {
        let (evicted, callback) = {
            let mut store = self.inner.store.write();
            let evicted = op(&mut store)?;
            (evicted, store.eviction_callback())
        };
        self.inner.stats.record_evictions(evicted.len());
        notify(callback, &evicted);
        Ok(())
    }

    // == Reads ==
    /// Returns a copy of the value for a live entry.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let value = self.inner.store.read().get(key).cloned();
        self.record_lookup(value.is_some());
        value
    }

    /// Returns a copy of the value and its expiration instant, `None` for
    /// entries that never expire.
    pub fn get_with_expiration(&self, key: &str) -> Option<(V, Option<Instant>)>
    where
        V: Clone,
    {
        let found = self
            .inner
            .store
            .read()
            .get_entry(key)
            .map(|entry| (entry.value.clone(), entry.expires_at));
        self.record_lookup(found.is_some());
        found
    }

    /// Returns true if `key` has a live entry. Not counted in statistics.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.store.read().get(key).is_some()
    }

    fn record_lookup(&self, hit: bool) {
        if hit {
            self.inner.stats.record_hit();
        } else {
            self.inner.stats.record_miss();
        }
    }

    // == Accessors ==
    /// Returns the number of stored entries, expired ones not yet swept
    /// included.
    pub fn len(&self) -> usize {
        self.inner.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.read().is_empty()
    }

    /// Returns the estimated bytes held by all entries.
    pub fn memory_used(&self) -> usize {
        self.inner.store.read().memory_used()
    }

    pub fn memory_limit(&self) -> usize {
        self.inner.store.read().memory_limit()
    }

    pub fn stats(&self) -> CacheStats {
        let store = self.inner.store.read();
        self.inner.stats.snapshot(store.len(), store.memory_used())
    }

    /// Checks that entries, policy and memory accounting agree.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        self.inner.store.read().check_invariants()
    }

    // == Configuration ==
    /// Sets or clears the callback run for removed and evicted entries.
    pub fn set_eviction_callback(&self, callback: Option<EvictionCallback<V>>) {
        self.inner.store.write().set_eviction_callback(callback);
    }

    /// Registers `callback` for removed and evicted entries.
    pub fn on_evicted<F>(&self, callback: F)
    where
        F: Fn(&str, &V) + Send + Sync + 'static,
    {
        self.set_eviction_callback(Some(Arc::new(callback)));
    }

    /// Swaps the eviction policy. Current keys keep their eviction order.
    pub fn set_policy(&self, policy: Box<dyn EvictionPolicy>) -> Result<()> {
        self.inner.store.write().set_policy(policy)
    }

    // == Shutdown ==
    /// Signals the expiration sweeper to stop. Entries stay readable and
    /// expire lazily.
    pub fn close(&self) {
        if let Some(mut sweeper) = self.inner.sweeper.lock().take() {
            sweeper.stop();
            info!("Cache closed");
        }
    }

    /// Stops the expiration sweeper and waits for it to exit.
    pub async fn shutdown(&self) {
        let sweeper = self.inner.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
            info!("Cache shut down");
        }
    }

    /// Returns true while the expiration sweeper is running.
    pub fn is_sweeping(&self) -> bool {
        self.inner
            .sweeper
            .lock()
            .as_ref()
            .is_some_and(|sweeper| !sweeper.is_finished())
    }
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("store", &*self.inner.store.read())
            .field("stats", &self.inner.stats)
            .field("sweeper", &self.inner.sweeper.lock().is_some())
            .finish()
    }
}
