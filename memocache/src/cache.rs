//! In-memory TTL cache for async lookups with request coalescing.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, trace, warn};

use memocache_core::constants::{sweep_interval_for, SWEEP_INTERVAL_MULTIPLIER};
use memocache_core::error::{CacheError, Result};
use memocache_core::{AlwaysRetain, CacheConfig, RetentionPolicy};

/// Shared result of one producer invocation.
///
/// Every caller that hits the same pending or fresh entry gets a clone of the same
/// handle and observes the same outcome.
pub type CacheHandle<T, E> = Shared<BoxFuture<'static, std::result::Result<T, E>>>;

/// Cache entry, pending until `resolved_at` is stamped.
struct CacheEntry<T, E> {
    /// Distinguishes this entry from a later one stored under the same key.
    id: u64,
    handle: CacheHandle<T, E>,
    resolved_at: Option<Instant>,
}

impl<T, E> CacheEntry<T, E> {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        match self.resolved_at {
            Some(resolved_at) => now.saturating_duration_since(resolved_at) >= ttl,
            None => false,
        }
    }
}

/// State shared between the cache, its settlement reactions and the sweep task.
struct CacheState<T, E> {
    entries: RwLock<HashMap<String, CacheEntry<T, E>>>,
    ttl: Duration,
    policy: Box<dyn RetentionPolicy<T>>,
    next_id: AtomicU64,
}

impl<T, E> CacheState<T, E> {
    /// Applies a producer outcome to the entry it was started for.
    ///
    /// Does nothing if the key no longer maps to entry `id`.
    fn settle(&self, key: &str, id: u64, outcome: &std::result::Result<T, E>) {
        let retain = match outcome {
            Ok(value) => self.policy.should_retain(value),
            Err(_) => false,
        };

        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(key).filter(|entry| entry.id == id) else {
            debug!(key, id, "Entry was replaced before its producer settled");
            return;
        };

        if retain {
            entry.resolved_at = Some(Instant::now());
            debug!(key, "Value cached");
            return;
        }

        entries.remove(key);
        if outcome.is_ok() {
            debug!(key, "Value rejected by retention policy");
        } else {
            debug!(key, "Producer failed, entry dropped");
        }
    }

    /// Removes entry `id` after its producer panicked.
    fn discard(&self, key: &str, id: u64) {
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.id == id) {
            entries.remove(key);
            warn!(key, "Producer panicked, entry dropped");
        }
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
        before - entries.len()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries physically stored, whatever their state
    pub total_entries: usize,
    /// Entries whose producer has not settled yet
    pub pending_entries: usize,
    /// Resolved entries still within their TTL
    pub fresh_entries: usize,
    /// Resolved entries past their TTL, waiting for the sweep
    pub expired_entries: usize,
}

/// Time-bounded memoization of async lookups keyed by string.
///
/// - Concurrent [`get`](Self::get) calls for a key share one producer invocation.
/// - Resolved values are served from memory until the TTL elapses.
/// - Failures and values refused by the [`RetentionPolicy`] are never cached.
/// - A background sweep reclaims expired entries every
///   `ttl * SWEEP_INTERVAL_MULTIPLIER`.
///
/// Must be created inside a tokio runtime. Call [`destroy`](Self::destroy) (or drop
/// the cache) to stop the sweep.
pub struct AsyncMemCache<T, E> {
    state: Arc<CacheState<T, E>>,
    runtime: Handle,
    sweep: Mutex<Option<JoinHandle<()>>>,
    sweep_interval: Duration,
}

impl<T, E> AsyncMemCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a cache that retains every successfully produced value.
    pub fn new(ttl: Duration) -> Result<Self> {
        Self::with_retention_policy(ttl, AlwaysRetain)
    }

    /// Creates a cache that only retains values accepted by `policy`.
    pub fn with_retention_policy<P>(ttl: Duration, policy: P) -> Result<Self>
    where
        P: RetentionPolicy<T> + 'static,
    {
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl { ttl_ms: 0 });
        }
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let state = Arc::new(CacheState {
            entries: RwLock::new(HashMap::new()),
            ttl,
            policy: Box::new(policy),
            next_id: AtomicU64::new(0),
        });

        let sweep_interval = sweep_interval_for(ttl);
        let sweep = runtime.spawn(run_sweep(Arc::downgrade(&state), sweep_interval));

        info!(
            ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            sweep_interval_ms = u64::try_from(sweep_interval.as_millis()).unwrap_or(u64::MAX),
            "Cache created"
        );

        Ok(Self {
            state,
            runtime,
            sweep: Mutex::new(Some(sweep)),
            sweep_interval,
        })
    }

    /// Creates a cache from a configuration.
    pub fn with_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.ttl()?)
    }

    /// Creates a cache from a configuration and a retention policy.
    pub fn with_config_and_policy<P>(config: &CacheConfig, policy: P) -> Result<Self>
    where
        P: RetentionPolicy<T> + 'static,
    {
        Self::with_retention_policy(config.ttl()?, policy)
    }

    /// Returns the shared result for `key`, invoking `producer` only on a miss.
    ///
    /// A pending or fresh entry is reused as is and `producer` is dropped without
    /// being called. Otherwise `producer` is called right away and its future is
    /// driven to completion in the background, even if every returned handle is
    /// dropped.
    ///
    /// `producer` runs while the cache is locked, so it must not call back into
    /// this cache before returning its future. The future itself may.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cache: AsyncMemCache<String, Arc<io::Error>> = AsyncMemCache::new(ttl)?;
    /// let body = cache.get("config.json", || fetch("config.json")).await?;
    /// ```
    #[instrument(level = "debug", skip(self, producer))]
    pub fn get<F, Fut>(&self, key: &str, producer: F) -> CacheHandle<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let now = Instant::now();
        let mut entries = self.state.entries.write();

        match entries.get(key) {
            Some(entry) if !entry.is_expired(self.state.ttl, now) => {
                debug!(pending = entry.resolved_at.is_none(), "Cache hit");
                return entry.handle.clone();
            }
            Some(_) => debug!("Entry expired, invoking producer"),
            None => debug!("Cache miss, invoking producer"),
        }

        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::downgrade(&self.state);
        let owned_key = key.to_owned();
        let pending = producer();

        let handle = async move {
            match AssertUnwindSafe(pending).catch_unwind().await {
                Ok(outcome) => {
                    if let Some(state) = state.upgrade() {
                        state.settle(&owned_key, id, &outcome);
                    }
                    outcome
                }
                Err(payload) => {
                    if let Some(state) = state.upgrade() {
                        state.discard(&owned_key, id);
                    }
                    panic::resume_unwind(payload)
                }
            }
        }
        .boxed()
        .shared();

        entries.insert(
            key.to_owned(),
            CacheEntry {
                id,
                handle: handle.clone(),
                resolved_at: None,
            },
        );
        drop(entries);

        self.runtime.spawn(handle.clone());
        handle
    }
}

impl<T, E> AsyncMemCache<T, E> {
    /// The sweep runs every `ttl * SWEEP_INTERVAL_MULTIPLIER`.
    pub const SWEEP_INTERVAL_MULTIPLIER: u32 = SWEEP_INTERVAL_MULTIPLIER;

    /// Returns the number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.state.entries.read().len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.state.entries.read().is_empty()
    }

    /// Returns the TTL of resolved values.
    pub fn ttl(&self) -> Duration {
        self.state.ttl
    }

    /// Returns the period of the background sweep.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.state.entries.read();
        let mut stats = CacheStats {
            total_entries: entries.len(),
            ..Default::default()
        };
        for entry in entries.values() {
            if entry.resolved_at.is_none() {
                stats.pending_entries += 1;
            } else if entry.is_expired(self.state.ttl, now) {
                stats.expired_entries += 1;
            } else {
                stats.fresh_entries += 1;
            }
        }
        stats
    }

    /// Removes all expired entries now, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.state.purge_expired(Instant::now())
    }

    /// Removes the entry for `key`, whatever its state.
    ///
    /// A pending producer keeps running and its waiters still get its outcome,
    /// but the outcome is no longer cached.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.state.entries.write().remove(key).is_some();
        debug!(key, removed, "Invalidated entry");
        removed
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.state.entries.write().clear();
    }

    /// Stops the background sweep.
    ///
    /// Stored entries and running producers are left alone. Calling this more
    /// than once has no further effect.
    pub fn destroy(&self) {
        if let Some(sweep) = self.sweep.lock().take() {
            sweep.abort();
            info!("Cache destroyed, expiry sweep stopped");
        }
    }

    /// Returns true once [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.sweep.lock().is_none()
    }
}

impl<T, E> Drop for AsyncMemCache<T, E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<T, E> fmt::Debug for AsyncMemCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMemCache")
            .field("ttl", &self.state.ttl)
            .field("sweep_interval", &self.sweep_interval)
            .field("entries", &self.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Periodically removes expired entries until the cache is gone or the task aborted.
async fn run_sweep<T, E>(state: Weak<CacheState<T, E>>, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(state) = state.upgrade() else {
            break;
        };
        let removed = state.purge_expired(Instant::now());
        if removed > 0 {
            let remaining = state.entries.read().len();
            debug!(removed, remaining, "Swept expired entries");
        } else {
            trace!("Sweep found nothing to remove");
        }
    }
}
