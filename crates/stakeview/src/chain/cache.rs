//! Per-block memoization of idempotent upstream responses.
//!
//! Height-scoped entries live in a [`Generation`]; a new block swaps in a fresh
//! generation with one atomic pointer store, so a reader sees either the whole
//! old generation or the whole new one. TTL-scoped entries survive block
//! changes and expire by the injected clock.

use crate::chain::clock::Clock;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::OnceCell;
use tracing::debug;

/// How long a cached response stays valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// Valid until the next observed block.
    PerBlock,
    /// Valid for a fixed duration regardless of blocks.
    Ttl(Duration),
}

/// One block height's worth of height-scoped entries.
pub struct Generation<V> {
    height: Option<u64>,
    entries: DashMap<String, Arc<OnceCell<V>>>,
}

impl<V> Generation<V> {
    fn new(height: Option<u64>) -> Self {
        Self {
            height,
            entries: DashMap::new(),
        }
    }

    pub fn height(&self) -> Option<u64> {
        self.height
    }

    fn slot(&self, key: &str) -> Arc<OnceCell<V>> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()));
        Arc::clone(entry.value())
    }
}

struct Stamped<V> {
    stored_at: OffsetDateTime,
    ttl: Duration,
    value: V,
}

pub struct PerBlockCache<V = serde_json::Value> {
    generation: ArcSwap<Generation<V>>,
    ttl_entries: DashMap<String, Arc<OnceCell<Stamped<V>>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone + Send + Sync + 'static> PerBlockCache<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            generation: ArcSwap::from_pointee(Generation::new(None)),
            ttl_entries: DashMap::new(),
            clock,
        }
    }

    /// Height of the current generation, if a block has been observed.
    pub fn height(&self) -> Option<u64> {
        self.generation.load().height
    }

    /// Drop every height-scoped entry and start a generation for `height`.
    ///
    /// Readers holding a [`CacheView`] keep the generation they pinned. TTL
    /// entries past their own TTL are removed as well.
    pub fn advance(&self, height: u64) {
        let previous = self.generation.swap(Arc::new(Generation::new(Some(height))));
        debug!(
            height,
            previous = ?previous.height,
            dropped = previous.entries.len(),
            "cache generation advanced"
        );
        self.evict_expired();
    }

    /// Number of TTL-scoped keys currently held.
    pub fn ttl_len(&self) -> usize {
        self.ttl_entries.len()
    }

    /// Remove TTL entries whose own TTL has passed.
    fn evict_expired(&self) {
        let now = self.clock.now();
        let before = self.ttl_entries.len();
        self.ttl_entries.retain(|_, slot| {
            slot.get()
                .is_none_or(|stamped| stamped.stored_at + stamped.ttl > now)
        });
        let evicted = before.saturating_sub(self.ttl_entries.len());
        if evicted > 0 {
            debug!(evicted, "expired ttl entries removed");
        }
    }

    /// Pin the current generation; all gets through the view resolve against it.
    pub fn pin(&self) -> CacheView<'_, V> {
        CacheView {
            generation: self.generation.load_full(),
            cache: self,
        }
    }

    /// Shorthand for `self.pin().get(..)`.
    pub async fn get<F, Fut, E>(&self, key: &str, policy: CachePolicy, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.pin().get(key, policy, fetch).await
    }

    fn ttl_slot(&self, key: &str, ttl: Duration) -> Arc<OnceCell<Stamped<V>>> {
        let now = self.clock.now();
        let mut entry = self
            .ttl_entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()));
        let expired = entry
            .value()
            .get()
            .is_some_and(|stamped| stamped.stored_at + ttl <= now);
        if expired {
            debug!(key, "ttl entry expired");
            *entry.value_mut() = Arc::new(OnceCell::new());
        }
        Arc::clone(entry.value())
    }
}

/// A cache handle bound to one generation.
pub struct CacheView<'a, V = serde_json::Value> {
    generation: Arc<Generation<V>>,
    cache: &'a PerBlockCache<V>,
}

impl<V: Clone + Send + Sync + 'static> CacheView<'_, V> {
    pub fn height(&self) -> Option<u64> {
        self.generation.height
    }

    /// Return the memoized value for `key`, or run `fetch` and memoize its result.
    ///
    /// Concurrent callers of the same key share one in-flight fetch. Errors are
    /// returned to every waiter and nothing is stored.
    pub async fn get<F, Fut, E>(&self, key: &str, policy: CachePolicy, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        match policy {
            CachePolicy::PerBlock => {
                let slot = self.generation.slot(key);
                if let Some(hit) = slot.get() {
                    debug!(key, height = ?self.generation.height, "cache hit");
                    return Ok(hit.clone());
                }
                slot.get_or_try_init(fetch).await.cloned()
            }
            CachePolicy::Ttl(ttl) => {
                let slot = self.cache.ttl_slot(key, ttl);
                if let Some(hit) = slot.get() {
                    debug!(key, "cache hit (ttl)");
                    return Ok(hit.value.clone());
                }
                let clock = Arc::clone(&self.cache.clock);
                let stamped = slot
                    .get_or_try_init(|| async move {
                        let value = fetch().await?;
                        Ok::<_, E>(Stamped {
                            stored_at: clock.now(),
                            ttl,
                            value,
                        })
                    })
                    .await?;
                Ok(stamped.value.clone())
            }
        }
    }
}
