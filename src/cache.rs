//! Memoization of finished rankings.
//!
//! Keys are BLAKE3 digests of `(user_text, profile_tags, corpus_size)`. The
//! corpus only contributes its size, so edits that keep the post count
//! unchanged are not detected until the entry expires.
//!
//! Every key owns a slot holding a [`tokio::sync::OnceCell`]. Concurrent
//! misses on the same key wait on the first computation instead of issuing
//! their own remote call. Slots still being computed sit in a side table and
//! only enter the LRU once filled, so in-flight requests never evict finished
//! rankings. A computation that declines to cache drops its slot, so the next
//! caller computes again.

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use crate::config::CacheConfig;
use crate::models::SearchResponse;

/// Hex-encoded BLAKE3 digest identifying a ranking.
pub type CacheKey = String;

/// Build the cache key for a request against a corpus of `corpus_size` posts.
///
/// Each field is length-prefixed so that text and tags cannot bleed into
/// each other. Absent and blank tags hash the same.
pub fn key_for(user_text: &str, profile_tags: Option<&str>, corpus_size: usize) -> CacheKey {
    let tags = profile_tags.unwrap_or("");
    let mut hasher = blake3::Hasher::new();
    for field in [user_text.as_bytes(), tags.as_bytes()] {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field);
    }
    hasher.update(&(corpus_size as u64).to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Outcome of a computation run on a cache miss.
#[derive(Debug)]
pub enum Computed {
    /// Store the response under the key.
    Store(SearchResponse),
    /// Return the response without caching it.
    Skip(SearchResponse),
}

/// How a lookup was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

#[derive(Debug, Clone)]
struct CachedPayload {
    response: SearchResponse,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct Slot {
    cell: OnceCell<CachedPayload>,
}

impl Slot {
    fn filled(response: SearchResponse) -> Self {
        Self {
            cell: OnceCell::new_with(Some(CachedPayload {
                response,
                stored_at: Instant::now(),
            })),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
    pub hit_rate: f64,
}

#[derive(Debug)]
struct Slots {
    /// Filled slots, bounded by capacity.
    ready: LruCache<CacheKey, Arc<Slot>>,
    /// Slots whose first computation has not finished yet.
    pending: HashMap<CacheKey, Arc<Slot>>,
}

/// Bounded LRU cache of ranking responses with optional TTL.
#[derive(Debug)]
pub struct RankingCache {
    slots: Mutex<Slots>,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RankingCache {
    /// `ttl` of `None` keeps entries until they are evicted by capacity.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(Slots {
                ready: LruCache::new(capacity),
                pending: HashMap::new(),
            }),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let ttl = (config.ttl_secs > 0).then(|| Duration::from_secs(config.ttl_secs));
        Self::new(config.capacity, ttl)
    }

    fn is_fresh(&self, payload: &CachedPayload) -> bool {
        match self.ttl {
            Some(ttl) => payload.stored_at.elapsed() < ttl,
            None => true,
        }
    }

    /// Fetch the slot for `key`: a fresh filled one, the one being computed,
    /// or a new pending slot.
    fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock();
        let fresh = slots
            .ready
            .get(key)
            .filter(|slot| slot.cell.get().is_some_and(|p| self.is_fresh(p)))
            .cloned();
        if let Some(slot) = fresh {
            return slot;
        }
        slots.ready.pop(key);

        slots
            .pending
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Slot::default()))
            .clone()
    }

    /// Cached response for `key`, if present and fresh.
    pub fn get(&self, key: &str) -> Option<SearchResponse> {
        let mut slots = self.slots.lock();
        let found = slots
            .ready
            .get(key)
            .and_then(|slot| slot.cell.get())
            .filter(|payload| self.is_fresh(payload))
            .map(|payload| payload.response.clone());

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store `response` under `key`, replacing any previous entry.
    pub fn put(&self, key: &str, response: SearchResponse) {
        let mut slots = self.slots.lock();
        slots
            .ready
            .put(key.to_string(), Arc::new(Slot::filled(response)));
    }

    /// Serve `key` from the cache, or run `compute` once for all concurrent
    /// callers of the same key.
    ///
    /// Callers that were waiting on a computation returning
    /// [`Computed::Skip`] retry with their own `compute`.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> (SearchResponse, CacheOutcome)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Computed>,
    {
        let slot = self.slot(key);

        if let Some(payload) = slot.cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return (payload.response.clone(), CacheOutcome::Hit);
        }

        let mut computed_here = false;
        let ran = &mut computed_here;
        let result = slot
            .cell
            .get_or_try_init(move || async move {
                *ran = true;
                match compute().await {
                    Computed::Store(response) => Ok(CachedPayload {
                        response,
                        stored_at: Instant::now(),
                    }),
                    Computed::Skip(response) => Err(response),
                }
            })
            .await;

        let outcome = if computed_here {
            self.misses.fetch_add(1, Ordering::Relaxed);
            CacheOutcome::Miss
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            CacheOutcome::Hit
        };

        match result {
            Ok(payload) => {
                if computed_here {
                    self.promote(key, &slot);
                }
                (payload.response.clone(), outcome)
            }
            Err(response) => {
                self.release(key, &slot);
                (response, outcome)
            }
        }
    }

    /// Move a filled slot from the pending table into the LRU.
    fn promote(&self, key: &str, slot: &Arc<Slot>) {
        let mut slots = self.slots.lock();
        release_locked(&mut slots, key, slot);
        slots.ready.put(key.to_string(), slot.clone());
    }

    /// Drop `slot` from the pending table if it is still the one under `key`.
    fn release(&self, key: &str, slot: &Arc<Slot>) {
        let mut slots = self.slots.lock();
        release_locked(&mut slots, key, slot);
    }

    /// Number of stored responses.
    pub fn len(&self) -> usize {
        self.slots.lock().ready.len()
    }

    /// Number of keys with a computation in flight.
    pub fn pending(&self) -> usize {
        self.slots.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            size: self.len(),
            capacity: self.slots.lock().ready.cap().get(),
            hit_rate,
        }
    }
}

fn release_locked(slots: &mut Slots, key: &str, slot: &Arc<Slot>) {
    if slots
        .pending
        .get(key)
        .is_some_and(|current| Arc::ptr_eq(current, slot))
    {
        slots.pending.remove(key);
    }
}
