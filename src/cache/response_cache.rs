//! Response cache trait and the in-memory implementation.
//!
//! Keys are strings and values are opaque response bodies, so the same
//! store serves wire-format and JSON answers. The bound is FIFO on
//! insertion order: reads never reorder entries, eviction always takes
//! the earliest surviving insert.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;

/// Cache key for a wire-format response.
pub fn wire_key(domain: &str, qtype: u16) -> String {
    format!("{domain}:{qtype}")
}

/// Cache key for a JSON-variant response.
pub fn json_key(name: &str, rtype: &str) -> String {
    format!("json:{name}:{rtype}")
}

/// Trait for response caching.
///
/// The cache is an optimization and can never fail a request:
/// implementations absorb backend faults, reporting a failed lookup as
/// a miss and a failed insert as a no-op. An entry must be fully formed
/// before it becomes visible to concurrent readers.
pub trait ResponseCache: Send + Sync + Clone + 'static {
    /// Get an unexpired cached response for the given key.
    fn get(&self, key: &str) -> impl Future<Output = Option<Bytes>> + Send;

    /// Insert a response with the given time-to-live.
    fn insert(&self, key: String, body: Bytes, ttl: Duration) -> impl Future<Output = ()> + Send;

    /// Returns the number of entries in the cache.
    fn entry_count(&self) -> u64;
}

struct CacheEntry {
    body: Bytes,
    expires_at: Instant,
    /// Insertion sequence number, used to recognise stale order-queue
    /// slots after lazy expiry removals and overwrites.
    seq: u64,
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<(u64, String)>,
    next_seq: u64,
}

/// Bounded in-memory cache with per-entry TTL.
///
/// Expired entries are removed lazily when read. At capacity, inserting
/// a new key evicts the earliest-inserted surviving entry; the order
/// queue may hold slots for entries that were overwritten or expired in
/// the meantime, which eviction skips by comparing sequence numbers.
/// Stale slots are compacted away whenever the queue grows beyond twice
/// the capacity, so bookkeeping stays proportional to the bound.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<Mutex<CacheState>>,
    capacity: usize,
}

impl MemoryCache {
    /// Create a cache bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
                next_seq: 0,
            })),
            capacity,
        }
    }

    #[cfg(test)]
    fn order_len(&self) -> usize {
        self.inner.lock().order.len()
    }
}

impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Bytes> {
        let mut state = self.inner.lock();

        let expired = match state.entries.get(key) {
            Some(entry) => {
                if Instant::now() < entry.expires_at {
                    return Some(entry.body.clone());
                }
                true
            }
            None => false,
        };

        if expired {
            state.entries.remove(key);
        }
        None
    }

    async fn insert(&self, key: String, body: Bytes, ttl: Duration) {
        let mut state = self.inner.lock();

        let seq = state.next_seq;
        state.next_seq += 1;

        // Make room for a genuinely new key. Queue slots whose sequence
        // no longer matches the live entry are leftovers of expiry or
        // overwrite and do not count.
        while state.entries.len() >= self.capacity && !state.entries.contains_key(&key) {
            let Some((old_seq, old_key)) = state.order.pop_front() else {
                break;
            };
            if state
                .entries
                .get(&old_key)
                .is_some_and(|entry| entry.seq == old_seq)
            {
                state.entries.remove(&old_key);
            }
        }

        state.order.push_back((seq, key.clone()));
        state.entries.insert(
            key,
            CacheEntry {
                body,
                expires_at: Instant::now() + ttl,
                seq,
            },
        );

        // Stale slots are only consumed by eviction, which a map below
        // capacity never triggers, so lazy expiry could grow the queue
        // without bound. Compact once it exceeds twice the capacity.
        if state.order.len() > 2 * self.capacity {
            let CacheState { entries, order, .. } = &mut *state;
            order.retain(|(seq, key)| entries.get(key).is_some_and(|entry| entry.seq == *seq));
        }
    }

    fn entry_count(&self) -> u64 {
        self.inner.lock().entries.len() as u64
    }
}
