//! Process-wide result cache with LRU eviction
//!
//! Entries may disappear at any time once the cache is full, so callers
//! treat a miss as "absent" and regenerate. A present key is never
//! overwritten; inserting it again only refreshes its recency.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::key::CacheKey;
use super::types::PreviewResult;

/// Default number of cached previews.
pub const DEFAULT_CAPACITY: usize = 256;

/// Thread-safe LRU store of delivered previews.
///
/// Clones share the same underlying entries.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<Mutex<LruState>>,
}

struct LruState {
    /// Cached entries (key -> result)
    entries: HashMap<CacheKey, PreviewResult>,
    /// LRU order (front = oldest, back = newest)
    lru_order: VecDeque<CacheKey>,
    /// Maximum number of entries
    capacity: usize,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LruState {
                entries: HashMap::new(),
                lru_order: VecDeque::new(),
                capacity: capacity.max(1),
            })),
        }
    }

    /// Get a cached result, marking it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<PreviewResult> {
        let mut state = self.lock();
        let result = state.entries.get(key).cloned()?;
        state.touch(key);
        Some(result)
    }

    /// Check for a key without affecting recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Store a result unless the key is already present.
    ///
    /// Returns `false` when an entry already existed and was kept.
    pub fn put(&self, key: CacheKey, result: PreviewResult) -> bool {
        let mut state = self.lock();
        if state.entries.contains_key(&key) {
            state.touch(&key);
            return false;
        }

        // Evict oldest if at capacity
        while state.entries.len() >= state.capacity {
            if let Some(oldest) = state.lru_order.pop_front() {
                state.entries.remove(&oldest);
            } else {
                break;
            }
        }

        state.entries.insert(key.clone(), result);
        state.lru_order.push_back(key);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.lru_order.clear();
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LruState {
    /// Move a key to the back of the LRU queue (most recently used)
    fn touch(&mut self, key: &CacheKey) {
        self.lru_order.retain(|k| k != key);
        self.lru_order.push_back(key.clone());
    }
}
