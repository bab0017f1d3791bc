//! Interpretation cache.
//!
//! Results are keyed by (lowercased text, sorted active layer names,
//! crs). Eviction is deliberately simple: when the cache exceeds its
//! capacity, the oldest half is dropped in insertion order. That is
//! FIFO, not true LRU — acceptable for a local session cache.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use gl_intent::{GisContext, Intent};

/// Default number of cached interpretations.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    layers: Vec<String>,
    crs: String,
}

impl CacheKey {
    fn new(text: &str, context: &GisContext) -> Self {
        let mut layers: Vec<String> = context
            .active_layers
            .iter()
            .map(|l| l.name.clone())
            .collect();
        layers.sort();
        Self {
            text: text.to_lowercase(),
            layers,
            crs: context.crs.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    map: HashMap<CacheKey, Intent>,
    order: VecDeque<CacheKey>,
}

/// Session-local cache of merged interpretations.
///
/// Insertion and eviction happen as one atomic unit behind a single
/// mutex, so concurrent callers cannot observe a half-evicted state.
#[derive(Debug)]
pub struct InterpretationCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl InterpretationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Look up a cached interpretation. Hits are value copies stamped
    /// with a `from_cache` marker; the stored record is never mutated.
    pub fn get(&self, text: &str, context: &GisContext) -> Option<Intent> {
        let key = CacheKey::new(text, context);
        let inner = self.inner.lock().expect("cache mutex poisoned");
        inner.map.get(&key).map(|intent| {
            let mut copy = intent.clone();
            copy.set_param("from_cache", true);
            copy
        })
    }

    /// Insert an interpretation, evicting the oldest half when the
    /// cache would exceed its capacity.
    pub fn insert(&self, text: &str, context: &GisContext, intent: Intent) {
        let key = CacheKey::new(text, context);
        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        if !inner.map.contains_key(&key) && inner.map.len() >= self.capacity {
            let evict_count = self.capacity / 2 + self.capacity % 2;
            for _ in 0..evict_count {
                if let Some(old) = inner.order.pop_front() {
                    inner.map.remove(&old);
                }
            }
            tracing::debug!(evicted = evict_count, "interpretation cache pruned");
        }

        if inner.map.insert(key.clone(), intent).is_none() {
            inner.order.push_back(key);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InterpretationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
