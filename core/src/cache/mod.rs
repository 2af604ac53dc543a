//! `MatchResultCache` - memoized match outcomes, segmented per plugin
//!
//! Each plugin gets its own segment: a bounded LRU from cache key to matched
//! selector/rule, plus an [`InvalidationTracker`] recording which keys resolved
//! to which target. Segments are created lazily on first write.
//!
//! # Bounds
//!
//! - **Entry ceiling** - per segment, [`CacheConfig::segment_capacity`].
//! - **Memory ceiling** - across all segments, [`CacheConfig::memory_ceiling_bytes`],
//!   charged with an estimated weight per entry. An insertion that crosses the
//!   ceiling evicts the least-recently-used entries of the whole cache, whichever
//!   segment holds them. The entry just written is never its own victim unless it
//!   alone exceeds the ceiling.
//!
//! Eviction never fails: an evicted key is simply a future miss.
//!
//! # Concurrency
//!
//! Segments sit in a [`DashMap`] behind `Arc<Mutex<_>>`. The map guard is
//! released before a segment is locked, so independent plugins never contend
//! beyond a shard lookup. Recency is a cache-wide tick stamped on every access;
//! at most one segment lock is held at a time.

mod segment;
mod stats;
mod tracker;

pub use stats::{CacheStats, CacheStatsSnapshot};
pub use tracker::InvalidationTracker;

use crate::{CacheConfig, MatchTarget, TargetKey};
use dashmap::DashMap;
use parking_lot::Mutex;
use segment::{MemoryBudget, Segment};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Per-plugin bounded map from cache key to matched selector/rule.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::sync::Arc;
/// use waypoint::{CacheConfig, MatchResultCache, MatchTarget, SelectorData};
///
/// let cache = MatchResultCache::new(CacheConfig::default());
/// let s1 = MatchTarget::Selector(Arc::new(SelectorData::new("s1", "rate-limiter", 1)));
///
/// cache.put("rate-limiter", "c1_prod", s1.clone());
/// assert_eq!(cache.get("rate-limiter", "c1_prod"), Some(s1.clone()));
///
/// cache.invalidate("rate-limiter", &s1.key());
/// assert_eq!(cache.get("rate-limiter", "c1_prod"), None);
/// ```
#[derive(Debug)]
pub struct MatchResultCache {
    segments: DashMap<String, Arc<Mutex<Segment>>>,
    budget: MemoryBudget,
    segment_capacity: NonZeroUsize,
    clock: AtomicU64,
    stats: CacheStats,
}

impl Default for MatchResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl MatchResultCache {
    /// Create an empty cache with the given bounds.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            segments: DashMap::new(),
            budget: MemoryBudget::new(config.memory_ceiling_bytes),
            segment_capacity: NonZeroUsize::new(config.segment_capacity).unwrap_or(NonZeroUsize::MIN),
            clock: AtomicU64::new(0),
            stats: CacheStats::default(),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn segment(&self, plugin: &str) -> Option<Arc<Mutex<Segment>>> {
        self.segments.get(plugin).map(|s| Arc::clone(s.value()))
    }

    /// Look up `key` in `plugin`'s segment. Counts as an LRU access.
    pub fn get(&self, plugin: &str, key: &str) -> Option<MatchTarget> {
        let found = self
            .segment(plugin)
            .and_then(|s| s.lock().get(key, self.tick()));
        if found.is_some() {
            self.stats.hit();
            trace!(plugin, key, "match cache hit");
        } else {
            self.stats.miss();
            trace!(plugin, key, "match cache miss");
        }
        found
    }

    /// Returns `true` if `key` is cached for `plugin`. Does not touch LRU order.
    #[must_use]
    pub fn contains(&self, plugin: &str, key: &str) -> bool {
        self.segment(plugin)
            .is_some_and(|s| s.lock().peek(key).is_some())
    }

    /// Cache `target` under `key`, recording the reverse mapping.
    ///
    /// Creates the plugin's segment on first use. May evict least-recently-used
    /// entries of this segment to stay within the entry ceiling, and of any
    /// segment to stay within the memory ceiling.
    pub fn put(&self, plugin: &str, key: impl Into<String>, target: MatchTarget) {
        let key = key.into();
        let segment = Arc::clone(
            self.segments
                .entry(plugin.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Segment::new(self.segment_capacity))))
                .value(),
        );
        let outcome = segment
            .lock()
            .put(key.clone(), target, self.tick(), &self.budget);
        match outcome {
            Some(evicted) => {
                self.stats.inserted();
                let evicted = evicted + self.reclaim(&segment, &key);
                if evicted > 0 {
                    self.stats.evicted(evicted);
                    trace!(plugin, evicted, "match cache evicted entries");
                }
            }
            None => trace!(plugin, "match cache write raced a segment drop, discarded"),
        }
    }

    /// Evict least-recently-used entries across all segments until the memory
    /// ceiling holds. `key` in `inserted` is spared while anything else remains.
    fn reclaim(&self, inserted: &Arc<Mutex<Segment>>, key: &str) -> usize {
        let mut evicted = 0;
        while self.budget.over() {
            let victim = self
                .segment_arcs()
                .into_iter()
                .filter_map(|segment| {
                    let protect = Arc::ptr_eq(&segment, inserted).then_some(key);
                    let tick = segment.lock().oldest_tick(protect)?;
                    Some((tick, segment))
                })
                .min_by_key(|(tick, _)| *tick);

            let Some((_, segment)) = victim else {
                // the new entry alone exceeds the ceiling
                if inserted.lock().evict_lru(None, &self.budget) {
                    evicted += 1;
                }
                break;
            };
            let protect = Arc::ptr_eq(&segment, inserted).then_some(key);
            if segment.lock().evict_lru(protect, &self.budget) {
                evicted += 1;
            }
        }
        evicted
    }

    /// Remove one cached key. Returns the target it resolved to.
    pub fn remove(&self, plugin: &str, key: &str) -> Option<MatchTarget> {
        let segment = self.segment(plugin)?;
        let removed = segment.lock().remove(key, &self.budget);
        if removed.is_some() {
            self.stats.invalidated(1);
            trace!(plugin, key, "removed cached match");
        }
        removed
    }

    /// Remove every key that resolved to `target` in `plugin`'s segment.
    ///
    /// Returns the number of entries removed; `0` if nothing was tracked.
    pub fn invalidate(&self, plugin: &str, target: &TargetKey) -> usize {
        let Some(segment) = self.segment(plugin) else {
            return 0;
        };
        let removed = segment.lock().invalidate(target, &self.budget);
        if removed > 0 {
            self.stats.invalidated(removed);
            debug!(plugin, %target, removed, "invalidated cached matches");
        }
        removed
    }

    /// Remove `plugin`'s whole segment (entries and tracker).
    pub fn drop_segment(&self, plugin: &str) {
        if let Some((_, segment)) = self.segments.remove(plugin) {
            let removed = segment.lock().retire(&self.budget);
            self.stats.invalidated(removed);
            debug!(plugin, removed, "dropped match cache segment");
        }
    }

    /// Remove every segment.
    pub fn clear(&self) {
        let plugins: Vec<String> = self.segments.iter().map(|e| e.key().clone()).collect();
        for plugin in plugins {
            self.drop_segment(&plugin);
        }
    }

    /// Entries cached for `plugin`.
    #[must_use]
    pub fn len(&self, plugin: &str) -> usize {
        self.segment(plugin).map_or(0, |s| s.lock().len())
    }

    /// Entries cached across all plugins.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.segment_arcs().iter().map(|s| s.lock().len()).sum()
    }

    /// Returns `true` if no plugin has cached entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Number of live plugin segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if `plugin` has a live segment.
    #[must_use]
    pub fn has_segment(&self, plugin: &str) -> bool {
        self.segments.contains_key(plugin)
    }

    /// Estimated bytes held across all segments.
    #[must_use]
    pub fn memory_used(&self) -> usize {
        self.budget.used()
    }

    /// Estimated bytes held by `plugin`'s segment.
    #[must_use]
    pub fn segment_memory(&self, plugin: &str) -> usize {
        self.segment(plugin).map_or(0, |s| s.lock().bytes())
    }

    /// Configured aggregate memory ceiling.
    #[must_use]
    pub fn memory_ceiling(&self) -> usize {
        self.budget.ceiling()
    }

    /// Configured per-plugin entry ceiling.
    #[must_use]
    pub fn segment_capacity(&self) -> usize {
        self.segment_capacity.get()
    }

    /// Number of keys tracked for `target` in `plugin`'s segment.
    #[must_use]
    pub fn tracked_keys(&self, plugin: &str, target: &TargetKey) -> usize {
        self.segment(plugin)
            .map_or(0, |s| s.lock().tracker().keys(target).map_or(0, |k| k.len()))
    }

    /// Number of keys tracked across all targets of `plugin`.
    #[must_use]
    pub fn tracked_total(&self, plugin: &str) -> usize {
        self.segment(plugin)
            .map_or(0, |s| s.lock().tracker().tracked_keys())
    }

    /// Live counters.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn segment_arcs(&self) -> Vec<Arc<Mutex<Segment>>> {
        self.segments.iter().map(|e| Arc::clone(e.value())).collect()
    }
}
