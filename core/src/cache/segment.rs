//! One plugin's slice of the match cache: LRU entries plus their reverse index.
//!
//! The entries and the tracker live under the same lock, so a key is present in
//! the LRU exactly when it is recorded in the tracker.

use super::tracker::InvalidationTracker;
use crate::{MatchTarget, TargetKey};
use lru::LruCache;
use std::mem::size_of;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed per-entry bookkeeping on top of the key bytes.
///
/// Covers the key `String` header twice (LRU + tracker), the cached target,
/// and hash-table / list node overhead.
const ENTRY_OVERHEAD: usize = 2 * size_of::<String>() + size_of::<MatchTarget>() + 48;

/// Estimated bytes one cache entry costs.
///
/// The target itself is an `Arc` shared with the configuration index, so only
/// the key is charged by length (stored in both the LRU and the tracker).
pub(crate) fn entry_weight(key: &str) -> usize {
    2 * key.len() + ENTRY_OVERHEAD
}

/// Aggregate memory accounting shared by every segment.
#[derive(Debug)]
pub(crate) struct MemoryBudget {
    ceiling: usize,
    used: AtomicUsize,
}

impl MemoryBudget {
    pub(crate) fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            used: AtomicUsize::new(0),
        }
    }

    pub(crate) fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    pub(crate) fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub(crate) fn over(&self) -> bool {
        self.used() > self.ceiling
    }

    fn charge(&self, bytes: usize) {
        self.used.fetch_add(bytes, Ordering::Relaxed);
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::Relaxed);
    }
}

/// A cached target stamped with the cache-wide clock at its last access.
#[derive(Debug)]
struct Entry {
    target: MatchTarget,
    tick: u64,
}

/// A bounded LRU of `key → target` with its invalidation tracker.
///
/// Within a segment, LRU order and tick order agree: every access restamps the
/// entry and moves it to the front. Comparing segments' oldest ticks therefore
/// yields the least-recently-used entry of the whole cache.
#[derive(Debug)]
pub(crate) struct Segment {
    entries: LruCache<String, Entry>,
    tracker: InvalidationTracker,
    bytes: usize,
    retired: bool,
}

impl Segment {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            tracker: InvalidationTracker::new(),
            bytes: 0,
            retired: false,
        }
    }

    /// Lookup with LRU touch.
    pub(crate) fn get(&mut self, key: &str, tick: u64) -> Option<MatchTarget> {
        self.entries.get_mut(key).map(|entry| {
            entry.tick = tick;
            entry.target.clone()
        })
    }

    /// Lookup without LRU touch.
    pub(crate) fn peek(&self, key: &str) -> Option<&MatchTarget> {
        self.entries.peek(key).map(|entry| &entry.target)
    }

    /// Insert or overwrite. Only the entry ceiling is enforced here; memory
    /// pressure is resolved across segments by the caller.
    ///
    /// Returns the number of entries evicted, or `None` if the segment was
    /// retired by a concurrent drop and the write was discarded.
    pub(crate) fn put(
        &mut self,
        key: String,
        target: MatchTarget,
        tick: u64,
        budget: &MemoryBudget,
    ) -> Option<usize> {
        if self.retired {
            return None;
        }

        let target_key = target.key();
        if let Some(previous) = self.entries.peek(&key) {
            let previous_key = previous.target.key();
            if previous_key != target_key {
                self.tracker.forget(&previous_key, &key);
            }
        }

        let mut evicted = 0;
        let weight = entry_weight(&key);
        match self.entries.push(key.clone(), Entry { target, tick }) {
            // same key overwritten: weight unchanged
            Some((old_key, _)) if old_key == key => {}
            Some((old_key, old)) => {
                self.tracker.forget(&old.target.key(), &old_key);
                self.debit(&old_key, budget);
                self.credit(weight, budget);
                evicted += 1;
            }
            None => self.credit(weight, budget),
        }
        self.tracker.record(target_key, key);
        Some(evicted)
    }

    /// Tick of the least-recently-used entry other than `protect`.
    pub(crate) fn oldest_tick(&self, protect: Option<&str>) -> Option<u64> {
        self.entries
            .iter()
            .rev()
            .find(|(key, _)| Some(key.as_str()) != protect)
            .map(|(_, entry)| entry.tick)
    }

    /// Evict the least-recently-used entry other than `protect`.
    ///
    /// Returns `true` if an entry was evicted.
    pub(crate) fn evict_lru(&mut self, protect: Option<&str>, budget: &MemoryBudget) -> bool {
        let Some(key) = self
            .entries
            .iter()
            .rev()
            .map(|(key, _)| key)
            .find(|key| Some(key.as_str()) != protect)
            .cloned()
        else {
            return false;
        };
        self.remove(&key, budget).is_some()
    }

    /// Remove one key, releasing its memory and its reverse entry.
    pub(crate) fn remove(&mut self, key: &str, budget: &MemoryBudget) -> Option<MatchTarget> {
        let entry = self.entries.pop(key)?;
        self.tracker.forget(&entry.target.key(), key);
        self.debit(key, budget);
        Some(entry.target)
    }

    /// Remove every key recorded for `target`. Returns how many entries were removed.
    pub(crate) fn invalidate(&mut self, target: &TargetKey, budget: &MemoryBudget) -> usize {
        let Some(keys) = self.tracker.take(target) else {
            return 0;
        };
        let mut removed = 0;
        for key in keys {
            if self.entries.pop(&key).is_some() {
                self.debit(&key, budget);
                removed += 1;
            }
        }
        removed
    }

    /// Drop every entry, release its memory, and refuse further writes.
    pub(crate) fn retire(&mut self, budget: &MemoryBudget) -> usize {
        let removed = self.entries.len();
        budget.release(self.bytes);
        self.bytes = 0;
        self.entries.clear();
        self.tracker.clear();
        self.retired = true;
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn bytes(&self) -> usize {
        self.bytes
    }

    pub(crate) fn tracker(&self) -> &InvalidationTracker {
        &self.tracker
    }

    fn credit(&mut self, weight: usize, budget: &MemoryBudget) {
        self.bytes += weight;
        budget.charge(weight);
    }

    fn debit(&mut self, key: &str, budget: &MemoryBudget) {
        let weight = entry_weight(key);
        self.bytes -= weight;
        budget.release(weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RuleData, SelectorData};
    use std::sync::Arc;

    fn selector(id: &str) -> MatchTarget {
        MatchTarget::Selector(Arc::new(SelectorData::new(id, "p", 0)))
    }

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn capacity_eviction_updates_tracker_and_budget() {
        let budget = MemoryBudget::new(usize::MAX);
        let mut seg = Segment::new(cap(2));
        assert_eq!(seg.put("k1".into(), selector("s1"), 1, &budget), Some(0));
        assert_eq!(seg.put("k2".into(), selector("s2"), 2, &budget), Some(0));
        assert_eq!(seg.put("k3".into(), selector("s3"), 3, &budget), Some(1));

        assert!(seg.peek("k1").is_none());
        assert!(!seg.tracker().contains(&TargetKey::Selector("s1".into())));
        assert_eq!(budget.used(), seg.bytes());
        assert_eq!(seg.bytes(), entry_weight("k2") + entry_weight("k3"));
    }

    #[test]
    fn overwrite_moves_reverse_entry() {
        let budget = MemoryBudget::new(usize::MAX);
        let mut seg = Segment::new(cap(4));
        seg.put("k".into(), selector("s1"), 1, &budget);
        seg.put("k".into(), selector("s2"), 2, &budget);

        assert!(!seg.tracker().contains(&TargetKey::Selector("s1".into())));
        assert!(seg.tracker().contains(&TargetKey::Selector("s2".into())));
        assert_eq!(seg.len(), 1);
        assert_eq!(budget.used(), entry_weight("k"));
    }

    #[test]
    fn memory_is_not_enforced_on_put() {
        let budget = MemoryBudget::new(entry_weight("k1"));
        let mut seg = Segment::new(cap(100));
        seg.put("k1".into(), selector("s1"), 1, &budget);
        assert_eq!(seg.put("k2".into(), selector("s2"), 2, &budget), Some(0));
        assert_eq!(seg.len(), 2);
        assert!(budget.over());
    }

    #[test]
    fn touch_restamps_and_reorders() {
        let budget = MemoryBudget::new(usize::MAX);
        let mut seg = Segment::new(cap(8));
        seg.put("k1".into(), selector("s1"), 1, &budget);
        seg.put("k2".into(), selector("s2"), 2, &budget);
        assert_eq!(seg.oldest_tick(None), Some(1));

        seg.get("k1", 3);
        assert_eq!(seg.oldest_tick(None), Some(2));
        assert!(seg.evict_lru(None, &budget));
        assert!(seg.peek("k2").is_none());
        assert!(seg.peek("k1").is_some());
    }

    #[test]
    fn evict_lru_skips_protected_key() {
        let budget = MemoryBudget::new(usize::MAX);
        let mut seg = Segment::new(cap(8));
        seg.put("new".into(), selector("s1"), 1, &budget);
        assert_eq!(seg.oldest_tick(Some("new")), None);
        assert!(!seg.evict_lru(Some("new"), &budget));
        assert_eq!(seg.len(), 1);

        seg.put("other".into(), selector("s2"), 2, &budget);
        seg.get("new", 3);
        assert!(seg.evict_lru(Some("new"), &budget));
        assert!(seg.peek("new").is_some());
        assert!(!seg.tracker().contains(&TargetKey::Selector("s2".into())));
        assert_eq!(budget.used(), entry_weight("new"));
    }

    #[test]
    fn invalidate_removes_only_target_keys() {
        let budget = MemoryBudget::new(usize::MAX);
        let mut seg = Segment::new(cap(8));
        let rule = MatchTarget::Rule(Arc::new(RuleData::new("r1", "s1", 0)));
        seg.put("a".into(), rule.clone(), 1, &budget);
        seg.put("b".into(), rule, 2, &budget);
        seg.put("c".into(), selector("s1"), 3, &budget);

        assert_eq!(seg.invalidate(&TargetKey::Rule("r1".into()), &budget), 2);
        assert_eq!(seg.len(), 1);
        assert_eq!(seg.invalidate(&TargetKey::Rule("r1".into()), &budget), 0);
        assert_eq!(budget.used(), entry_weight("c"));
    }

    #[test]
    fn retired_segment_rejects_writes() {
        let budget = MemoryBudget::new(usize::MAX);
        let mut seg = Segment::new(cap(8));
        seg.put("a".into(), selector("s1"), 1, &budget);
        assert_eq!(seg.retire(&budget), 1);
        assert_eq!(budget.used(), 0);
        assert_eq!(seg.put("b".into(), selector("s1"), 2, &budget), None);
        assert_eq!(seg.len(), 0);
        assert_eq!(budget.used(), 0);
    }
}
