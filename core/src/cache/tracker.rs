//! Reverse index from a match target to the cache keys that resolved to it.

use crate::TargetKey;
use std::collections::{HashMap, HashSet};

/// Per-plugin reverse map: target id → cache keys.
///
/// Keyed by [`TargetKey`] (stable id), so an updated selector or rule finds
/// the keys its previous version produced.
#[derive(Debug, Default)]
pub struct InvalidationTracker {
    keys_by_target: HashMap<TargetKey, HashSet<String>>,
}

impl InvalidationTracker {
    /// An empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` resolved to `target`.
    pub fn record(&mut self, target: TargetKey, key: String) {
        self.keys_by_target.entry(target).or_default().insert(key);
    }

    /// Forget one `key` of `target`, dropping the target once it has none left.
    pub fn forget(&mut self, target: &TargetKey, key: &str) {
        if let Some(keys) = self.keys_by_target.get_mut(target) {
            keys.remove(key);
            if keys.is_empty() {
                self.keys_by_target.remove(target);
            }
        }
    }

    /// Remove and return every key recorded for `target`.
    pub fn take(&mut self, target: &TargetKey) -> Option<HashSet<String>> {
        self.keys_by_target.remove(target)
    }

    /// Keys currently recorded for `target`.
    #[must_use]
    pub fn keys(&self, target: &TargetKey) -> Option<&HashSet<String>> {
        self.keys_by_target.get(target)
    }

    /// Returns `true` if `target` has recorded keys.
    #[must_use]
    pub fn contains(&self, target: &TargetKey) -> bool {
        self.keys_by_target.contains_key(target)
    }

    /// Number of tracked targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys_by_target.len()
    }

    /// Returns `true` if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys_by_target.is_empty()
    }

    /// Total number of tracked keys across all targets.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.keys_by_target.values().map(HashSet::len).sum()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.keys_by_target.clear();
    }
}
