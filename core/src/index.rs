//! `ConfigurationIndex` - the authoritative routing configuration
//!
//! Holds every plugin, selector, rule and condition pushed by the control plane,
//! plus the back-references that tie them together:
//!
//! ```text
//! plugins          name        → PluginData
//! selectors        plugin      → [SelectorData]   (sorted by `sort`)
//! rules            selector_id → [RuleData]       (sorted by `sort`)
//! selector_plugin  selector_id → plugin
//! rule_selector    rule_id     → selector_id
//! condition_owner  condition   → selector | rule
//! ```
//!
//! Every selector/rule mutation also purges the [`MatchResultCache`] entries
//! that resolved to the changed object, so the cache never serves a version the
//! index no longer holds.
//!
//! # Concurrency
//!
//! Lists are rebuilt off to the side and published as a fresh `Arc<[_]>` while
//! the owner key's entry lock is held. Readers clone the `Arc` and see either
//! the old list or the new one, never a partial rebuild. Writers to different
//! owner keys only meet on a `DashMap` shard.
//!
//! Lock order is `selectors` before `selector_plugin`, `rules` before
//! `rule_selector`. No path holds two entries of the same map at once.

use crate::data::Routable;
use crate::{
    CacheConfig, ConditionData, MatchResultCache, MatchTarget, PluginData, RuleData, SelectorData,
    TargetKey,
};
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A plugin's selectors, ascending by `sort`.
pub type SelectorList = Arc<[Arc<SelectorData>]>;

/// A selector's rules, ascending by `sort`.
pub type RuleList = Arc<[Arc<RuleData>]>;

fn empty<T>() -> Arc<[T]> {
    Arc::from(Vec::new())
}

/// Replace `item` by id (or append it), then stable-sort by `sort`.
///
/// Returns the rebuilt list and the version it replaced.
fn replace_sorted<T: Routable>(current: &[Arc<T>], item: Arc<T>) -> (Arc<[Arc<T>]>, Option<Arc<T>>) {
    let mut next = current.to_vec();
    let prior = match next.iter().position(|e| e.id() == item.id()) {
        Some(i) => Some(std::mem::replace(&mut next[i], item)),
        None => {
            next.push(item);
            None
        }
    };
    next.sort_by_key(|e| e.sort());
    (next.into(), prior)
}

/// The list without `id`, and the removed element. `None` if `id` is absent.
fn without<T: Routable>(current: &[Arc<T>], id: &str) -> Option<(Arc<[Arc<T>]>, Arc<T>)> {
    let i = current.iter().position(|e| e.id() == id)?;
    let mut next = current.to_vec();
    let removed = next.remove(i);
    Some((next.into(), removed))
}

/// Entry counts, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Plugins held.
    pub plugins: usize,
    /// Selectors held across all plugins.
    pub selectors: usize,
    /// Rules held across all selectors.
    pub rules: usize,
    /// Conditions with a recorded owner.
    pub conditions: usize,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} plugins, {} selectors, {} rules, {} conditions",
            self.plugins, self.selectors, self.rules, self.conditions
        )
    }
}

/// Multi-index store of routing configuration with cascade cache invalidation.
///
/// # Example
///
/// ```
/// use waypoint::{ConfigurationIndex, PluginData, SelectorData};
///
/// let index = ConfigurationIndex::default();
/// index.upsert_plugin(PluginData::new("rate-limiter"));
/// index.upsert_selector(SelectorData::new("s2", "rate-limiter", 2));
/// index.upsert_selector(SelectorData::new("s1", "rate-limiter", 1));
///
/// let ids: Vec<_> = index
///     .lookup_selectors("rate-limiter")
///     .iter()
///     .map(|s| s.id.clone())
///     .collect();
/// assert_eq!(ids, ["s1", "s2"]);
/// assert_eq!(index.lookup_selector_plugin("s2").as_deref(), Some("rate-limiter"));
/// ```
#[derive(Debug, Default)]
pub struct ConfigurationIndex {
    plugins: DashMap<String, Arc<PluginData>>,
    selectors: DashMap<String, SelectorList>,
    rules: DashMap<String, RuleList>,
    selector_plugin: DashMap<String, String>,
    rule_selector: DashMap<String, String>,
    condition_owner: DashMap<String, MatchTarget>,
    cache: MatchResultCache,
}

impl ConfigurationIndex {
    /// An empty index owning `cache`.
    #[must_use]
    pub fn new(cache: MatchResultCache) -> Self {
        Self {
            plugins: DashMap::new(),
            selectors: DashMap::new(),
            rules: DashMap::new(),
            selector_plugin: DashMap::new(),
            rule_selector: DashMap::new(),
            condition_owner: DashMap::new(),
            cache,
        }
    }

    /// An empty index with a fresh cache bounded by `config`.
    #[must_use]
    pub fn with_cache_config(config: CacheConfig) -> Self {
        Self::new(MatchResultCache::new(config))
    }

    /// The match cache this index invalidates.
    #[must_use]
    pub fn cache(&self) -> &MatchResultCache {
        &self.cache
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Plugins
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert or replace a plugin by name. Returns the replaced version.
    pub fn upsert_plugin(&self, plugin: PluginData) -> Option<Arc<PluginData>> {
        debug!(plugin = %plugin.name, enabled = plugin.enabled, "upsert plugin");
        self.plugins.insert(plugin.name.clone(), Arc::new(plugin))
    }

    /// Remove a plugin by the name in `plugin`. Selectors are untouched.
    pub fn remove_plugin(&self, plugin: &PluginData) -> Option<Arc<PluginData>> {
        self.remove_plugin_by_name(&plugin.name)
    }

    /// Remove a plugin by name. Selectors are untouched.
    pub fn remove_plugin_by_name(&self, name: &str) -> Option<Arc<PluginData>> {
        let removed = self.plugins.remove(name).map(|(_, p)| p);
        debug!(plugin = name, found = removed.is_some(), "remove plugin");
        removed
    }

    /// Remove several plugins. Returns how many were present.
    pub fn remove_plugins(&self, plugins: &[PluginData]) -> usize {
        plugins
            .iter()
            .filter(|p| self.remove_plugin(p).is_some())
            .count()
    }

    /// Remove every plugin.
    pub fn clear_plugins(&self) {
        debug!(count = self.plugins.len(), "clear plugins");
        self.plugins.clear();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Selectors
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert or replace a selector in its plugin's sorted list.
    ///
    /// Conditions the prior version owned and this one dropped lose their
    /// owner entry. A selector that changed plugin leaves the old plugin's
    /// list. Cached matches of the prior version are purged in both plugins.
    pub fn upsert_selector(&self, selector: SelectorData) {
        let selector = Arc::new(selector);
        let plugin = selector.plugin_name.clone();
        let key = TargetKey::Selector(selector.id.clone());

        let mut prior = None;
        if let Some(old_plugin) = self
            .lookup_selector_plugin(&selector.id)
            .filter(|p| *p != plugin)
        {
            prior = self.detach_selector(&old_plugin, &selector.id);
            self.cache.invalidate(&old_plugin, &key);
            debug!(selector = %selector.id, from = %old_plugin, to = %plugin, "selector changed plugin");
        }

        {
            let mut slot = self.selectors.entry(plugin.clone()).or_insert_with(empty);
            let (next, replaced) = replace_sorted(&slot, Arc::clone(&selector));
            for s in next.iter() {
                self.selector_plugin.insert(s.id.clone(), plugin.clone());
            }
            *slot = next;
            prior = prior.or(replaced);
        }

        self.reindex_conditions(
            prior.as_deref().map(|p| p.conditions.as_slice()),
            &SelectorData::target(&selector),
        );
        let purged = self.cache.invalidate(&plugin, &key);
        debug!(selector = %selector.id, plugin = %plugin, sort = selector.sort, purged, "upsert selector");
    }

    /// Remove a selector and every back-reference to it.
    ///
    /// Both the payload's and the stored version's conditions lose their owner
    /// entry. Returns `true` if the selector was present.
    pub fn remove_selector(&self, selector: &SelectorData) -> bool {
        let plugin = self
            .lookup_selector_plugin(&selector.id)
            .unwrap_or_else(|| selector.plugin_name.clone());
        let key = TargetKey::Selector(selector.id.clone());

        let stored = self.detach_selector(&plugin, &selector.id);
        self.selector_plugin.remove(&selector.id);
        self.unindex_conditions(&selector.conditions, &key);
        if let Some(stored) = &stored {
            self.unindex_conditions(&stored.conditions, &key);
        }
        let purged = self.cache.invalidate(&plugin, &key);
        debug!(selector = %selector.id, plugin = %plugin, found = stored.is_some(), purged, "remove selector");
        stored.is_some()
    }

    /// Remove several selectors. Returns how many were present.
    pub fn remove_selectors(&self, selectors: &[SelectorData]) -> usize {
        selectors
            .iter()
            .filter(|s| self.remove_selector(s))
            .count()
    }

    /// Remove all of `plugin`'s selectors and drop its whole cache segment.
    ///
    /// Returns how many selectors were removed.
    pub fn remove_selectors_by_plugin(&self, plugin: &str) -> usize {
        let removed = self.selectors.remove(plugin).map(|(_, list)| list);
        let count = removed.as_ref().map_or(0, |l| l.len());
        for s in removed.iter().flat_map(|l| l.iter()) {
            self.selector_plugin.remove_if(&s.id, |_, p| p == plugin);
            self.unindex_conditions(&s.conditions, &TargetKey::Selector(s.id.clone()));
        }
        self.cache.drop_segment(plugin);
        debug!(plugin, count, "remove selectors by plugin");
        count
    }

    /// Remove every selector, every selector-owned condition entry, and every
    /// cache segment. Rule-owned condition entries stay.
    pub fn clear_selectors(&self) {
        debug!(plugins = self.selectors.len(), "clear selectors");
        self.selectors.clear();
        self.selector_plugin.clear();
        self.condition_owner.retain(|_, owner| !owner.is_selector());
        self.cache.clear();
    }

    fn detach_selector(&self, plugin: &str, id: &str) -> Option<Arc<SelectorData>> {
        let removed = {
            let mut slot = self.selectors.get_mut(plugin)?;
            let (next, removed) = without(&slot, id)?;
            *slot = next;
            removed
        };
        self.selectors.remove_if(plugin, |_, list| list.is_empty());
        Some(removed)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Rules
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert or replace a rule in its selector's sorted list.
    ///
    /// Mirrors [`upsert_selector`](Self::upsert_selector). The cache purge
    /// resolves the owning plugin through the selector; if the selector is not
    /// indexed there is nothing cached to purge.
    pub fn upsert_rule(&self, rule: RuleData) {
        let rule = Arc::new(rule);
        let selector_id = rule.selector_id.clone();

        let mut prior = None;
        if let Some(old_selector) = self
            .rule_selector
            .get(&rule.id)
            .map(|s| s.value().clone())
            .filter(|s| *s != selector_id)
        {
            prior = self.detach_rule(&old_selector, &rule.id);
            self.purge_rule(&old_selector, &rule.id);
            debug!(rule = %rule.id, from = %old_selector, to = %selector_id, "rule changed selector");
        }

        {
            let mut slot = self.rules.entry(selector_id.clone()).or_insert_with(empty);
            let (next, replaced) = replace_sorted(&slot, Arc::clone(&rule));
            for r in next.iter() {
                self.rule_selector.insert(r.id.clone(), selector_id.clone());
            }
            *slot = next;
            prior = prior.or(replaced);
        }

        self.reindex_conditions(
            prior.as_deref().map(|p| p.conditions.as_slice()),
            &RuleData::target(&rule),
        );
        let purged = self.purge_rule(&selector_id, &rule.id);
        debug!(rule = %rule.id, selector = %selector_id, sort = rule.sort, purged, "upsert rule");
    }

    /// Remove a rule and every back-reference to it. Returns `true` if present.
    pub fn remove_rule(&self, rule: &RuleData) -> bool {
        let selector_id = self
            .rule_selector
            .get(&rule.id)
            .map(|s| s.value().clone())
            .unwrap_or_else(|| rule.selector_id.clone());
        let key = TargetKey::Rule(rule.id.clone());

        let stored = self.detach_rule(&selector_id, &rule.id);
        self.rule_selector.remove(&rule.id);
        self.unindex_conditions(&rule.conditions, &key);
        if let Some(stored) = &stored {
            self.unindex_conditions(&stored.conditions, &key);
        }
        let purged = self.purge_rule(&selector_id, &rule.id);
        debug!(rule = %rule.id, selector = %selector_id, found = stored.is_some(), purged, "remove rule");
        stored.is_some()
    }

    /// Remove several rules. Returns how many were present.
    pub fn remove_rules(&self, rules: &[RuleData]) -> usize {
        rules.iter().filter(|r| self.remove_rule(r)).count()
    }

    /// Remove all of a selector's rules, and drop the owning plugin's cache
    /// segment if the selector is still indexed.
    ///
    /// Returns how many rules were removed.
    pub fn remove_rules_by_selector(&self, selector_id: &str) -> usize {
        let removed = self.rules.remove(selector_id).map(|(_, list)| list);
        let count = removed.as_ref().map_or(0, |l| l.len());
        for r in removed.iter().flat_map(|l| l.iter()) {
            self.rule_selector.remove_if(&r.id, |_, s| s == selector_id);
            self.unindex_conditions(&r.conditions, &TargetKey::Rule(r.id.clone()));
        }
        if let Some(plugin) = self.lookup_selector_plugin(selector_id) {
            self.cache.drop_segment(&plugin);
        }
        debug!(selector = selector_id, count, "remove rules by selector");
        count
    }

    /// Remove every rule, every rule-owned condition entry, and every cache
    /// segment. Selector-owned condition entries stay.
    pub fn clear_rules(&self) {
        debug!(selectors = self.rules.len(), "clear rules");
        self.rules.clear();
        self.rule_selector.clear();
        self.condition_owner.retain(|_, owner| !owner.is_rule());
        self.cache.clear();
    }

    fn detach_rule(&self, selector_id: &str, id: &str) -> Option<Arc<RuleData>> {
        let removed = {
            let mut slot = self.rules.get_mut(selector_id)?;
            let (next, removed) = without(&slot, id)?;
            *slot = next;
            removed
        };
        self.rules.remove_if(selector_id, |_, list| list.is_empty());
        Some(removed)
    }

    fn purge_rule(&self, selector_id: &str, rule_id: &str) -> usize {
        self.lookup_selector_plugin(selector_id).map_or(0, |plugin| {
            self.cache
                .invalidate(&plugin, &TargetKey::Rule(rule_id.to_string()))
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Conditions
    // ═══════════════════════════════════════════════════════════════════════

    fn reindex_conditions(&self, prior: Option<&[ConditionData]>, owner: &MatchTarget) {
        if let Some(prior) = prior {
            let kept: HashSet<&str> = owner.conditions().iter().map(|c| c.id.as_str()).collect();
            let key = owner.key();
            let dropped: Vec<&ConditionData> =
                prior.iter().filter(|c| !kept.contains(c.id.as_str())).collect();
            for condition in dropped {
                self.condition_owner
                    .remove_if(&condition.id, |_, o| o.key() == key);
            }
        }
        for condition in owner.conditions() {
            self.condition_owner
                .insert(condition.id.clone(), owner.clone());
        }
    }

    fn unindex_conditions(&self, conditions: &[ConditionData], owner: &TargetKey) {
        for condition in conditions {
            self.condition_owner
                .remove_if(&condition.id, |_, o| o.key() == *owner);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════

    /// A plugin by name.
    #[must_use]
    pub fn lookup_plugin(&self, name: &str) -> Option<Arc<PluginData>> {
        self.plugins.get(name).map(|p| Arc::clone(p.value()))
    }

    /// A plugin's selectors in `sort` order; empty for an unknown plugin.
    #[must_use]
    pub fn lookup_selectors(&self, plugin: &str) -> SelectorList {
        self.selectors
            .get(plugin)
            .map_or_else(empty, |l| Arc::clone(l.value()))
    }

    /// A selector's rules in `sort` order; empty for an unknown selector.
    #[must_use]
    pub fn lookup_rules(&self, selector_id: &str) -> RuleList {
        self.rules
            .get(selector_id)
            .map_or_else(empty, |l| Arc::clone(l.value()))
    }

    /// The selector or rule owning a condition.
    #[must_use]
    pub fn lookup_condition_owner(&self, condition_id: &str) -> Option<MatchTarget> {
        self.condition_owner
            .get(condition_id)
            .map(|o| o.value().clone())
    }

    /// The plugin owning a selector.
    #[must_use]
    pub fn lookup_selector_plugin(&self, selector_id: &str) -> Option<String> {
        self.selector_plugin
            .get(selector_id)
            .map(|p| p.value().clone())
    }

    /// The selector owning a rule.
    #[must_use]
    pub fn lookup_rule_selector(&self, rule_id: &str) -> Option<String> {
        self.rule_selector.get(rule_id).map(|s| s.value().clone())
    }

    /// Every plugin, ordered by name.
    #[must_use]
    pub fn plugins(&self) -> Vec<Arc<PluginData>> {
        let mut plugins: Vec<_> = self.plugins.iter().map(|p| Arc::clone(p.value())).collect();
        plugins.sort_by(|a, b| a.name.cmp(&b.name));
        plugins
    }

    /// Entry counts.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            plugins: self.plugins.len(),
            selectors: self.selectors.iter().map(|l| l.len()).sum(),
            rules: self.rules.iter().map(|l| l.len()).sum(),
            conditions: self.condition_owner.len(),
        }
    }

    /// Drop all configuration and every cache segment.
    pub fn clear(&self) {
        self.clear_rules();
        self.clear_selectors();
        self.clear_plugins();
        self.condition_owner.clear();
    }
}
