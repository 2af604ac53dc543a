//! `DataPlane` - the service object a gateway worker pool shares.

use crate::{
    ConfigEvent, ConfigSnapshot, ConfigurationIndex, DataPlaneConfig, JudgeRegistry,
    MatchEngine, MatchResultCache, RequestContext, RouteDecision, RuleData, SelectorData,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration index, match cache and engine behind one handle.
///
/// `DataPlane` is `Send + Sync`; share it across workers by reference or
/// `Arc`. Configuration events and request lookups may run concurrently.
///
/// # Example
///
/// ```
/// use waypoint::{ConfigEvent, DataPlane, DataPlaneConfig, PluginData, SelectorData};
/// use waypoint::RequestContext;
/// use std::borrow::Cow;
///
/// struct Anything;
/// impl RequestContext for Anything {
///     fn real_data(&self, _: waypoint::ParamType, _: &str) -> Option<Cow<'_, str>> {
///         None
///     }
/// }
///
/// let plane = DataPlane::new(DataPlaneConfig::default());
/// plane.apply(ConfigEvent::UpsertPlugin(PluginData::new("auth")));
/// plane.apply(ConfigEvent::UpsertSelector(SelectorData::new("catch-all", "auth", 0)));
///
/// let decision = plane.route("auth", &Anything).unwrap();
/// assert_eq!(decision.selector.id, "catch-all");
/// assert!(decision.rule.is_none());
/// ```
#[derive(Debug)]
pub struct DataPlane {
    config: DataPlaneConfig,
    index: Arc<ConfigurationIndex>,
    engine: MatchEngine,
}

impl Default for DataPlane {
    fn default() -> Self {
        Self::new(DataPlaneConfig::default())
    }
}

impl DataPlane {
    /// An empty data plane with the default judges.
    #[must_use]
    pub fn new(config: DataPlaneConfig) -> Self {
        Self::with_judges(config, JudgeRegistry::with_defaults())
    }

    /// An empty data plane with a custom judge registry.
    #[must_use]
    pub fn with_judges(config: DataPlaneConfig, judges: JudgeRegistry) -> Self {
        let index = Arc::new(ConfigurationIndex::new(MatchResultCache::new(config.cache)));
        let engine = MatchEngine::with_judges(Arc::clone(&index), judges);
        info!(
            memory_ceiling_bytes = config.cache.memory_ceiling_bytes,
            segment_capacity = config.cache.segment_capacity,
            "data plane started"
        );
        Self {
            config,
            index,
            engine,
        }
    }

    /// A data plane built from `snapshot.config` and loaded with its contents.
    #[must_use]
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Self {
        let plane = Self::new(snapshot.config);
        plane.apply_snapshot(snapshot);
        plane
    }

    /// The configuration this data plane was built with.
    #[must_use]
    pub fn config(&self) -> &DataPlaneConfig {
        &self.config
    }

    /// The configuration index.
    #[must_use]
    pub fn index(&self) -> &ConfigurationIndex {
        &self.index
    }

    /// The match cache.
    #[must_use]
    pub fn cache(&self) -> &MatchResultCache {
        self.index.cache()
    }

    /// The request-time engine.
    #[must_use]
    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    /// Apply one configuration event.
    pub fn apply(&self, event: ConfigEvent) {
        debug!(%event, "apply config event");
        let index = &self.index;
        match event {
            ConfigEvent::UpsertPlugin(p) => {
                index.upsert_plugin(p);
            }
            ConfigEvent::RemovePlugin(p) => {
                index.remove_plugin(&p);
            }
            ConfigEvent::RemovePlugins(ps) => {
                index.remove_plugins(&ps);
            }
            ConfigEvent::ClearPlugins => index.clear_plugins(),
            ConfigEvent::UpsertSelector(s) => index.upsert_selector(s),
            ConfigEvent::RemoveSelector(s) => {
                index.remove_selector(&s);
            }
            ConfigEvent::RemoveSelectors(ss) => {
                index.remove_selectors(&ss);
            }
            ConfigEvent::RemoveSelectorsByPlugin(plugin) => {
                index.remove_selectors_by_plugin(&plugin);
            }
            ConfigEvent::ClearSelectors => index.clear_selectors(),
            ConfigEvent::UpsertRule(r) => index.upsert_rule(r),
            ConfigEvent::RemoveRule(r) => {
                index.remove_rule(&r);
            }
            ConfigEvent::RemoveRules(rs) => {
                index.remove_rules(&rs);
            }
            ConfigEvent::RemoveRulesBySelector(selector_id) => {
                index.remove_rules_by_selector(&selector_id);
            }
            ConfigEvent::ClearRules => index.clear_rules(),
        }
    }

    /// Upsert every plugin, selector and rule of `snapshot`.
    ///
    /// Entries already present and absent from the snapshot are kept.
    pub fn apply_snapshot(&self, snapshot: &ConfigSnapshot) {
        for event in snapshot.events() {
            self.apply(event);
        }
        info!(stats = %self.index.stats(), "snapshot applied");
    }

    /// First matching selector of `plugin`.
    pub fn match_selector(
        &self,
        plugin: &str,
        ctx: &dyn RequestContext,
    ) -> Option<Arc<SelectorData>> {
        self.engine.match_selector(plugin, ctx)
    }

    /// First matching rule under `selector_id`.
    pub fn match_rule(
        &self,
        plugin: &str,
        selector_id: &str,
        ctx: &dyn RequestContext,
    ) -> Option<Arc<RuleData>> {
        self.engine.match_rule(plugin, selector_id, ctx)
    }

    /// Selector, then rule.
    pub fn route(&self, plugin: &str, ctx: &dyn RequestContext) -> Option<RouteDecision> {
        self.engine.route(plugin, ctx)
    }

    /// Drop all configuration and every cached match.
    pub fn shutdown(self) {
        let stats = self.index.stats();
        let cache = self.index.cache().stats().snapshot();
        self.index.clear();
        info!(%stats, hits = cache.hits, misses = cache.misses, "data plane shut down");
    }
}
