//! `MatchEngine` - request-time selector and rule resolution
//!
//! For a plugin, walk its enabled selectors in `sort` order. For each one:
//!
//! 1. derive the cache key from its conditions and the request's real values
//! 2. cache hit on this very selector (the same `Arc` the index holds) → matched;
//!    a hit on any other target, including an older version of this one, is a miss
//! 3. miss → evaluate under the selector's [`MatchMode`](crate::MatchMode);
//!    on `true`, cache the result and stop
//!
//! Only positive matches are cached. Selectors without conditions match under
//! AND (vacuous truth) and are never cached: there is no key to derive.
//!
//! Rules under the matched selector resolve the same way, sharing the plugin's
//! cache segment.

use crate::data::Routable;
use crate::{
    conditions_key, ConfigurationIndex, JudgeRegistry, MatchTrace, RequestContext, RuleData,
    SelectorData,
};
use std::sync::Arc;
use tracing::trace;

/// The outcome of [`MatchEngine::route`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    /// The first matching selector.
    pub selector: Arc<SelectorData>,
    /// The first matching rule under it, if any.
    pub rule: Option<Arc<RuleData>>,
}

/// Resolves selectors and rules against a [`ConfigurationIndex`], memoizing
/// positive matches in the index's cache.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::borrow::Cow;
/// use waypoint::prelude::*;
///
/// struct Env(&'static str);
/// impl RequestContext for Env {
///     fn real_data(&self, param_type: ParamType, name: &str) -> Option<Cow<'_, str>> {
///         (param_type == ParamType::Header && name == "x-env").then(|| Cow::Borrowed(self.0))
///     }
/// }
///
/// let index = Arc::new(ConfigurationIndex::default());
/// index.upsert_plugin(PluginData::new("rate-limiter"));
/// index.upsert_selector(
///     SelectorData::new("s1", "rate-limiter", 1).with_condition(ConditionData::new(
///         "c1", ParamType::Header, Operator::Equals, "x-env", "prod",
///     )),
/// );
///
/// let engine = MatchEngine::new(Arc::clone(&index));
/// let hit = engine.match_selector("rate-limiter", &Env("prod")).unwrap();
/// assert_eq!(hit.id, "s1");
/// assert!(index.cache().contains("rate-limiter", "c1_prod"));
/// assert!(engine.match_selector("rate-limiter", &Env("dev")).is_none());
/// ```
#[derive(Debug)]
pub struct MatchEngine {
    index: Arc<ConfigurationIndex>,
    judges: JudgeRegistry,
}

impl MatchEngine {
    /// An engine over `index` with the default judges.
    #[must_use]
    pub fn new(index: Arc<ConfigurationIndex>) -> Self {
        Self::with_judges(index, JudgeRegistry::with_defaults())
    }

    /// An engine over `index` with a custom judge registry.
    #[must_use]
    pub fn with_judges(index: Arc<ConfigurationIndex>, judges: JudgeRegistry) -> Self {
        Self { index, judges }
    }

    /// The index this engine reads.
    #[must_use]
    pub fn index(&self) -> &Arc<ConfigurationIndex> {
        &self.index
    }

    /// The judges conditions are evaluated with.
    #[must_use]
    pub fn judges(&self) -> &JudgeRegistry {
        &self.judges
    }

    /// First enabled selector of `plugin` matching `ctx`.
    ///
    /// `None` if the plugin is unknown or disabled, or nothing matches.
    pub fn match_selector(
        &self,
        plugin: &str,
        ctx: &dyn RequestContext,
    ) -> Option<Arc<SelectorData>> {
        if !self.plugin_enabled(plugin) {
            return None;
        }
        let selectors = self.index.lookup_selectors(plugin);
        self.first_match(plugin, &selectors, ctx)
    }

    /// First enabled rule under `selector_id` matching `ctx`.
    ///
    /// Cached in `plugin`'s segment, next to the selector matches.
    pub fn match_rule(
        &self,
        plugin: &str,
        selector_id: &str,
        ctx: &dyn RequestContext,
    ) -> Option<Arc<RuleData>> {
        let rules = self.index.lookup_rules(selector_id);
        self.first_match(plugin, &rules, ctx)
    }

    /// Resolve the selector, then the rule under it.
    pub fn route(&self, plugin: &str, ctx: &dyn RequestContext) -> Option<RouteDecision> {
        let selector = self.match_selector(plugin, ctx)?;
        let rule = self.match_rule(plugin, &selector.id, ctx);
        Some(RouteDecision { selector, rule })
    }

    /// Evaluate every selector of `plugin` with full traces.
    ///
    /// Ignores the cache and the enabled flags; for debugging only.
    pub fn trace_selectors(
        &self,
        plugin: &str,
        ctx: &dyn RequestContext,
    ) -> Vec<(Arc<SelectorData>, MatchTrace)> {
        self.index
            .lookup_selectors(plugin)
            .iter()
            .map(|s| (Arc::clone(s), self.trace_one(s.as_ref(), ctx)))
            .collect()
    }

    /// Evaluate every rule of `selector_id` with full traces.
    pub fn trace_rules(
        &self,
        selector_id: &str,
        ctx: &dyn RequestContext,
    ) -> Vec<(Arc<RuleData>, MatchTrace)> {
        self.index
            .lookup_rules(selector_id)
            .iter()
            .map(|r| (Arc::clone(r), self.trace_one(r.as_ref(), ctx)))
            .collect()
    }

    fn trace_one<T: Routable>(&self, item: &T, ctx: &dyn RequestContext) -> MatchTrace {
        item.match_mode()
            .strategy()
            .evaluate_with_trace(item.conditions(), ctx, &self.judges)
    }

    fn plugin_enabled(&self, plugin: &str) -> bool {
        match self.index.lookup_plugin(plugin) {
            Some(p) if p.enabled => true,
            Some(_) => {
                trace!(plugin, "plugin disabled");
                false
            }
            None => {
                trace!(plugin, "plugin unknown");
                false
            }
        }
    }

    fn first_match<T: Routable>(
        &self,
        plugin: &str,
        items: &[Arc<T>],
        ctx: &dyn RequestContext,
    ) -> Option<Arc<T>> {
        let cache = self.index.cache();
        for item in items.iter().filter(|i| i.enabled()) {
            let strategy = item.match_mode().strategy();
            let Some(key) = conditions_key(item.conditions(), ctx) else {
                if strategy.evaluate(&[], ctx, &self.judges) {
                    trace!(plugin, id = item.id(), "matched without conditions");
                    return Some(Arc::clone(item));
                }
                continue;
            };

            if let Some(hit) = cache.get(plugin, &key) {
                match T::from_target(&hit) {
                    Some(cached) if Arc::ptr_eq(cached, item) => return Some(Arc::clone(item)),
                    Some(cached) if cached.id() == item.id() => {
                        trace!(plugin, id = item.id(), %key, "cached match is a replaced version");
                        cache.remove(plugin, &key);
                    }
                    _ => trace!(plugin, id = item.id(), %key, "cached match belongs to another target"),
                }
            }

            if strategy.evaluate(item.conditions(), ctx, &self.judges) {
                trace!(plugin, id = item.id(), %key, "matched, caching");
                cache.put(plugin, key, T::target(item));
                return Some(Arc::clone(item));
            }
        }
        None
    }
}
