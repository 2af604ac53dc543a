//! waypoint - routing decision cache for gateway data planes
//!
//! Holds a gateway's routing configuration (plugins → selectors → rules →
//! conditions) and memoizes which selector or rule a request's matching inputs
//! resolved to, so repeated requests skip predicate evaluation.
//!
//! # Architecture
//!
//! - [`ConfigurationIndex`] - authoritative configuration plus back-references;
//!   every mutation purges the cached matches of the object it changed
//! - [`MatchResultCache`] - per-plugin bounded LRU of `cache key → target`, with an
//!   [`InvalidationTracker`] per segment and a shared memory ceiling
//! - [`MatchStrategy`] - AND/OR over a condition list ([`MatchMode::strategy`])
//! - [`PredicateJudge`] - one condition against one real value; looked up by
//!   [`Operator`] in a [`JudgeRegistry`]
//! - [`RequestContext`] - how the engine reads real values out of a request
//! - [`MatchEngine`] / [`DataPlane`] - request-time resolution and the service
//!   object tying it all together
//!
//! # Key Design Insights
//!
//! 1. **Identity, not equality**: the reverse index is keyed by [`TargetKey`], so an
//!    update finds the keys its previous version produced.
//!
//! 2. **Only positive matches are cached**: a key resolves to the selector or rule
//!    that matched; misses re-evaluate.
//!
//! 3. **Absent → `false`**: a condition whose real value is missing fails, except
//!    `isBlank`, which holds.
//!
//! # Example
//!
//! ```
//! use waypoint::prelude::*;
//! use std::borrow::Cow;
//!
//! struct Request { env: &'static str }
//!
//! impl RequestContext for Request {
//!     fn real_data(&self, param_type: ParamType, name: &str) -> Option<Cow<'_, str>> {
//!         match (param_type, name) {
//!             (ParamType::Header, "x-env") => Some(Cow::Borrowed(self.env)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let plane = DataPlane::new(DataPlaneConfig::default());
//! plane.apply(ConfigEvent::UpsertPlugin(PluginData::new("rate-limiter")));
//! plane.apply(ConfigEvent::UpsertSelector(
//!     SelectorData::new("s1", "rate-limiter", 1).with_condition(ConditionData::new(
//!         "c1", ParamType::Header, Operator::Equals, "x-env", "prod",
//!     )),
//! ));
//!
//! let hit = plane.match_selector("rate-limiter", &Request { env: "prod" });
//! assert_eq!(hit.map(|s| s.id.clone()).as_deref(), Some("s1"));
//! assert!(plane.cache().contains("rate-limiter", "c1_prod"));
//! ```
//!
//! # Extensions
//!
//! - [`waypoint-http`](https://docs.rs/waypoint-http) - `RequestContext` for HTTP requests
//! - [`waypoint-test`](https://docs.rs/waypoint-test) - test domain and YAML fixtures (internal)

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod cache;
mod cache_key;
mod config;
mod data;
mod engine;
mod event;
mod index;
mod judge;
mod plane;
mod registry;
mod request_context;
mod snapshot;
mod strategy;
mod trace;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Configuration data
pub use data::{
    ConditionData, MatchMode, MatchTarget, Operator, ParamType, PluginData, RuleData,
    SelectorData, TargetKey,
};
pub use event::ConfigEvent;
pub use snapshot::ConfigSnapshot;
#[cfg(feature = "serde")]
pub use snapshot::SnapshotError;

// Index and cache
pub use cache::{CacheStats, CacheStatsSnapshot, InvalidationTracker, MatchResultCache};
pub use cache_key::{condition_key, conditions_key, KEY_SEPARATOR, PART_SEPARATOR};
pub use index::{ConfigurationIndex, IndexStats, RuleList, SelectorList};

// Matching
pub use judge::{
    Comparison, ComparisonJudge, ContainsJudge, EndsWithJudge, EqualsJudge, ExcludeJudge,
    IsBlankJudge, PathPatternJudge, PredicateJudge, RegexJudge, StartsWithJudge,
    DEFAULT_PATTERN_MEMO_CAPACITY,
};
pub use registry::JudgeRegistry;
pub use request_context::RequestContext;
pub use strategy::{AndStrategy, MatchStrategy, OrStrategy};

// Trace types
pub use trace::{ConditionTrace, MatchTrace};

// Service
pub use config::{
    CacheConfig, DataPlaneConfig, DEFAULT_MEMORY_CEILING_BYTES, DEFAULT_SEGMENT_CAPACITY,
};
pub use engine::{MatchEngine, RouteDecision};
pub use plane::DataPlane;

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use waypoint::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Service
        CacheConfig,
        // Configuration data
        ConditionData,
        ConfigEvent,
        ConfigSnapshot,
        ConfigurationIndex,
        DataPlane,
        DataPlaneConfig,
        // Matching
        JudgeRegistry,
        MatchEngine,
        MatchMode,
        MatchResultCache,
        MatchStrategy,
        MatchTarget,
        MatchTrace,
        Operator,
        ParamType,
        PluginData,
        PredicateJudge,
        RequestContext,
        RouteDecision,
        RuleData,
        SelectorData,
        TargetKey,
    };
}
