//! Configuration-push events.
//!
//! One variant per [`ConfigurationIndex`](crate::ConfigurationIndex) mutation.
//! With the `serde` feature, events are adjacently tagged:
//!
//! ```yaml
//! type: upsert_selector
//! data: { id: s1, plugin_name: rate-limiter, sort: 1 }
//! ```

use crate::{PluginData, RuleData, SelectorData};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single configuration change pushed by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", content = "data", rename_all = "snake_case")
)]
pub enum ConfigEvent {
    UpsertPlugin(PluginData),
    RemovePlugin(PluginData),
    RemovePlugins(Vec<PluginData>),
    ClearPlugins,

    UpsertSelector(SelectorData),
    RemoveSelector(SelectorData),
    RemoveSelectors(Vec<SelectorData>),
    /// All selectors of the named plugin.
    RemoveSelectorsByPlugin(String),
    ClearSelectors,

    UpsertRule(RuleData),
    RemoveRule(RuleData),
    RemoveRules(Vec<RuleData>),
    /// All rules of the identified selector.
    RemoveRulesBySelector(String),
    ClearRules,
}

impl ConfigEvent {
    /// Short name of the event kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpsertPlugin(_) => "upsert_plugin",
            Self::RemovePlugin(_) => "remove_plugin",
            Self::RemovePlugins(_) => "remove_plugins",
            Self::ClearPlugins => "clear_plugins",
            Self::UpsertSelector(_) => "upsert_selector",
            Self::RemoveSelector(_) => "remove_selector",
            Self::RemoveSelectors(_) => "remove_selectors",
            Self::RemoveSelectorsByPlugin(_) => "remove_selectors_by_plugin",
            Self::ClearSelectors => "clear_selectors",
            Self::UpsertRule(_) => "upsert_rule",
            Self::RemoveRule(_) => "remove_rule",
            Self::RemoveRules(_) => "remove_rules",
            Self::RemoveRulesBySelector(_) => "remove_rules_by_selector",
            Self::ClearRules => "clear_rules",
        }
    }
}

impl fmt::Display for ConfigEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpsertPlugin(p) | Self::RemovePlugin(p) => write!(f, "{} {}", self.kind(), p.name),
            Self::UpsertSelector(s) | Self::RemoveSelector(s) => write!(f, "{} {}", self.kind(), s.id),
            Self::UpsertRule(r) | Self::RemoveRule(r) => write!(f, "{} {}", self.kind(), r.id),
            Self::RemovePlugins(v) => write!(f, "{} ({})", self.kind(), v.len()),
            Self::RemoveSelectors(v) => write!(f, "{} ({})", self.kind(), v.len()),
            Self::RemoveRules(v) => write!(f, "{} ({})", self.kind(), v.len()),
            Self::RemoveSelectorsByPlugin(k) | Self::RemoveRulesBySelector(k) => {
                write!(f, "{} {k}", self.kind())
            }
            Self::ClearPlugins | Self::ClearSelectors | Self::ClearRules => f.write_str(self.kind()),
        }
    }
}
