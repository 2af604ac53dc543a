//! Full configuration documents.
//!
//! A snapshot is the whole routing configuration at once, plus optional
//! [`DataPlaneConfig`] tuning. Applying it replays one upsert event per entry.
//!
//! ```yaml
//! config:
//!   cache:
//!     segment_capacity: 1024
//! plugins:
//!   - name: rate-limiter
//! selectors:
//!   - id: s1
//!     plugin_name: rate-limiter
//!     sort: 1
//!     match_mode: and
//!     conditions:
//!       - { id: c1, param_type: header, operator: "=", param_name: x-env, param_value: prod }
//! rules:
//!   - id: r1
//!     selector_id: s1
//! ```

use crate::{ConfigEvent, DataPlaneConfig, PluginData, RuleData, SelectorData};

#[cfg(feature = "serde")]
use serde::Deserialize;

/// A complete routing configuration.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConfigSnapshot {
    /// Tuning for a data plane built from this snapshot.
    pub config: DataPlaneConfig,
    /// Plugins, in push order.
    pub plugins: Vec<PluginData>,
    /// Selectors, in push order.
    pub selectors: Vec<SelectorData>,
    /// Rules, in push order.
    pub rules: Vec<RuleData>,
}

impl ConfigSnapshot {
    /// The upsert events that reproduce this snapshot: plugins, then selectors,
    /// then rules.
    pub fn events(&self) -> impl Iterator<Item = ConfigEvent> + '_ {
        let plugins = self.plugins.iter().cloned().map(ConfigEvent::UpsertPlugin);
        let selectors = self
            .selectors
            .iter()
            .cloned()
            .map(ConfigEvent::UpsertSelector);
        let rules = self.rules.iter().cloned().map(ConfigEvent::UpsertRule);
        plugins.chain(selectors).chain(rules)
    }
}

#[cfg(feature = "serde")]
pub use decode::SnapshotError;

#[cfg(feature = "serde")]
mod decode {
    use super::ConfigSnapshot;
    use std::path::Path;

    /// Failure to load a [`ConfigSnapshot`].
    #[derive(Debug, thiserror::Error)]
    pub enum SnapshotError {
        #[error("failed to read {path}: {source}")]
        Io {
            path: String,
            #[source]
            source: std::io::Error,
        },

        #[error("invalid YAML snapshot: {0}")]
        Yaml(#[from] serde_yaml::Error),

        #[error("invalid JSON snapshot: {0}")]
        Json(#[from] serde_json::Error),
    }

    impl ConfigSnapshot {
        /// Parse a YAML document.
        pub fn from_yaml(yaml: &str) -> Result<Self, SnapshotError> {
            Ok(serde_yaml::from_str(yaml)?)
        }

        /// Parse a JSON document.
        pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
            Ok(serde_json::from_str(json)?)
        }

        /// Read a file; `.json` is parsed as JSON, anything else as YAML.
        pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
                path: path.display().to_string(),
                source,
            })?;
            if path.extension().is_some_and(|ext| ext == "json") {
                Self::from_json(&text)
            } else {
                Self::from_yaml(&text)
            }
        }
    }
}
