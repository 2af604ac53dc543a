//! Tuning knobs for a [`DataPlane`](crate::DataPlane).
//!
//! Every field has a default, so an empty document (`{}`) is a valid config.
//!
//! ```yaml
//! cache:
//!   memory_ceiling_bytes: 268435456   # 256 MiB across all plugins
//!   segment_capacity: 65536           # entries per plugin
//! ```

#[cfg(feature = "serde")]
use serde::Deserialize;

/// Default aggregate memory ceiling for the match cache: 256 MiB.
pub const DEFAULT_MEMORY_CEILING_BYTES: usize = 256 * 1024 * 1024;

/// Default per-plugin entry ceiling: 65 536.
pub const DEFAULT_SEGMENT_CAPACITY: usize = 1 << 16;

/// Match-result cache bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheConfig {
    /// Estimated bytes all plugin segments may hold together.
    pub memory_ceiling_bytes: usize,
    /// Entries one plugin segment may hold. Zero is treated as one.
    pub segment_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_ceiling_bytes: DEFAULT_MEMORY_CEILING_BYTES,
            segment_capacity: DEFAULT_SEGMENT_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Override the memory ceiling (builder pattern).
    #[must_use]
    pub fn with_memory_ceiling(mut self, bytes: usize) -> Self {
        self.memory_ceiling_bytes = bytes;
        self
    }

    /// Override the per-plugin entry ceiling (builder pattern).
    #[must_use]
    pub fn with_segment_capacity(mut self, entries: usize) -> Self {
        self.segment_capacity = entries;
        self
    }
}

/// Top-level configuration for a [`DataPlane`](crate::DataPlane).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DataPlaneConfig {
    /// Match-result cache bounds.
    pub cache: CacheConfig,
}
