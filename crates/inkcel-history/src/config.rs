#![forbid(unsafe_code)]

//! History configuration.
//!
//! A single [`HistoryConfig`] carries every tunable of the engine. With the
//! `config` feature it can be loaded from TOML or JSON at startup.
//!
//! ```toml
//! # inkcel.toml
//! context_count = 12
//! checkpoint_interval = 10
//! max_nodes = 120
//! max_snapshot_bytes = 67108864
//! blank_color = { r = 1.0, g = 1.0, b = 1.0, a = 1.0 }
//! ```
//!
//! ```rust,ignore
//! let config = HistoryConfig::from_toml_file("inkcel.toml")?.validated()?;
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use inkcel_core::Rgba;
use thiserror::Error;

/// Default checkpoint interval.
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 25;

/// Default per-context node budget.
pub const DEFAULT_MAX_NODES: usize = 250;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct HistoryConfig {
    /// Number of independent histories (animation frames).
    pub context_count: usize,
    /// A full snapshot is taken every `checkpoint_interval` strokes of depth
    /// (0 = only the root baseline).
    pub checkpoint_interval: u64,
    /// Maximum live nodes per context, root included.
    pub max_nodes: usize,
    /// Maximum snapshot bytes per context (0 = unlimited).
    pub max_snapshot_bytes: usize,
    /// Colour `new_drawing` clears the canvas to.
    pub blank_color: Rgba,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            context_count: 1,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            max_nodes: DEFAULT_MAX_NODES,
            max_snapshot_bytes: 0,
            blank_color: Rgba::WHITE,
        }
    }
}

impl HistoryConfig {
    /// Configuration with the three core tunables set.
    #[must_use]
    pub fn new(context_count: usize, checkpoint_interval: u64, max_nodes: usize) -> Self {
        Self {
            context_count,
            checkpoint_interval,
            max_nodes,
            ..Self::default()
        }
    }

    /// Set the context count.
    #[must_use]
    pub fn with_context_count(mut self, context_count: usize) -> Self {
        self.context_count = context_count;
        self
    }

    /// Set the checkpoint interval.
    #[must_use]
    pub fn with_checkpoint_interval(mut self, interval: u64) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Set the per-context node budget.
    #[must_use]
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Set the per-context snapshot byte budget.
    #[must_use]
    pub fn with_max_snapshot_bytes(mut self, bytes: usize) -> Self {
        self.max_snapshot_bytes = bytes;
        self
    }

    /// Set the blank canvas colour.
    #[must_use]
    pub fn with_blank_color(mut self, color: Rgba) -> Self {
        self.blank_color = color;
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.context_count == 0 {
            errors.push("context_count must be > 0".into());
        }

        // Root plus at least one undoable stroke.
        if self.max_nodes < 2 {
            errors.push(format!("max_nodes must be >= 2, got {}", self.max_nodes));
        }
        if self.max_nodes > u32::MAX as usize {
            errors.push(format!(
                "max_nodes must fit in u32, got {}",
                self.max_nodes
            ));
        }

        let c = self.blank_color;
        for (name, value) in [("r", c.r), ("g", c.g), ("b", c.b), ("a", c.a)] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!("blank_color.{name} must be in [0, 1], got {value}"));
            }
        }

        errors
    }

    /// Return `self` if valid, otherwise every validation error.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[source] toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    #[error("JSON parse error: {0}")]
    Json(#[source] serde_json::Error),
    /// Validation errors.
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
