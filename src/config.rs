//! Configuration for the IR object model.
//!
//! Centralized configuration with serde defaults, loadable from JSON text or
//! a file. Every field may be omitted from the JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// How overlap queries locate candidate entries.
///
/// Both strategies return identical results; they differ only in cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapStrategy {
    /// Examine every key at or below the query point. O(n) worst case.
    Scan,
    /// Prune subtrees by their maximum entry end. O(log n + k).
    #[default]
    Augmented,
}

/// Address index configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Strategy used by `query_containing` and `query_containing_range`.
    pub overlap_strategy: OverlapStrategy,
}

/// Logging configuration consumed by [`crate::logging::init_with_config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
    /// Filter directive used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: "info".to_string(),
        }
    }
}

/// Master configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrConfig {
    /// Address index configuration applied to every container.
    pub index: IndexConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl IrConfig {
    /// Parse configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read configuration from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize configuration to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
