//! Engine configuration.
//!
//! Loaded from `.gf/config.toml` by hosts that want to override the
//! defaults. Every field has a serde default, so an empty file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GoalError;

/// Which progress source wins when a goal has both sub-goals and linked tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPrecedence {
    /// Task reconciliation owns the goal; child rollup stops below it.
    #[default]
    TaskLinks,
    /// Child rollup owns the goal; reconciliation skips it.
    Children,
}

/// Behavior switches for the goal forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Stop the ancestor walk at the first ancestor whose value didn't change.
    #[serde(default = "default_true")]
    pub stop_when_unchanged: bool,

    /// Re-aggregate affected parents after delete, attach and detach.
    #[serde(default = "default_true")]
    pub rollup_on_restructure: bool,

    #[serde(default)]
    pub progress_precedence: ProgressPrecedence,

    /// Pick a palette color and icon for goals created without them.
    #[serde(default = "default_true")]
    pub assign_display_defaults: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stop_when_unchanged: true,
            rollup_on_restructure: true,
            progress_precedence: ProgressPrecedence::default(),
            assign_display_defaults: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, GoalError> {
        let content = std::fs::read_to_string(path).map_err(|source| GoalError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| GoalError::ConfigError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Try to load config, returning defaults if the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(GoalError::IoError { .. }) => Self::default(),
            Err(e) => {
                tracing::warn!("ignoring engine config: {}", e);
                Self::default()
            }
        }
    }
}
