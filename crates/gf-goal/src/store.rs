// store.rs — ForestFileStore: JSON file persistence for a whole forest.
//
// The engine itself never touches disk. Hosts that want durability take a
// `ForestState` snapshot and hand it to this store, which writes it as one
// pretty-printed JSON document. Writes go to a sibling temp file first and
// are renamed into place, so a crash never leaves a half-written forest.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::error::GoalError;
use crate::forest::{ForestState, GoalForest};

/// Single-file store for a [`ForestState`].
pub struct ForestFileStore {
    path: PathBuf,
}

impl ForestFileStore {
    /// Create a store for the given file. Creates the parent directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, GoalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| GoalError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a snapshot to disk (creates or overwrites).
    pub fn save(&self, state: &ForestState) -> Result<(), GoalError> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| GoalError::IoError {
            path: tmp.display().to_string(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| GoalError::IoError {
            path: self.path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), goals = state.goals.len(), "forest saved");
        Ok(())
    }

    /// Read the stored snapshot. A missing file is an empty forest.
    pub fn load(&self) -> Result<ForestState, GoalError> {
        if !self.path.exists() {
            return Ok(ForestState::default());
        }
        let json = fs::read_to_string(&self.path).map_err(|source| GoalError::IoError {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load and validate a forest in one step.
    pub fn open_forest(&self, config: EngineConfig) -> Result<GoalForest, GoalError> {
        GoalForest::restore(self.load()?, config)
    }
}
