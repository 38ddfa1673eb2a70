// error.rs — Error types for the goal forest engine.

use thiserror::Error;

use crate::node::GoalId;

/// Errors that can occur during goal forest operations.
///
/// Every structural operation validates before it mutates, so receiving
/// any of these from a store method means the forest is unchanged.
#[derive(Debug, Error)]
pub enum GoalError {
    /// The referenced goal does not exist.
    #[error("goal not found: {0}")]
    NotFound(GoalId),

    /// The operation would break a structural invariant of the forest
    /// (cycle, self-parenting, removing a node that isn't a child, ...).
    #[error("invalid operation on goal {goal_id}: {reason}")]
    InvalidOperation { goal_id: GoalId, reason: String },

    /// Malformed input rejected before reaching the store.
    #[error("validation error: {0}")]
    Validation(String),

    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize forest data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The engine config file could not be parsed.
    #[error("invalid config at {path}: {source}")]
    ConfigError {
        path: String,
        source: toml::de::Error,
    },

    /// Another thread panicked while holding the forest lock.
    #[error("goal forest lock poisoned")]
    LockPoisoned,

    /// A notification dispatch failed (non-fatal).
    #[error("notification error: {0}")]
    NotificationError(String),
}

impl GoalError {
    pub(crate) fn invalid(goal_id: GoalId, reason: impl Into<String>) -> Self {
        GoalError::InvalidOperation {
            goal_id,
            reason: reason.into(),
        }
    }
}
