// events.rs — Goal events and notification dispatch.
//
// The façade emits one event per successful mutation after the forest lock
// has been released. Sinks observe; they never feed back into the forest,
// so a failing sink cannot undo or block an operation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GoalError;
use crate::forest::{ProgressChange, ProgressSource};
use crate::node::{GoalId, TaskId};

/// Events emitted by the goal service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GoalEvent {
    /// A new goal was created.
    GoalCreated {
        goal_id: GoalId,
        title: String,
        parent_id: Option<GoalId>,
        timestamp: DateTime<Utc>,
    },

    /// Scalar fields or notes of a goal changed.
    GoalUpdated {
        goal_id: GoalId,
        timestamp: DateTime<Utc>,
    },

    /// A goal and its subtree were deleted.
    GoalDeleted {
        goal_id: GoalId,
        removed: Vec<GoalId>,
        timestamp: DateTime<Utc>,
    },

    /// A goal moved to a new parent; `None` means it became a root.
    GoalReparented {
        goal_id: GoalId,
        parent_id: Option<GoalId>,
        timestamp: DateTime<Utc>,
    },

    /// A goal's progress value moved.
    ProgressChanged {
        goal_id: GoalId,
        from: u8,
        to: u8,
        source: ProgressSource,
        timestamp: DateTime<Utc>,
    },

    TaskLinked {
        goal_id: GoalId,
        task_id: TaskId,
        timestamp: DateTime<Utc>,
    },

    TaskUnlinked {
        goal_id: GoalId,
        task_id: TaskId,
        timestamp: DateTime<Utc>,
    },
}

impl GoalEvent {
    /// Get the event type name as a string.
    pub fn event_type(&self) -> &str {
        match self {
            GoalEvent::GoalCreated { .. } => "goal_created",
            GoalEvent::GoalUpdated { .. } => "goal_updated",
            GoalEvent::GoalDeleted { .. } => "goal_deleted",
            GoalEvent::GoalReparented { .. } => "goal_reparented",
            GoalEvent::ProgressChanged { .. } => "progress_changed",
            GoalEvent::TaskLinked { .. } => "task_linked",
            GoalEvent::TaskUnlinked { .. } => "task_unlinked",
        }
    }

    pub fn goal_id(&self) -> GoalId {
        match self {
            GoalEvent::GoalCreated { goal_id, .. }
            | GoalEvent::GoalUpdated { goal_id, .. }
            | GoalEvent::GoalDeleted { goal_id, .. }
            | GoalEvent::GoalReparented { goal_id, .. }
            | GoalEvent::ProgressChanged { goal_id, .. }
            | GoalEvent::TaskLinked { goal_id, .. }
            | GoalEvent::TaskUnlinked { goal_id, .. } => *goal_id,
        }
    }

    pub fn goal_created(goal_id: GoalId, title: &str, parent_id: Option<GoalId>) -> Self {
        GoalEvent::GoalCreated {
            goal_id,
            title: title.to_string(),
            parent_id,
            timestamp: Utc::now(),
        }
    }

    pub fn progress_changed(change: &ProgressChange) -> Self {
        GoalEvent::ProgressChanged {
            goal_id: change.goal_id,
            from: change.from,
            to: change.to,
            source: change.source,
            timestamp: Utc::now(),
        }
    }
}

/// Trait for receiving goal events.
pub trait NotificationSink: Send + Sync {
    /// Handle an event. Errors are logged but don't stop the system.
    fn send(&self, event: &GoalEvent) -> Result<(), GoalError>;
}

/// Logs events as JSONL to a file.
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NotificationSink for LogSink {
    fn send(&self, event: &GoalEvent) -> Result<(), GoalError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| GoalError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| GoalError::IoError {
                path: self.path.display().to_string(),
                source,
            })?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json).map_err(|source| GoalError::IoError {
            path: self.path.display().to_string(),
            source,
        })?;

        Ok(())
    }
}

/// Dispatches events to multiple sinks.
///
/// Errors from individual sinks are logged (via tracing) but don't
/// prevent other sinks from receiving the event.
pub struct EventDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Dispatch an event to all sinks.
    pub fn dispatch(&self, event: &GoalEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!("notification sink error: {}", e);
            }
        }
    }

    pub fn dispatch_all(&self, events: &[GoalEvent]) {
        for event in events {
            self.dispatch(event);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
