// node.rs — GoalNode: the single entity of the goal forest.
//
// Nodes never hold references to each other. Parent/child links are ids
// into the forest's arena, so a node can be cloned out to callers freely
// and the forest stays the exclusive owner of the structure.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GoalError;

/// Unique, immutable identifier for a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalId(Uuid);

impl GoalId {
    /// Allocate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parse an id supplied by a caller (CLI argument, JSON payload, ...).
    pub fn parse(raw: &str) -> Result<Self, GoalError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|e| GoalError::Validation(format!("malformed goal id '{}': {}", raw, e)))
    }
}

impl Default for GoalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a task owned by the external task store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse status derived from a goal's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl GoalStatus {
    pub fn from_progress(progress: u8) -> Self {
        match progress {
            0 => GoalStatus::NotStarted,
            100..=u8::MAX => GoalStatus::Completed,
            _ => GoalStatus::InProgress,
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalStatus::NotStarted => write!(f, "not_started"),
            GoalStatus::InProgress => write!(f, "in_progress"),
            GoalStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A goal in the forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalNode {
    /// Unique identifier, assigned at creation.
    pub id: GoalId,

    /// Display title, never blank.
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Completion percentage in `[0, 100]`.
    pub progress: u8,

    /// Always `progress == 100`.
    pub completed: bool,

    /// Parent goal; `None` for roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<GoalId>,

    /// Sub-goals in display order.
    #[serde(default)]
    pub children: Vec<GoalId>,

    /// Linked task ids, duplicate-free, in link order.
    #[serde(default)]
    pub task_ids: Vec<TaskId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,

    #[serde(default)]
    pub notes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation, rollup included.
    pub updated_at: DateTime<Utc>,
}

impl GoalNode {
    pub fn status(&self) -> GoalStatus {
        GoalStatus::from_progress(self.progress)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn has_linked_tasks(&self) -> bool {
        !self.task_ids.is_empty()
    }

    /// Set progress and the derived `completed` flag together.
    pub(crate) fn apply_progress(&mut self, progress: u8, now: DateTime<Utc>) {
        self.progress = progress.min(100);
        self.completed = self.progress == 100;
        self.updated_at = now;
    }
}

/// Fields for a goal about to be created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub notes: Vec<String>,
    /// Initial progress, clamped to `[0, 100]`.
    pub progress: i64,
    pub task_ids: Vec<TaskId>,
}

impl NewGoal {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_progress(mut self, progress: i64) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_task(mut self, task_id: impl Into<TaskId>) -> Self {
        self.task_ids.push(task_id.into());
        self
    }
}

/// A partial update to a goal's scalar fields.
///
/// `None` leaves a field untouched. For optional fields, `Some(None)`
/// clears the value. Notes are only ever appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub icon: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub append_notes: Vec<String>,
}

impl GoalPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn deadline(mut self, deadline: Option<DateTime<Utc>>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn icon(mut self, icon: Option<String>) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn color(mut self, color: Option<String>) -> Self {
        self.color = Some(color);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.append_notes.push(note.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.icon.is_none()
            && self.color.is_none()
            && self.append_notes.is_empty()
    }
}

const DEFAULT_COLORS: &[&str] = &[
    "#4CAF50", "#2196F3", "#FFC107", "#9C27B0", "#F44336", "#FF9800", "#00BCD4", "#795548",
    "#607D8B", "#E91E63", "#673AB7", "#3F51B5", "#009688", "#8BC34A",
];

const DEFAULT_ICONS: &[&str] = &["🎯", "📌", "⭐", "📝", "📊", "🚀", "🔍", "⏳", "📈", "🏆"];

pub(crate) fn random_color() -> String {
    DEFAULT_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("#4CAF50")
        .to_string()
}

pub(crate) fn random_icon() -> String {
    DEFAULT_ICONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("🎯")
        .to_string()
}

/// Trim a title and reject it if nothing is left.
pub(crate) fn normalize_title(title: &str) -> Result<String, GoalError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(GoalError::Validation("goal title must not be blank".into()));
    }
    Ok(trimmed.to_string())
}
