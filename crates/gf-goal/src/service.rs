// service.rs — GoalService: the command/query façade for presentation layers.
//
// Callers speak in strings (ids from a URL, a CLI argument, a JSON body)
// and plain numbers. The service checks those shapes, then delegates to the
// GoalForest under a reader/writer lock:
//
//   - every command holds the write lock for its whole duration, including
//     the ancestor walk of a rollup and the subtree walk of a delete
//   - queries share the read lock and never see a half-applied command
//
// Events are dispatched after the lock is released.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::error::GoalError;
use crate::events::{EventDispatcher, GoalEvent};
use crate::forest::{ForestState, GoalForest, ProgressChange};
use crate::node::{normalize_title, GoalId, GoalNode, GoalPatch, NewGoal, TaskId};
use crate::summary::{ForestOverview, ProgressSummary};
use crate::sync::{TaskSnapshot, TaskSyncAdapter};

/// Thread-safe handle to a goal forest. Clones share the same forest.
#[derive(Clone)]
pub struct GoalService {
    forest: Arc<RwLock<GoalForest>>,
    dispatcher: Arc<EventDispatcher>,
}

impl GoalService {
    pub fn new(forest: GoalForest) -> Self {
        Self::with_dispatcher(forest, EventDispatcher::new())
    }

    pub fn with_dispatcher(forest: GoalForest, dispatcher: EventDispatcher) -> Self {
        Self {
            forest: Arc::new(RwLock::new(forest)),
            dispatcher: Arc::new(dispatcher),
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    pub fn create_goal(&self, fields: NewGoal, parent: Option<&str>) -> Result<GoalNode, GoalError> {
        normalize_title(&fields.title)?;
        let parent = parent.map(GoalId::parse).transpose()?;

        let outcome = self.write()?.create_goal_with_rollup(fields, parent)?;
        let mut events = vec![GoalEvent::goal_created(
            outcome.node.id,
            &outcome.node.title,
            parent,
        )];
        events.extend(progress_events(&outcome.rollup));
        self.emit(events);
        Ok(outcome.node)
    }

    pub fn update_goal(&self, id: &str, patch: GoalPatch) -> Result<GoalNode, GoalError> {
        let id = GoalId::parse(id)?;
        if let Some(title) = &patch.title {
            normalize_title(title)?;
        }

        let node = self.write()?.update_goal(id, patch)?;
        self.emit(vec![GoalEvent::GoalUpdated {
            goal_id: id,
            timestamp: node.updated_at,
        }]);
        Ok(node)
    }

    pub fn add_note(&self, id: &str, note: &str) -> Result<GoalNode, GoalError> {
        self.update_goal(id, GoalPatch::new().note(note))
    }

    /// Delete a goal and its subtree; returns every removed id.
    pub fn delete_goal(&self, id: &str) -> Result<Vec<GoalId>, GoalError> {
        let id = GoalId::parse(id)?;

        let outcome = self.write()?.delete_goal(id)?;
        let mut events = vec![GoalEvent::GoalDeleted {
            goal_id: id,
            removed: outcome.removed.clone(),
            timestamp: Utc::now(),
        }];
        events.extend(progress_events(&outcome.rollup));
        self.emit(events);
        Ok(outcome.removed)
    }

    pub fn add_child(&self, parent: &str, child: &str) -> Result<(), GoalError> {
        let parent = GoalId::parse(parent)?;
        let child = GoalId::parse(child)?;

        let (moved, changes) = {
            let mut forest = self.write()?;
            let already_attached =
                forest.get_node(child).and_then(|n| n.parent_id) == Some(parent);
            (!already_attached, forest.add_child(parent, child)?)
        };
        if moved {
            self.emit_reparent(child, Some(parent), &changes);
        }
        Ok(())
    }

    pub fn remove_child(&self, parent: &str, child: &str) -> Result<(), GoalError> {
        let parent = GoalId::parse(parent)?;
        let child = GoalId::parse(child)?;

        let changes = self.write()?.remove_child(parent, child)?;
        self.emit_reparent(child, None, &changes);
        Ok(())
    }

    /// Set progress directly. Fractions are rounded, then clamped to `[0, 100]`.
    pub fn set_progress(&self, id: &str, value: f64) -> Result<GoalNode, GoalError> {
        let id = GoalId::parse(id)?;
        if !value.is_finite() {
            return Err(GoalError::Validation(format!(
                "progress must be a finite number, got {}",
                value
            )));
        }

        let (node, changes) = {
            let mut forest = self.write()?;
            let changes = forest.set_progress(id, value.round() as i64)?;
            let node = forest.get_node(id).cloned().ok_or(GoalError::NotFound(id))?;
            (node, changes)
        };
        self.emit(progress_events(&changes));
        Ok(node)
    }

    pub fn link_task(&self, goal_id: &str, task_id: &str) -> Result<bool, GoalError> {
        let goal_id = GoalId::parse(goal_id)?;
        let task_id = parse_task_id(task_id)?;

        let linked = self.write()?.link_task(goal_id, task_id.clone())?;
        if linked {
            self.emit(vec![GoalEvent::TaskLinked {
                goal_id,
                task_id,
                timestamp: Utc::now(),
            }]);
        }
        Ok(linked)
    }

    pub fn unlink_task(&self, goal_id: &str, task_id: &str) -> Result<bool, GoalError> {
        let goal_id = GoalId::parse(goal_id)?;
        let task_id = parse_task_id(task_id)?;

        let unlinked = self.write()?.unlink_task(goal_id, &task_id)?;
        if unlinked {
            self.emit(vec![GoalEvent::TaskUnlinked {
                goal_id,
                task_id,
                timestamp: Utc::now(),
            }]);
        }
        Ok(unlinked)
    }

    /// Reconcile task-linked goals against a task store snapshot.
    pub fn reconcile(&self, snapshot: &[TaskSnapshot]) -> Result<Vec<GoalId>, GoalError> {
        let report = TaskSyncAdapter::reconcile_with_report(&mut *self.write()?, snapshot);
        self.emit(progress_events(&report.progress_changes));
        Ok(report.changed)
    }

    /// Replace the whole forest with a validated snapshot.
    pub fn restore(&self, state: ForestState) -> Result<(), GoalError> {
        let mut forest = self.write()?;
        let restored = GoalForest::restore(state, forest.config().clone())?;
        *forest = restored;
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn get_node(&self, id: &str) -> Result<Option<GoalNode>, GoalError> {
        let id = GoalId::parse(id)?;
        Ok(self.read()?.get_node(id).cloned())
    }

    pub fn get_children(&self, id: &str) -> Result<Vec<GoalNode>, GoalError> {
        let id = GoalId::parse(id)?;
        let forest = self.read()?;
        Ok(forest.get_children(id)?.into_iter().cloned().collect())
    }

    pub fn get_roots(&self) -> Result<Vec<GoalNode>, GoalError> {
        Ok(self.read()?.get_roots().into_iter().cloned().collect())
    }

    pub fn get_progress_summary(&self, id: &str) -> Result<ProgressSummary, GoalError> {
        let id = GoalId::parse(id)?;
        self.read()?.progress_summary(id)
    }

    pub fn overview(&self, now: DateTime<Utc>, limit: usize) -> Result<ForestOverview, GoalError> {
        Ok(self.read()?.overview(now, limit))
    }

    pub fn snapshot(&self) -> Result<ForestState, GoalError> {
        Ok(self.read()?.snapshot())
    }

    /// Run a read-only closure against the forest under the read lock.
    pub fn with_forest<R>(&self, f: impl FnOnce(&GoalForest) -> R) -> Result<R, GoalError> {
        let forest = self.read()?;
        Ok(f(&forest))
    }

    // ── Internals ────────────────────────────────────────────────

    fn read(&self) -> Result<RwLockReadGuard<'_, GoalForest>, GoalError> {
        self.forest.read().map_err(|_| GoalError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GoalForest>, GoalError> {
        self.forest.write().map_err(|_| GoalError::LockPoisoned)
    }

    fn emit(&self, events: Vec<GoalEvent>) {
        self.dispatcher.dispatch_all(&events);
    }

    fn emit_reparent(&self, child: GoalId, parent: Option<GoalId>, changes: &[ProgressChange]) {
        let mut events = vec![GoalEvent::GoalReparented {
            goal_id: child,
            parent_id: parent,
            timestamp: Utc::now(),
        }];
        events.extend(progress_events(changes));
        self.emit(events);
    }
}

fn progress_events(changes: &[ProgressChange]) -> Vec<GoalEvent> {
    changes.iter().map(GoalEvent::progress_changed).collect()
}

fn parse_task_id(raw: &str) -> Result<TaskId, GoalError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GoalError::Validation("task id must not be blank".into()));
    }
    Ok(TaskId::new(trimmed))
}
