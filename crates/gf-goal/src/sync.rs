// sync.rs — TaskSyncAdapter: pulls external task completion into goals.
//
// The adapter never fetches anything itself. The caller hands it a
// snapshot of task completion flags and it derives the progress of every
// task-linked goal from that snapshot, routing each change through
// `GoalForest::set_progress` so ancestors roll up as usual.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::ProgressPrecedence;
use crate::forest::{GoalForest, ProgressChange, ProgressSource};
use crate::node::{GoalId, TaskId};
use crate::rollup::completion_percent;

/// Completion state of one task as reported by the task store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub completed: bool,
}

impl TaskSnapshot {
    pub fn new(task_id: impl Into<TaskId>, completed: bool) -> Self {
        Self {
            task_id: task_id.into(),
            completed,
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Goals whose progress was set from their linked tasks.
    pub changed: Vec<GoalId>,
    /// Every progress change, including ancestor rollups.
    pub progress_changes: Vec<ProgressChange>,
}

/// Reconciles goal progress against task completion snapshots.
pub struct TaskSyncAdapter;

impl TaskSyncAdapter {
    /// Apply `snapshot` to every task-linked goal and return the ids of the
    /// goals whose progress changed.
    pub fn reconcile(forest: &mut GoalForest, snapshot: &[TaskSnapshot]) -> Vec<GoalId> {
        Self::reconcile_with_report(forest, snapshot).changed
    }

    /// Same as [`TaskSyncAdapter::reconcile`], also returning rollup effects.
    ///
    /// Task ids missing from the snapshot are left out of the ratio. A goal
    /// none of whose linked tasks appear is skipped. When a task id appears
    /// more than once, the last entry wins.
    pub fn reconcile_with_report(
        forest: &mut GoalForest,
        snapshot: &[TaskSnapshot],
    ) -> ReconcileReport {
        let completion: HashMap<&TaskId, bool> = snapshot
            .iter()
            .map(|task| (&task.task_id, task.completed))
            .collect();
        let skip_parents = forest.config().progress_precedence == ProgressPrecedence::Children;

        let targets: Vec<(GoalId, u8)> = forest
            .iter()
            .filter(|goal| goal.has_linked_tasks())
            .filter(|goal| !(skip_parents && goal.has_children()))
            .filter_map(|goal| {
                let states: Vec<bool> = goal
                    .task_ids
                    .iter()
                    .filter_map(|t| completion.get(t).copied())
                    .collect();
                let done = states.iter().filter(|c| **c).count();
                match completion_percent(done, states.len()) {
                    Some(pct) => Some((goal.id, pct)),
                    None => {
                        tracing::debug!(goal_id = %goal.id, "no linked task in snapshot; skipped");
                        None
                    }
                }
            })
            .collect();

        let mut report = ReconcileReport::default();
        for (goal_id, pct) in targets {
            // Re-read: an earlier rollup in this pass may have moved it.
            let current = match forest.get_node(goal_id) {
                Some(goal) => goal.progress,
                None => continue,
            };
            if current == pct {
                continue;
            }
            match forest.set_progress_from(goal_id, i64::from(pct), ProgressSource::TaskSync) {
                Ok(changes) => {
                    tracing::debug!(goal_id = %goal_id, from = current, to = pct, "progress synced from tasks");
                    report.changed.push(goal_id);
                    report.progress_changes.extend(changes);
                }
                Err(e) => tracing::warn!("task sync skipped goal {}: {}", goal_id, e),
            }
        }
        report
    }
}
