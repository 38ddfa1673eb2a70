// summary.rs — Read-only progress reports over the forest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GoalError;
use crate::forest::GoalForest;
use crate::node::{GoalId, GoalNode, GoalStatus};
use crate::rollup::mean_progress;

/// Progress of one goal relative to its whole subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub goal_id: GoalId,
    /// Descendants (at any depth) that are completed.
    pub completed_descendants: usize,
    pub total_descendants: usize,
    /// The goal's own progress.
    pub percent_complete: u8,
    pub status: GoalStatus,
}

/// A short entry in an overview list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalBrief {
    pub goal_id: GoalId,
    pub title: String,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Dashboard-style view of the entire forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestOverview {
    pub total_goals: usize,
    pub completed_goals: usize,
    /// Rounded mean progress of every goal; 0 for an empty forest.
    pub overall_progress: u8,
    /// Incomplete goals with a future deadline, soonest first.
    pub upcoming_deadlines: Vec<GoalBrief>,
    /// Completed goals, most recently updated first.
    pub recent_achievements: Vec<GoalBrief>,
}

impl GoalForest {
    pub fn progress_summary(&self, id: GoalId) -> Result<ProgressSummary, GoalError> {
        let node = self.get_node(id).ok_or(GoalError::NotFound(id))?;
        let descendants = self.descendants(id)?;
        let completed_descendants = descendants
            .iter()
            .filter_map(|d| self.get_node(*d))
            .filter(|d| d.completed)
            .count();
        Ok(ProgressSummary {
            goal_id: id,
            completed_descendants,
            total_descendants: descendants.len(),
            percent_complete: node.progress,
            status: node.status(),
        })
    }

    /// Summarize the forest as of `now`, keeping at most `limit` entries per list.
    pub fn overview(&self, now: DateTime<Utc>, limit: usize) -> ForestOverview {
        let brief = |node: &GoalNode| GoalBrief {
            goal_id: node.id,
            title: node.title.clone(),
            progress: node.progress,
            deadline: node.deadline,
            updated_at: node.updated_at,
        };

        let mut upcoming: Vec<_> = self
            .iter()
            .filter(|g| !g.completed && g.deadline.is_some_and(|d| d > now))
            .collect();
        upcoming.sort_by_key(|g| g.deadline);

        let mut achieved: Vec<_> = self.iter().filter(|g| g.completed).collect();
        achieved.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        ForestOverview {
            total_goals: self.len(),
            completed_goals: achieved.len(),
            overall_progress: mean_progress(self.iter().map(|g| g.progress)).unwrap_or(0),
            upcoming_deadlines: upcoming.into_iter().take(limit).map(brief).collect(),
            recent_achievements: achieved.into_iter().take(limit).map(brief).collect(),
        }
    }
}
