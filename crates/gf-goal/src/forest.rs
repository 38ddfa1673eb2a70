// forest.rs — GoalForest: the arena that owns every goal.
//
// Goals live in a flat `id -> node` map plus an ordered root index.
// Parent/child links are ids in both directions and are always updated
// together, so the structure is a forest rather than a general graph:
//
//   roots: [A, E]
//   A ── B ── C          (A.children = [B], B.parent_id = A, ...)
//   E
//
// Mutations follow validate-then-commit: every check that can fail runs
// before the first write, so an `Err` leaves the forest untouched.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, ProgressPrecedence};
use crate::error::GoalError;
use crate::node::{
    normalize_title, random_color, random_icon, GoalId, GoalNode, GoalPatch, NewGoal, TaskId,
};
use crate::rollup::{clamp_progress, mean_progress};

/// What caused a progress value to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    /// Set explicitly by a caller.
    Direct,
    /// Recomputed from children.
    Rollup,
    /// Derived from linked task completion.
    TaskSync,
}

/// One progress value that moved during an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressChange {
    pub goal_id: GoalId,
    pub from: u8,
    pub to: u8,
    pub source: ProgressSource,
}

/// Result of a cascading delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Removed ids in pre-order, the deleted goal first.
    pub removed: Vec<GoalId>,
    /// Ancestor re-aggregation triggered by the removal.
    pub rollup: Vec<ProgressChange>,
}

/// Result of creating a goal.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub node: GoalNode,
    /// Ancestor re-aggregation triggered by the new child.
    pub rollup: Vec<ProgressChange>,
}

/// Serializable image of a whole forest, for hosts that persist it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForestState {
    pub goals: Vec<GoalNode>,
    pub root_ids: Vec<GoalId>,
}

/// The goal store: owns the forest and enforces its invariants.
#[derive(Debug, Clone, Default)]
pub struct GoalForest {
    goals: BTreeMap<GoalId, GoalNode>,
    roots: Vec<GoalId>,
    config: EngineConfig,
}

impl GoalForest {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            goals: BTreeMap::new(),
            roots: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn contains(&self, id: GoalId) -> bool {
        self.goals.contains_key(&id)
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Create a goal, either as a new root or as the last child of `parent`.
    pub fn create_goal(
        &mut self,
        fields: NewGoal,
        parent: Option<GoalId>,
    ) -> Result<GoalNode, GoalError> {
        Ok(self.create_goal_with_rollup(fields, parent)?.node)
    }

    /// Like [`create_goal`](Self::create_goal), also reporting the parent
    /// chain's progress changes.
    pub fn create_goal_with_rollup(
        &mut self,
        fields: NewGoal,
        parent: Option<GoalId>,
    ) -> Result<CreateOutcome, GoalError> {
        let title = normalize_title(&fields.title)?;
        if let Some(parent_id) = parent {
            if !self.contains(parent_id) {
                return Err(GoalError::NotFound(parent_id));
            }
        }
        let mut task_ids: Vec<TaskId> = Vec::with_capacity(fields.task_ids.len());
        for task_id in &fields.task_ids {
            let trimmed = task_id.as_str().trim();
            if trimmed.is_empty() {
                return Err(GoalError::Validation("task id must not be blank".into()));
            }
            let task_id = TaskId::new(trimmed);
            if !task_ids.contains(&task_id) {
                task_ids.push(task_id);
            }
        }
        if fields.notes.iter().any(|n| n.trim().is_empty()) {
            return Err(GoalError::Validation("notes must not be blank".into()));
        }

        let now = Utc::now();
        let progress = clamp_progress(fields.progress);
        let (icon, color) = if self.config.assign_display_defaults {
            (
                fields.icon.or_else(|| Some(random_icon())),
                fields.color.or_else(|| Some(random_color())),
            )
        } else {
            (fields.icon, fields.color)
        };

        let node = GoalNode {
            id: GoalId::new(),
            title,
            description: fields.description,
            progress,
            completed: progress == 100,
            parent_id: parent,
            children: Vec::new(),
            task_ids,
            deadline: fields.deadline,
            notes: fields.notes,
            icon,
            color,
            created_at: now,
            updated_at: now,
        };
        let id = node.id;
        self.goals.insert(id, node.clone());

        let mut rollup = Vec::new();
        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.goals.get_mut(&parent_id) {
                    parent_node.children.push(id);
                    parent_node.updated_at = now;
                }
                if self.config.rollup_on_restructure {
                    rollup = self.reaggregate(Some(parent_id), now);
                }
            }
            None => self.roots.push(id),
        }

        tracing::debug!(goal_id = %id, parent = ?parent, "goal created");
        Ok(CreateOutcome { node, rollup })
    }

    /// Merge scalar fields from `patch`. Structure and progress are untouched.
    pub fn update_goal(&mut self, id: GoalId, patch: GoalPatch) -> Result<GoalNode, GoalError> {
        if !self.contains(id) {
            return Err(GoalError::NotFound(id));
        }
        let title = patch.title.as_deref().map(normalize_title).transpose()?;
        if patch.append_notes.iter().any(|n| n.trim().is_empty()) {
            return Err(GoalError::Validation("notes must not be blank".into()));
        }

        let node = self.node_mut(id)?;
        if let Some(title) = title {
            node.title = title;
        }
        if let Some(description) = patch.description {
            node.description = description;
        }
        if let Some(deadline) = patch.deadline {
            node.deadline = deadline;
        }
        if let Some(icon) = patch.icon {
            node.icon = icon;
        }
        if let Some(color) = patch.color {
            node.color = color;
        }
        node.notes.extend(patch.append_notes);
        node.updated_at = Utc::now();
        Ok(node.clone())
    }

    /// Append a single note to a goal.
    pub fn add_note(&mut self, id: GoalId, note: &str) -> Result<GoalNode, GoalError> {
        self.update_goal(id, GoalPatch::new().note(note))
    }

    /// Delete a goal together with its whole subtree.
    pub fn delete_goal(&mut self, id: GoalId) -> Result<DeleteOutcome, GoalError> {
        let parent = self.node(id)?.parent_id;
        let mut removed = vec![id];
        removed.extend(self.descendants(id)?);

        let now = Utc::now();
        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.goals.get_mut(&parent_id) {
                    parent_node.children.retain(|c| *c != id);
                    parent_node.updated_at = now;
                }
            }
            None => self.roots.retain(|r| *r != id),
        }

        for goal_id in &removed {
            if self.goals.remove(goal_id).is_none() {
                tracing::debug!(goal_id = %goal_id, "already removed during cascade");
            }
        }

        let rollup = if self.config.rollup_on_restructure {
            self.reaggregate(parent, now)
        } else {
            Vec::new()
        };

        tracing::info!(goal_id = %id, removed = removed.len(), "goal subtree deleted");
        Ok(DeleteOutcome { removed, rollup })
    }

    /// Move `child` under `parent`, appending it to the parent's children.
    ///
    /// Rejects unknown ids, self-parenting, and any move that would make a
    /// goal its own descendant. Re-attaching to the current parent is a no-op.
    pub fn add_child(
        &mut self,
        parent: GoalId,
        child: GoalId,
    ) -> Result<Vec<ProgressChange>, GoalError> {
        if !self.contains(parent) {
            return Err(GoalError::invalid(parent, "unknown parent goal"));
        }
        let old_parent = match self.goals.get(&child) {
            Some(node) => node.parent_id,
            None => return Err(GoalError::invalid(child, "unknown child goal")),
        };
        if parent == child {
            return Err(GoalError::invalid(child, "a goal cannot be its own parent"));
        }
        if self.is_ancestor(child, parent) {
            return Err(GoalError::invalid(
                child,
                format!("attaching under {} would create a cycle", parent),
            ));
        }
        if old_parent == Some(parent) {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        self.detach(child, old_parent, now);
        if let Some(parent_node) = self.goals.get_mut(&parent) {
            parent_node.children.push(child);
            parent_node.updated_at = now;
        }
        if let Some(child_node) = self.goals.get_mut(&child) {
            child_node.parent_id = Some(parent);
            child_node.updated_at = now;
        }

        let mut changes = Vec::new();
        if self.config.rollup_on_restructure {
            changes.extend(self.reaggregate(Some(parent), now));
            changes.extend(self.reaggregate(old_parent, now));
        }
        tracing::info!(goal_id = %child, parent = %parent, "goal re-parented");
        Ok(changes)
    }

    /// Detach `child` from `parent` and make it a root.
    pub fn remove_child(
        &mut self,
        parent: GoalId,
        child: GoalId,
    ) -> Result<Vec<ProgressChange>, GoalError> {
        self.node(parent)?;
        if self.node(child)?.parent_id != Some(parent) {
            return Err(GoalError::invalid(
                child,
                format!("goal is not a child of {}", parent),
            ));
        }

        let now = Utc::now();
        self.detach(child, Some(parent), now);
        self.roots.push(child);
        if let Some(child_node) = self.goals.get_mut(&child) {
            child_node.parent_id = None;
            child_node.updated_at = now;
        }

        let changes = if self.config.rollup_on_restructure {
            self.reaggregate(Some(parent), now)
        } else {
            Vec::new()
        };
        tracing::info!(goal_id = %child, former_parent = %parent, "goal demoted to root");
        Ok(changes)
    }

    /// Set a goal's progress directly, then roll the change up its ancestors.
    ///
    /// `value` is clamped to `[0, 100]`. Returns every progress value that
    /// moved: the goal itself first (if it changed), then each ancestor.
    pub fn set_progress(&mut self, id: GoalId, value: i64) -> Result<Vec<ProgressChange>, GoalError> {
        self.set_progress_from(id, value, ProgressSource::Direct)
    }

    pub(crate) fn set_progress_from(
        &mut self,
        id: GoalId,
        value: i64,
        source: ProgressSource,
    ) -> Result<Vec<ProgressChange>, GoalError> {
        let progress = clamp_progress(value);
        let now = Utc::now();
        let node = self.node_mut(id)?;
        let from = node.progress;
        let parent = node.parent_id;
        node.apply_progress(progress, now);

        let mut changes = Vec::new();
        if from != progress {
            changes.push(ProgressChange {
                goal_id: id,
                from,
                to: progress,
                source,
            });
        }
        changes.extend(self.reaggregate(parent, now));
        Ok(changes)
    }

    /// Link an external task. Returns `false` if it was already linked.
    pub fn link_task(&mut self, goal_id: GoalId, task_id: TaskId) -> Result<bool, GoalError> {
        let node = self.node_mut(goal_id)?;
        if node.task_ids.contains(&task_id) {
            return Ok(false);
        }
        node.task_ids.push(task_id);
        node.updated_at = Utc::now();
        Ok(true)
    }

    /// Unlink an external task. Returns `false` if it wasn't linked.
    pub fn unlink_task(&mut self, goal_id: GoalId, task_id: &TaskId) -> Result<bool, GoalError> {
        let node = self.node_mut(goal_id)?;
        let before = node.task_ids.len();
        node.task_ids.retain(|t| t != task_id);
        if node.task_ids.len() == before {
            return Ok(false);
        }
        node.updated_at = Utc::now();
        Ok(true)
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn get_node(&self, id: GoalId) -> Option<&GoalNode> {
        self.goals.get(&id)
    }

    /// Immediate children in display order.
    pub fn get_children(&self, id: GoalId) -> Result<Vec<&GoalNode>, GoalError> {
        Ok(self
            .node(id)?
            .children
            .iter()
            .filter_map(|c| self.goals.get(c))
            .collect())
    }

    /// Root goals in display order.
    pub fn get_roots(&self) -> Vec<&GoalNode> {
        self.roots.iter().filter_map(|r| self.goals.get(r)).collect()
    }

    pub fn root_ids(&self) -> &[GoalId] {
        &self.roots
    }

    /// All goals in id order.
    pub fn iter(&self) -> impl Iterator<Item = &GoalNode> {
        self.goals.values()
    }

    /// Every descendant of `id` in pre-order (display order), excluding `id`.
    pub fn descendants(&self, id: GoalId) -> Result<Vec<GoalId>, GoalError> {
        let mut out = Vec::new();
        let mut stack: Vec<GoalId> = self.node(id)?.children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.goals.get(&next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: GoalId) -> Result<Vec<GoalId>, GoalError> {
        let mut out = Vec::new();
        let mut cursor = self.node(id)?.parent_id;
        while let Some(ancestor) = cursor {
            if out.len() > self.goals.len() {
                break;
            }
            out.push(ancestor);
            cursor = self.goals.get(&ancestor).and_then(|n| n.parent_id);
        }
        Ok(out)
    }

    /// Whether `candidate` lies on the parent chain of `id`.
    pub fn is_ancestor(&self, candidate: GoalId, id: GoalId) -> bool {
        let mut cursor = self.goals.get(&id).and_then(|n| n.parent_id);
        let mut steps = 0;
        while let Some(ancestor) = cursor {
            if ancestor == candidate {
                return true;
            }
            steps += 1;
            if steps > self.goals.len() {
                return false;
            }
            cursor = self.goals.get(&ancestor).and_then(|n| n.parent_id);
        }
        false
    }

    // ── Persistence boundary ─────────────────────────────────────

    pub fn snapshot(&self) -> ForestState {
        ForestState {
            goals: self.goals.values().cloned().collect(),
            root_ids: self.roots.clone(),
        }
    }

    /// Rebuild a forest from a snapshot, refusing anything inconsistent.
    pub fn restore(state: ForestState, config: EngineConfig) -> Result<Self, GoalError> {
        let mut goals = BTreeMap::new();
        for node in state.goals {
            let id = node.id;
            if goals.insert(id, node).is_some() {
                return Err(GoalError::invalid(id, "duplicate goal id in snapshot"));
            }
        }
        let forest = Self {
            goals,
            roots: state.root_ids,
            config,
        };
        forest.check_invariants()?;
        tracing::debug!(goals = forest.len(), "forest restored");
        Ok(forest)
    }

    /// Verify every structural invariant of the forest.
    pub fn check_invariants(&self) -> Result<(), GoalError> {
        if let Some(node) = self.goals.values().find(|n| n.title.trim().is_empty()) {
            return Err(GoalError::invalid(node.id, "goal title is blank"));
        }

        let mut seen_roots = HashSet::new();
        for root in &self.roots {
            let node = self
                .goals
                .get(root)
                .ok_or_else(|| GoalError::invalid(*root, "root index references a missing goal"))?;
            if node.parent_id.is_some() {
                return Err(GoalError::invalid(*root, "goal with a parent is in the root index"));
            }
            if !seen_roots.insert(*root) {
                return Err(GoalError::invalid(*root, "goal appears twice in the root index"));
            }
        }

        for node in self.goals.values() {
            if node.progress > 100 {
                return Err(GoalError::invalid(node.id, "progress above 100"));
            }
            if node.completed != (node.progress == 100) {
                return Err(GoalError::invalid(node.id, "completed flag disagrees with progress"));
            }

            let mut tasks = HashSet::new();
            if !node.task_ids.iter().all(|t| tasks.insert(t)) {
                return Err(GoalError::invalid(node.id, "duplicate linked task"));
            }

            let mut children = HashSet::new();
            for child in &node.children {
                if !children.insert(child) {
                    return Err(GoalError::invalid(node.id, format!("child {} listed twice", child)));
                }
                let child_node = self.goals.get(child).ok_or_else(|| {
                    GoalError::invalid(node.id, format!("dangling child {}", child))
                })?;
                if child_node.parent_id != Some(node.id) {
                    return Err(GoalError::invalid(
                        *child,
                        format!("listed under {} but parent_id disagrees", node.id),
                    ));
                }
            }

            match node.parent_id {
                Some(parent) => {
                    let listed = self
                        .goals
                        .get(&parent)
                        .is_some_and(|p| p.children.contains(&node.id));
                    if !listed {
                        return Err(GoalError::invalid(
                            node.id,
                            format!("parent {} does not list this goal as a child", parent),
                        ));
                    }
                }
                None => {
                    if !seen_roots.contains(&node.id) {
                        return Err(GoalError::invalid(node.id, "parentless goal missing from root index"));
                    }
                }
            }
        }

        // With links bidirectional, any cycle is a parent chain that never
        // reaches a root.
        for id in self.goals.keys() {
            let mut cursor = self.goals.get(id).and_then(|n| n.parent_id);
            let mut steps = 0;
            while let Some(ancestor) = cursor {
                steps += 1;
                if ancestor == *id || steps > self.goals.len() {
                    return Err(GoalError::invalid(*id, "goal is its own descendant"));
                }
                cursor = self.goals.get(&ancestor).and_then(|n| n.parent_id);
            }
        }
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────

    fn node(&self, id: GoalId) -> Result<&GoalNode, GoalError> {
        self.goals.get(&id).ok_or(GoalError::NotFound(id))
    }

    fn node_mut(&mut self, id: GoalId) -> Result<&mut GoalNode, GoalError> {
        self.goals.get_mut(&id).ok_or(GoalError::NotFound(id))
    }

    /// Unhook `child` from its current parent (or the root index).
    fn detach(&mut self, child: GoalId, parent: Option<GoalId>, now: DateTime<Utc>) {
        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.goals.get_mut(&parent_id) {
                    parent_node.children.retain(|c| *c != child);
                    parent_node.updated_at = now;
                }
            }
            None => self.roots.retain(|r| *r != child),
        }
    }

    /// Recompute `start` from its children, then walk up the parent chain.
    fn reaggregate(&mut self, start: Option<GoalId>, now: DateTime<Utc>) -> Vec<ProgressChange> {
        let mut changes = Vec::new();
        let mut cursor = start;
        let mut steps = 0;

        while let Some(id) = cursor {
            steps += 1;
            if steps > self.goals.len() {
                break;
            }
            let Some(node) = self.goals.get(&id) else {
                break;
            };
            if self.config.progress_precedence == ProgressPrecedence::TaskLinks
                && node.has_linked_tasks()
            {
                tracing::debug!(goal_id = %id, "rollup stopped at task-linked goal");
                break;
            }
            let Some(mean) = mean_progress(
                node.children
                    .iter()
                    .filter_map(|c| self.goals.get(c))
                    .map(|c| c.progress),
            ) else {
                break;
            };
            let prior = node.progress;
            let parent = node.parent_id;

            if mean == prior && self.config.stop_when_unchanged {
                break;
            }
            if let Some(node) = self.goals.get_mut(&id) {
                node.apply_progress(mean, now);
            }
            if mean != prior {
                tracing::debug!(goal_id = %id, from = prior, to = mean, "progress rolled up");
                changes.push(ProgressChange {
                    goal_id: id,
                    from: prior,
                    to: mean,
                    source: ProgressSource::Rollup,
                });
            }
            cursor = parent;
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest() -> GoalForest {
        GoalForest::new(EngineConfig::default())
    }

    fn goal(forest: &mut GoalForest, title: &str, parent: Option<GoalId>) -> GoalId {
        forest.create_goal(NewGoal::new(title), parent).unwrap().id
    }

    fn progress(forest: &GoalForest, id: GoalId) -> u8 {
        forest.get_node(id).unwrap().progress
    }

    #[test]
    fn create_root_and_child() {
        let mut f = forest();
        let root = goal(&mut f, "Learn React", None);
        let child = goal(&mut f, "Learn Hooks", Some(root));

        assert_eq!(f.root_ids(), &[root]);
        assert_eq!(f.get_node(root).unwrap().children, vec![child]);
        assert_eq!(f.get_node(child).unwrap().parent_id, Some(root));
        f.check_invariants().unwrap();
    }

    #[test]
    fn create_under_unknown_parent_fails_without_side_effects() {
        let mut f = forest();
        let missing = GoalId::new();
        let result = f.create_goal(NewGoal::new("Orphan"), Some(missing));
        assert!(matches!(result, Err(GoalError::NotFound(id)) if id == missing));
        assert!(f.is_empty());
    }

    #[test]
    fn create_rejects_blank_title() {
        let mut f = forest();
        assert!(matches!(
            f.create_goal(NewGoal::new("  "), None),
            Err(GoalError::Validation(_))
        ));
    }

    #[test]
    fn create_clamps_progress_and_dedupes_tasks() {
        let mut f = forest();
        let node = f
            .create_goal(
                NewGoal::new("Done already")
                    .with_progress(140)
                    .with_task("t1")
                    .with_task("t1"),
                None,
            )
            .unwrap();
        assert_eq!(node.progress, 100);
        assert!(node.completed);
        assert_eq!(node.task_ids, vec![TaskId::new("t1")]);
    }

    #[test]
    fn display_defaults_only_fill_gaps() {
        let mut f = forest();
        let node = f
            .create_goal(NewGoal::new("Run").with_icon("🏃"), None)
            .unwrap();
        assert_eq!(node.icon.as_deref(), Some("🏃"));
        assert!(node.color.is_some());

        let mut plain = GoalForest::new(EngineConfig {
            assign_display_defaults: false,
            ..EngineConfig::default()
        });
        let node = plain.create_goal(NewGoal::new("Run"), None).unwrap();
        assert!(node.icon.is_none());
        assert!(node.color.is_none());
    }

    #[test]
    fn update_merges_scalars_only() {
        let mut f = forest();
        let root = goal(&mut f, "Fitness", None);
        let child = goal(&mut f, "Cardio", Some(root));

        let updated = f
            .update_goal(
                root,
                GoalPatch::new()
                    .title("Get fit")
                    .description(Some("health".into()))
                    .note("start slow"),
            )
            .unwrap();
        assert_eq!(updated.title, "Get fit");
        assert_eq!(updated.description.as_deref(), Some("health"));
        assert_eq!(updated.notes, vec!["start slow".to_string()]);
        assert_eq!(updated.children, vec![child]);

        let cleared = f
            .update_goal(root, GoalPatch::new().description(None).note("be consistent"))
            .unwrap();
        assert!(cleared.description.is_none());
        assert_eq!(cleared.notes.len(), 2);
    }

    #[test]
    fn update_validates_before_writing() {
        let mut f = forest();
        let root = goal(&mut f, "Fitness", None);
        let before = f.get_node(root).unwrap().clone();

        let result = f.update_goal(root, GoalPatch::new().title(" ").note("kept?"));
        assert!(matches!(result, Err(GoalError::Validation(_))));
        assert_eq!(f.get_node(root).unwrap(), &before);

        assert!(matches!(
            f.update_goal(GoalId::new(), GoalPatch::new()),
            Err(GoalError::NotFound(_))
        ));
    }

    #[test]
    fn add_note_rejects_blank() {
        let mut f = forest();
        let root = goal(&mut f, "Read", None);
        assert_eq!(f.add_note(root, "chapter 1").unwrap().notes.len(), 1);
        assert!(f.add_note(root, "").is_err());
    }

    #[test]
    fn rollup_uses_rounded_mean() {
        let mut f = forest();
        let root = goal(&mut f, "Parent", None);
        let a = goal(&mut f, "A", Some(root));
        let b = goal(&mut f, "B", Some(root));

        f.set_progress(b, 100).unwrap();
        assert_eq!(progress(&f, root), 50);

        let c = goal(&mut f, "C", Some(root));
        f.set_progress(a, 33).unwrap();
        f.set_progress(b, 33).unwrap();
        f.set_progress(c, 34).unwrap();
        assert_eq!(progress(&f, root), 33);

        f.set_progress(a, 40).unwrap();
        f.set_progress(b, 60).unwrap();
        f.set_progress(c, 100).unwrap();
        assert_eq!(progress(&f, root), 67);
        assert!(!f.get_node(root).unwrap().completed);
    }

    #[test]
    fn rollup_reaches_every_ancestor() {
        let mut f = forest();
        let top = goal(&mut f, "Top", None);
        let mid = goal(&mut f, "Mid", Some(top));
        let leaf = goal(&mut f, "Leaf", Some(mid));

        let changes = f.set_progress(leaf, 100).unwrap();
        assert_eq!(progress(&f, mid), 100);
        assert_eq!(progress(&f, top), 100);
        assert!(f.get_node(top).unwrap().completed);

        let sources: Vec<_> = changes.iter().map(|c| (c.goal_id, c.source)).collect();
        assert_eq!(
            sources,
            vec![
                (leaf, ProgressSource::Direct),
                (mid, ProgressSource::Rollup),
                (top, ProgressSource::Rollup),
            ]
        );
    }

    #[test]
    fn rollup_stops_when_value_is_unchanged() {
        let mut f = forest();
        let top = goal(&mut f, "Top", None);
        let mid = goal(&mut f, "Mid", Some(top));
        let a = goal(&mut f, "A", Some(mid));
        let b = goal(&mut f, "B", Some(mid));

        f.set_progress(a, 50).unwrap();
        f.set_progress(b, 50).unwrap();
        assert_eq!(progress(&f, mid), 50);
        let top_stamp = f.get_node(top).unwrap().updated_at;

        // Mean of mid stays 50, so top is not revisited.
        let changes = f.set_progress(a, 49).unwrap();
        f.set_progress(b, 51).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(progress(&f, mid), 50);
        assert_eq!(f.get_node(top).unwrap().updated_at, top_stamp);
    }

    #[test]
    fn rollup_continues_past_unchanged_ancestor_when_configured() {
        let mut f = GoalForest::new(EngineConfig {
            stop_when_unchanged: false,
            ..EngineConfig::default()
        });
        let top = goal(&mut f, "Top", None);
        let mid = goal(&mut f, "Mid", Some(top));
        let a = goal(&mut f, "A", Some(mid));
        let b = goal(&mut f, "B", Some(mid));

        f.set_progress(a, 50).unwrap();
        f.set_progress(b, 50).unwrap();
        let top_stamp = f.get_node(top).unwrap().updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));

        // Mid and top keep their values but are still revisited.
        let changes = f.set_progress(a, 49).unwrap();
        f.set_progress(b, 51).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(progress(&f, mid), 50);
        assert_eq!(progress(&f, top), 50);
        assert!(f.get_node(top).unwrap().updated_at > top_stamp);
    }

    #[test]
    fn create_reports_parent_rollup() {
        let mut f = forest();
        let root = goal(&mut f, "Root", None);
        let first = goal(&mut f, "First", Some(root));
        f.set_progress(first, 100).unwrap();
        assert!(f.get_node(root).unwrap().completed);

        let outcome = f
            .create_goal_with_rollup(NewGoal::new("Second"), Some(root))
            .unwrap();
        assert_eq!(
            outcome.rollup,
            vec![ProgressChange {
                goal_id: root,
                from: 100,
                to: 50,
                source: ProgressSource::Rollup,
            }]
        );
        assert!(!f.get_node(root).unwrap().completed);

        let root_level = f.create_goal_with_rollup(NewGoal::new("Other"), None).unwrap();
        assert!(root_level.rollup.is_empty());
    }

    #[test]
    fn create_trims_task_ids_and_rejects_blank_ones() {
        let mut f = forest();
        let node = f
            .create_goal(NewGoal::new("G").with_task(" t1 ").with_task("t1"), None)
            .unwrap();
        assert_eq!(node.task_ids, vec![TaskId::new("t1")]);

        let before = f.snapshot();
        let result = f.create_goal(NewGoal::new("H").with_task("   "), None);
        assert!(matches!(result, Err(GoalError::Validation(_))));
        assert_eq!(f.snapshot(), before);
    }

    #[test]
    fn create_rejects_blank_notes() {
        let mut f = forest();
        let mut fields = NewGoal::new("G");
        fields.notes = vec!["keep going".into(), "  ".into()];

        let result = f.create_goal(fields, None);
        assert!(matches!(result, Err(GoalError::Validation(_))));
        assert!(f.is_empty());
    }

    #[test]
    fn set_progress_clamps_and_reports_not_found() {
        let mut f = forest();
        let id = goal(&mut f, "Solo", None);
        f.set_progress(id, -5).unwrap();
        assert_eq!(progress(&f, id), 0);
        f.set_progress(id, 1000).unwrap();
        assert_eq!(progress(&f, id), 100);
        assert!(f.get_node(id).unwrap().completed);
        assert!(matches!(
            f.set_progress(GoalId::new(), 10),
            Err(GoalError::NotFound(_))
        ));
    }

    #[test]
    fn task_linked_ancestor_is_not_overwritten_by_rollup() {
        let mut f = forest();
        let root = goal(&mut f, "Root", None);
        let child = goal(&mut f, "Child", Some(root));
        f.link_task(root, TaskId::new("t1")).unwrap();
        f.set_progress(root, 20).unwrap();

        f.set_progress(child, 100).unwrap();
        assert_eq!(progress(&f, root), 20);
    }

    #[test]
    fn children_precedence_lets_rollup_win() {
        let mut f = GoalForest::new(EngineConfig {
            progress_precedence: ProgressPrecedence::Children,
            ..EngineConfig::default()
        });
        let root = goal(&mut f, "Root", None);
        let child = goal(&mut f, "Child", Some(root));
        f.link_task(root, TaskId::new("t1")).unwrap();

        f.set_progress(child, 100).unwrap();
        assert_eq!(progress(&f, root), 100);
    }

    #[test]
    fn delete_removes_whole_subtree() {
        let mut f = forest();
        let keep = goal(&mut f, "Keep", None);
        let root = goal(&mut f, "Root", None);
        let a = goal(&mut f, "A", Some(root));
        let b = goal(&mut f, "B", Some(root));
        let a1 = goal(&mut f, "A1", Some(a));
        let a2 = goal(&mut f, "A2", Some(a));

        let outcome = f.delete_goal(root).unwrap();
        assert_eq!(outcome.removed, vec![root, a, a1, a2, b]);
        assert_eq!(f.len(), 1);
        assert_eq!(f.root_ids(), &[keep]);
        f.check_invariants().unwrap();

        assert!(matches!(f.delete_goal(root), Err(GoalError::NotFound(_))));
    }

    #[test]
    fn delete_reaggregates_former_parent() {
        let mut f = forest();
        let root = goal(&mut f, "Root", None);
        let done = goal(&mut f, "Done", Some(root));
        let todo = goal(&mut f, "Todo", Some(root));
        f.set_progress(done, 100).unwrap();
        assert_eq!(progress(&f, root), 50);

        let outcome = f.delete_goal(todo).unwrap();
        assert_eq!(progress(&f, root), 100);
        assert_eq!(outcome.rollup.len(), 1);
        assert!(f.get_node(root).unwrap().completed);
    }

    #[test]
    fn delete_leaves_parent_stale_when_restructure_rollup_disabled() {
        let mut f = GoalForest::new(EngineConfig {
            rollup_on_restructure: false,
            ..EngineConfig::default()
        });
        let root = goal(&mut f, "Root", None);
        let done = goal(&mut f, "Done", Some(root));
        let todo = goal(&mut f, "Todo", Some(root));
        f.set_progress(done, 100).unwrap();

        f.delete_goal(todo).unwrap();
        assert_eq!(progress(&f, root), 50);
    }

    #[test]
    fn last_child_removal_keeps_parent_value() {
        let mut f = forest();
        let root = goal(&mut f, "Root", None);
        let only = goal(&mut f, "Only", Some(root));
        f.set_progress(only, 80).unwrap();

        f.delete_goal(only).unwrap();
        assert_eq!(progress(&f, root), 80);
    }

    #[test]
    fn add_child_reparents_and_rolls_up_both_sides() {
        let mut f = forest();
        let old = goal(&mut f, "Old", None);
        let new = goal(&mut f, "New", None);
        let stay = goal(&mut f, "Stay", Some(old));
        let mover = goal(&mut f, "Mover", Some(old));
        f.set_progress(mover, 100).unwrap();
        assert_eq!(progress(&f, old), 50);

        f.add_child(new, mover).unwrap();
        assert_eq!(f.get_node(old).unwrap().children, vec![stay]);
        assert_eq!(f.get_node(new).unwrap().children, vec![mover]);
        assert_eq!(progress(&f, old), 0);
        assert_eq!(progress(&f, new), 100);
        f.check_invariants().unwrap();
    }

    #[test]
    fn add_child_promotes_root_out_of_root_index() {
        let mut f = forest();
        let a = goal(&mut f, "A", None);
        let b = goal(&mut f, "B", None);
        f.add_child(a, b).unwrap();
        assert_eq!(f.root_ids(), &[a]);
        // Idempotent when already attached.
        assert!(f.add_child(a, b).unwrap().is_empty());
        assert_eq!(f.get_node(a).unwrap().children, vec![b]);
    }

    #[test]
    fn add_child_rejects_cycles_without_changes() {
        let mut f = forest();
        let a = goal(&mut f, "A", None);
        let b = goal(&mut f, "B", None);
        f.add_child(a, b).unwrap();
        let c = goal(&mut f, "C", Some(b));
        let before = f.snapshot();

        assert!(matches!(f.add_child(b, a), Err(GoalError::InvalidOperation { .. })));
        assert!(matches!(f.add_child(c, a), Err(GoalError::InvalidOperation { .. })));
        assert!(matches!(f.add_child(a, a), Err(GoalError::InvalidOperation { .. })));
        assert!(matches!(
            f.add_child(a, GoalId::new()),
            Err(GoalError::InvalidOperation { .. })
        ));
        assert_eq!(f.snapshot(), before);
    }

    #[test]
    fn remove_child_demotes_to_root() {
        let mut f = forest();
        let root = goal(&mut f, "Root", None);
        let child = goal(&mut f, "Child", Some(root));

        f.remove_child(root, child).unwrap();
        assert!(f.get_node(child).unwrap().is_root());
        assert_eq!(f.root_ids(), &[root, child]);
        assert!(f.get_node(root).unwrap().children.is_empty());

        assert!(matches!(
            f.remove_child(root, child),
            Err(GoalError::InvalidOperation { .. })
        ));
        assert!(matches!(
            f.remove_child(GoalId::new(), child),
            Err(GoalError::NotFound(_))
        ));
        f.check_invariants().unwrap();
    }

    #[test]
    fn link_and_unlink_report_actual_changes() {
        let mut f = forest();
        let id = goal(&mut f, "Tasks", None);
        assert!(f.link_task(id, TaskId::new("t1")).unwrap());
        assert!(!f.link_task(id, TaskId::new("t1")).unwrap());

        let stamp = f.get_node(id).unwrap().updated_at;
        assert!(!f.unlink_task(id, &TaskId::new("nope")).unwrap());
        assert_eq!(f.get_node(id).unwrap().updated_at, stamp);

        assert!(f.unlink_task(id, &TaskId::new("t1")).unwrap());
        assert!(f.get_node(id).unwrap().task_ids.is_empty());
        assert!(matches!(
            f.link_task(GoalId::new(), TaskId::new("t")),
            Err(GoalError::NotFound(_))
        ));
    }

    #[test]
    fn queries_follow_display_order() {
        let mut f = forest();
        let r1 = goal(&mut f, "R1", None);
        let r2 = goal(&mut f, "R2", None);
        let c1 = goal(&mut f, "C1", Some(r1));
        let c2 = goal(&mut f, "C2", Some(r1));
        let g = goal(&mut f, "G", Some(c2));

        let roots: Vec<_> = f.get_roots().iter().map(|n| n.id).collect();
        assert_eq!(roots, vec![r1, r2]);
        let kids: Vec<_> = f.get_children(r1).unwrap().iter().map(|n| n.id).collect();
        assert_eq!(kids, vec![c1, c2]);
        assert_eq!(f.descendants(r1).unwrap(), vec![c1, c2, g]);
        assert_eq!(f.ancestors(g).unwrap(), vec![c2, r1]);
        assert!(f.is_ancestor(r1, g));
        assert!(!f.is_ancestor(g, r1));
        assert!(matches!(f.get_children(GoalId::new()), Err(GoalError::NotFound(_))));
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let mut f = forest();
        let root = goal(&mut f, "Root", None);
        goal(&mut f, "Child", Some(root));

        let state = f.snapshot();
        let json = serde_json::to_string(&state).unwrap();
        let restored =
            GoalForest::restore(serde_json::from_str(&json).unwrap(), EngineConfig::default())
                .unwrap();
        assert_eq!(restored.snapshot(), state);
    }

    #[test]
    fn restore_rejects_dangling_child() {
        let mut f = forest();
        let root = goal(&mut f, "Root", None);
        let mut state = f.snapshot();
        state.goals[0].children.push(GoalId::new());

        let result = GoalForest::restore(state, EngineConfig::default());
        assert!(matches!(result, Err(GoalError::InvalidOperation { goal_id, .. }) if goal_id == root));
    }

    #[test]
    fn restore_rejects_cycle_and_bad_completion() {
        let mut f = forest();
        let a = goal(&mut f, "A", None);
        let b = goal(&mut f, "B", Some(a));

        // a <-> b with neither in the root index.
        let mut state = f.snapshot();
        state.root_ids.clear();
        for node in &mut state.goals {
            if node.id == a {
                node.parent_id = Some(b);
            } else {
                node.children.push(a);
            }
        }
        assert!(GoalForest::restore(state, EngineConfig::default()).is_err());

        let mut state = f.snapshot();
        state.goals[0].completed = true;
        assert!(GoalForest::restore(state, EngineConfig::default()).is_err());
    }

    #[test]
    fn restore_rejects_parented_root() {
        let mut f = forest();
        let a = goal(&mut f, "A", None);
        let b = goal(&mut f, "B", Some(a));
        let mut state = f.snapshot();
        state.root_ids.push(b);
        assert!(GoalForest::restore(state, EngineConfig::default()).is_err());
    }

    #[test]
    fn restore_rejects_blank_title() {
        let mut f = forest();
        let a = goal(&mut f, "A", None);
        let mut state = f.snapshot();
        state.goals[0].title = "   ".into();

        let result = GoalForest::restore(state, EngineConfig::default());
        assert!(matches!(result, Err(GoalError::InvalidOperation { goal_id, .. }) if goal_id == a));
    }
}
