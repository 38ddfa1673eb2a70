// goal_lifecycle.rs — End-to-end scenarios through the public API.
//
// Walks a realistic goal plan from creation to completion the way a
// presentation layer would drive it: string ids through GoalService,
// task completion pulled in by reconciliation, the forest persisted and
// reopened between sessions, and events captured in a JSONL log.

use std::fs;

use chrono::{Duration, Utc};
use tempfile::tempdir;

use gf_goal::{
    EngineConfig, EventDispatcher, ForestFileStore, GoalError, GoalForest, GoalPatch,
    GoalService, GoalStatus, LogSink, NewGoal, TaskSnapshot,
};

#[test]
fn plan_from_creation_to_completion() {
    let dir = tempdir().unwrap();
    let store = ForestFileStore::new(dir.path().join(".gf").join("forest.json")).unwrap();
    let events_path = dir.path().join(".gf").join("events.jsonl");

    let mut dispatcher = EventDispatcher::new();
    dispatcher.add_sink(Box::new(LogSink::new(&events_path)));
    let svc = GoalService::with_dispatcher(
        store.open_forest(EngineConfig::default()).unwrap(),
        dispatcher,
    );

    // Session 1: lay out the plan.
    let react = svc
        .create_goal(
            NewGoal::new("Learn React")
                .with_description("Master React fundamentals")
                .with_deadline(Utc::now() + Duration::days(90)),
            None,
        )
        .unwrap();
    let react_id = react.id.to_string();
    let hooks = svc
        .create_goal(NewGoal::new("Learn Hooks"), Some(react_id.as_str()))
        .unwrap()
        .id
        .to_string();
    let context = svc
        .create_goal(NewGoal::new("Learn Context API"), Some(react_id.as_str()))
        .unwrap()
        .id
        .to_string();
    let perf = svc
        .create_goal(NewGoal::new("Performance"), Some(react_id.as_str()))
        .unwrap()
        .id
        .to_string();

    svc.link_task(&hooks, "task-1").unwrap();
    svc.link_task(&hooks, "task-2").unwrap();
    svc.set_progress(&context, 50.0).unwrap();
    svc.set_progress(&perf, 25.0).unwrap();
    svc.update_goal(&react_id, GoalPatch::new().note("Focus on hooks"))
        .unwrap();

    store.save(&svc.snapshot().unwrap()).unwrap();

    // Session 2: reopen and sync task completion.
    let svc = GoalService::new(store.open_forest(EngineConfig::default()).unwrap());
    let changed = svc
        .reconcile(&[
            TaskSnapshot::new("task-1", true),
            TaskSnapshot::new("task-2", true),
            TaskSnapshot::new("unrelated", false),
        ])
        .unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].to_string(), hooks);

    // (100 + 50 + 25) / 3 = 58.33
    let react = svc.get_node(&react_id).unwrap().unwrap();
    assert_eq!(react.progress, 58);
    assert_eq!(react.notes, vec!["Focus on hooks".to_string()]);

    let summary = svc.get_progress_summary(&react_id).unwrap();
    assert_eq!(summary.total_descendants, 3);
    assert_eq!(summary.completed_descendants, 1);
    assert_eq!(summary.status, GoalStatus::InProgress);

    // Finish the remaining sub-goals.
    svc.set_progress(&context, 100.0).unwrap();
    svc.set_progress(&perf, 100.0).unwrap();
    let react = svc.get_node(&react_id).unwrap().unwrap();
    assert_eq!(react.progress, 100);
    assert!(react.completed);

    let overview = svc.overview(Utc::now(), 3).unwrap();
    assert_eq!(overview.total_goals, 4);
    assert_eq!(overview.completed_goals, 4);
    assert!(overview.upcoming_deadlines.is_empty());

    let log = fs::read_to_string(&events_path).unwrap();
    assert!(log.contains("task_linked"));
    assert!(log.contains("goal_updated"));
}

#[test]
fn cascading_delete_leaves_no_dangling_ids() {
    let mut forest = GoalForest::default();
    let keep = forest.create_goal(NewGoal::new("Keep"), None).unwrap().id;
    let keep_child = forest.create_goal(NewGoal::new("Keep child"), Some(keep)).unwrap().id;
    let target = forest.create_goal(NewGoal::new("Target"), None).unwrap().id;

    let mut descendants = 0;
    for i in 0..3 {
        let mid = forest
            .create_goal(NewGoal::new(format!("mid {}", i)), Some(target))
            .unwrap()
            .id;
        descendants += 1;
        for j in 0..2 {
            forest
                .create_goal(NewGoal::new(format!("leaf {}-{}", i, j)), Some(mid))
                .unwrap();
            descendants += 1;
        }
    }

    let before = forest.len();
    let outcome = forest.delete_goal(target).unwrap();
    assert_eq!(outcome.removed.len(), descendants + 1);
    assert_eq!(forest.len(), before - (descendants + 1));

    for goal in forest.iter() {
        for child in &goal.children {
            assert!(forest.get_node(*child).is_some());
        }
    }
    assert_eq!(forest.root_ids(), &[keep]);
    assert_eq!(forest.get_node(keep).unwrap().children, vec![keep_child]);
    forest.check_invariants().unwrap();
}

#[test]
fn cycle_attempt_is_rejected_and_forest_unchanged() {
    let svc = GoalService::new(GoalForest::default());
    let a = svc.create_goal(NewGoal::new("A"), None).unwrap().id.to_string();
    let b = svc.create_goal(NewGoal::new("B"), None).unwrap().id.to_string();

    svc.add_child(&a, &b).unwrap();
    let before = svc.snapshot().unwrap();
    let result = svc.add_child(&b, &a);
    assert!(matches!(result, Err(GoalError::InvalidOperation { .. })));
    assert_eq!(svc.snapshot().unwrap(), before);
}

#[test]
fn idempotent_unlink_keeps_timestamp() {
    let svc = GoalService::new(GoalForest::default());
    let g = svc.create_goal(NewGoal::new("G"), None).unwrap();
    let id = g.id.to_string();

    assert!(!svc.unlink_task(&id, "never-linked").unwrap());
    assert_eq!(svc.get_node(&id).unwrap().unwrap().updated_at, g.updated_at);
}

#[test]
fn unknown_ids_surface_as_not_found() {
    let svc = GoalService::new(GoalForest::default());
    let ghost = gf_goal::GoalId::new().to_string();
    assert!(matches!(svc.delete_goal(&ghost), Err(GoalError::NotFound(_))));
    assert!(matches!(
        svc.set_progress(&ghost, 10.0),
        Err(GoalError::NotFound(_))
    ));
    assert!(matches!(
        svc.link_task(&ghost, "t"),
        Err(GoalError::NotFound(_))
    ));
    assert!(matches!(
        svc.create_goal(NewGoal::new("x"), Some(ghost.as_str())),
        Err(GoalError::NotFound(_))
    ));
    assert!(svc.get_node(&ghost).unwrap().is_none());
}
