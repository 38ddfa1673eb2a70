// sync.rs — Reconcile task-linked goals against a JSON task export.

use std::path::Path;

use anyhow::Context;
use gf_goal::TaskSnapshot;

use crate::config::{CliPaths, Session};

pub fn execute(tasks_file: &Path, paths: &CliPaths) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(tasks_file)
        .with_context(|| format!("failed to read {}", tasks_file.display()))?;
    let snapshot: Vec<TaskSnapshot> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of task snapshots", tasks_file.display()))?;

    let session = Session::open(paths)?;
    let changed = session.service.reconcile(&snapshot)?;
    session.save()?;

    tracing::info!(tasks = snapshot.len(), changed = changed.len(), "sync complete");
    if changed.is_empty() {
        println!("All task-linked goals are up to date.");
        return Ok(());
    }

    println!("Updated {} goal(s):", changed.len());
    for id in &changed {
        if let Some(goal) = session.service.get_node(&id.to_string())? {
            println!("  {:<38} {:>3}%  {}", goal.id, goal.progress, goal.title);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gf_goal::NewGoal;
    use tempfile::TempDir;

    #[test]
    fn sync_sets_progress_from_task_file() {
        let project = TempDir::new().unwrap();
        let paths = CliPaths::for_project(project.path());

        let session = Session::open(&paths).unwrap();
        let goal = session
            .service
            .create_goal(NewGoal::new("Ship").with_task("a").with_task("b"), None)
            .unwrap();
        session.save().unwrap();

        let tasks_file = project.path().join("tasks.json");
        std::fs::write(
            &tasks_file,
            r#"[{"task_id":"a","completed":true},{"task_id":"b","completed":false}]"#,
        )
        .unwrap();

        execute(&tasks_file, &paths).unwrap();

        let session = Session::open(&paths).unwrap();
        let reloaded = session.service.get_node(&goal.id.to_string()).unwrap().unwrap();
        assert_eq!(reloaded.progress, 50);
    }

    #[test]
    fn malformed_task_file_is_an_error() {
        let project = TempDir::new().unwrap();
        let paths = CliPaths::for_project(project.path());
        let tasks_file = project.path().join("tasks.json");
        std::fs::write(&tasks_file, "{not json").unwrap();

        assert!(execute(&tasks_file, &paths).is_err());
        assert!(execute(&project.path().join("missing.json"), &paths).is_err());
    }
}
