// config.rs — Where the CLI keeps its state.
//
// Everything lives under a `.gf/` directory in the project root:
//   .gf/config.toml   engine switches (optional)
//   .gf/forest.json   the persisted forest snapshot
//   .gf/events.jsonl  append-only event log

use std::path::{Path, PathBuf};

use gf_goal::{
    EngineConfig, EventDispatcher, ForestFileStore, GoalService, LogSink,
};

#[derive(Debug, Clone)]
pub struct CliPaths {
    pub config_file: PathBuf,
    pub forest_file: PathBuf,
    pub events_log: PathBuf,
}

impl CliPaths {
    /// Standard `.gf/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let gf_dir = project_root.as_ref().join(".gf");
        Self {
            config_file: gf_dir.join("config.toml"),
            forest_file: gf_dir.join("forest.json"),
            events_log: gf_dir.join("events.jsonl"),
        }
    }
}

/// A loaded forest plus the store it came from.
pub struct Session {
    pub service: GoalService,
    store: ForestFileStore,
}

impl Session {
    pub fn open(paths: &CliPaths) -> anyhow::Result<Self> {
        let config = EngineConfig::load_or_default(&paths.config_file);
        let store = ForestFileStore::new(&paths.forest_file)?;
        let forest = store.open_forest(config)?;

        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(LogSink::new(&paths.events_log)));

        tracing::debug!(goals = forest.len(), "forest loaded");
        Ok(Self {
            service: GoalService::with_dispatcher(forest, dispatcher),
            store,
        })
    }

    /// Persist the current forest back to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        self.store.save(&self.service.snapshot()?)?;
        Ok(())
    }
}
