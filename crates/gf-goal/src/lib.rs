//! # gf-goal
//!
//! Goal hierarchy and progress aggregation engine.
//!
//! Goals form a forest: each goal may be split into sub-goals, and a
//! parent's progress is the rounded mean of its children's. Goals may also
//! be linked to tasks owned by an external task store, whose completion
//! flags drive progress through reconciliation.
//!
//! ## Key components
//!
//! - [`GoalForest`]: the arena-backed store that owns every [`GoalNode`],
//!   enforces the forest invariants, and runs rollup and cascading delete
//! - [`TaskSyncAdapter`]: reconciles task-linked goals against a
//!   [`TaskSnapshot`] list supplied by the caller
//! - [`GoalService`]: thread-safe command/query façade over string ids
//! - [`ForestFileStore`]: JSON persistence of a [`ForestState`] snapshot
//! - [`GoalEvent`] / [`EventDispatcher`]: notifications for observers
//!
//! ## Quick Example
//!
//! ```rust
//! use gf_goal::{GoalForest, NewGoal};
//!
//! let mut forest = GoalForest::default();
//! let root = forest.create_goal(NewGoal::new("Get fit"), None).unwrap();
//! let cardio = forest.create_goal(NewGoal::new("Cardio"), Some(root.id)).unwrap();
//! forest.create_goal(NewGoal::new("Strength"), Some(root.id)).unwrap();
//!
//! forest.set_progress(cardio.id, 100).unwrap();
//! assert_eq!(forest.get_node(root.id).unwrap().progress, 50);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod forest;
pub mod node;
pub mod rollup;
pub mod service;
pub mod store;
pub mod summary;
pub mod sync;

pub use config::{EngineConfig, ProgressPrecedence};
pub use error::GoalError;
pub use events::{EventDispatcher, GoalEvent, LogSink, NotificationSink};
pub use forest::{CreateOutcome, DeleteOutcome, ForestState, GoalForest, ProgressChange, ProgressSource};
pub use node::{GoalId, GoalNode, GoalPatch, GoalStatus, NewGoal, TaskId};
pub use service::GoalService;
pub use store::ForestFileStore;
pub use summary::{ForestOverview, GoalBrief, ProgressSummary};
pub use sync::{ReconcileReport, TaskSnapshot, TaskSyncAdapter};
