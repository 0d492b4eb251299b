//! Core library for monorepo lifecycle-task orchestration.

pub mod changes;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod matcher;
pub mod runner;
pub mod scanner;
pub mod scheduler;
pub mod spec;
pub mod tasks;

pub use changes::{ChangeProvider, ChangeSet, GitChanges};
pub use error::{Error, Result};
pub use graph::WorkspaceGraph;
pub use manifest::{Manifest, Workspace};
pub use runner::{ProcessRunner, SubprocessRunner, TaskOutcome};
pub use scanner::Scanner;
pub use scheduler::{ScheduleOptions, ScheduleOutcome, TaskScheduler};
pub use spec::{SpecContext, TaskSpec};
pub use tasks::{Lifecycle, MatchedTask, TaskConfig, TaskEntry, Tasks};
