//! Command implementations for the CLI.

mod discovery;
mod tasks;

pub use discovery::{cmd_affected, cmd_graph};
pub use tasks::{cmd_tasks, TasksArgs};
