//! Resolved, executable task specifications.

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::manifest::Workspace;
use crate::tasks::TaskEntry;

/// Placeholder substituted with the space-joined affected workspace names.
pub const WORKSPACES_TOKEN: &str = "${workspaces}";

/// Leading token meaning "invoke the running CLI itself".
pub const SELF_TOKEN: &str = "$0";

/// A fully resolved, executable representation of a matched task. Created
/// fresh per invocation, consumed by execution, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSpec {
    /// Human-readable label.
    pub name: String,
    /// Program to invoke.
    pub cmd: String,
    pub args: Vec<String>,
    /// Working directory relative to the repository root; `.` for the root
    /// workspace.
    pub cwd: String,
    /// Declared task metadata merged with the owning workspace's name and
    /// slug.
    pub meta: serde_json::Map<String, serde_json::Value>,
}

/// Ambient inputs to spec building, threaded explicitly rather than read
/// from process-global state.
#[derive(Debug, Clone)]
pub struct SpecContext {
    /// Name the CLI was invoked as; substituted into task labels.
    pub cli_name: String,
    /// Absolute path of the running entry point, used to resolve
    /// self-invocations.
    pub bin_path: PathBuf,
    pub dry_run: bool,
    pub verbosity: u8,
}

/// Builds the executable spec for a matched task.
///
/// The `${workspaces}` placeholder is substituted before the command is
/// tokenized on whitespace, so affected-workspace names containing spaces
/// do not survive the split. Known constraint.
pub fn build_spec(
    ctx: &SpecContext,
    workspace: &Workspace,
    task: &TaskEntry,
    affected_names: &[String],
) -> TaskSpec {
    let command = task.command();
    let substituted = command.replace(WORKSPACES_TOKEN, &affected_names.join(" "));

    let mut parts = substituted.split_whitespace();
    let head = parts.next().unwrap_or_default().to_string();
    let mut args: Vec<String> = parts.map(str::to_string).collect();

    let is_self = head == SELF_TOKEN;
    if ctx.dry_run {
        args.push("--dry-run".to_string());
    }
    if is_self && ctx.verbosity > 0 {
        args.push(format!("-{}", "v".repeat(ctx.verbosity as usize)));
    }

    let cmd = if is_self {
        relative_to(workspace.dir(), &ctx.bin_path)
    } else {
        head
    };

    let label = if command.starts_with(SELF_TOKEN) {
        command.replacen(SELF_TOKEN, &ctx.cli_name, 1)
    } else {
        command.to_string()
    };

    let mut meta = task.meta().cloned().unwrap_or_default();
    meta.insert(
        "name".to_string(),
        serde_json::Value::String(workspace.name().to_string()),
    );
    meta.insert(
        "slug".to_string(),
        serde_json::Value::String(slugify(workspace.name())),
    );

    TaskSpec {
        name: format!("Run `{}` in `{}`", label, workspace.name()),
        cmd,
        args,
        cwd: root_relative(workspace),
        meta,
    }
}

fn root_relative(workspace: &Workspace) -> String {
    let location = workspace.location().to_string_lossy();
    if location.is_empty() {
        ".".to_string()
    } else {
        location.replace('\\', "/")
    }
}

/// Path of `to` expressed relative to the directory `from`.
fn relative_to(from: &Path, to: &Path) -> String {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();

    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = from[common..].iter().map(|_| "..".to_string()).collect();
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().to_string()),
    );

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("static pattern"));

/// Collapses non-word-character runs to `-` and strips leading/trailing
/// dashes.
pub fn slugify(name: &str) -> String {
    NON_WORD
        .replace_all(name, "-")
        .trim_matches('-')
        .to_string()
}
