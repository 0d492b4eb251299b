//! File-change matching for collected tasks.

use std::path::Path;

use glob::MatchOptions;

use crate::tasks::TaskEntry;

/// Decides whether a task should run.
///
/// Pattern-less tasks (bare strings, or structured tasks without `match`)
/// are graph-driven: the result is exactly `force`. Tasks carrying a glob
/// are file-driven: they run iff at least one changed path matches the
/// glob joined to the workspace's directory, regardless of `force`. The
/// two conditions are mutually exclusive, never OR'd together.
pub fn should_run(
    force: bool,
    task: &TaskEntry,
    changed_files: &[String],
    workspace_cwd: &Path,
) -> bool {
    let Some(raw) = task.match_glob() else {
        return force;
    };

    let pattern = join_pattern(workspace_cwd, raw);
    match glob::Pattern::new(&pattern) {
        Ok(compiled) => {
            let options = MatchOptions {
                // `*` must not cross directory separators; `**` does.
                require_literal_separator: true,
                ..MatchOptions::new()
            };
            changed_files
                .iter()
                .any(|file| compiled.matches_with(file, options))
        }
        Err(e) => {
            tracing::warn!("invalid match pattern '{}': {}", pattern, e);
            false
        }
    }
}

/// Joins a task glob to its workspace's repo-relative directory. The root
/// workspace (empty or `.` location) leaves the glob untouched.
fn join_pattern(cwd: &Path, glob: &str) -> String {
    let cwd = cwd.to_string_lossy();
    if cwd.is_empty() || cwd == "." {
        glob.to_string()
    } else {
        format!("{}/{}", cwd.trim_end_matches('/'), glob)
    }
}
