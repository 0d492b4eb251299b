//! Change sets between revisions and the git-backed provider.

use std::path::Path;

use git2::{Delta, DiffOptions, Repository, StatusOptions, Tree};
use serde::Serialize;

use crate::error::Result;

/// File paths changed between two revisions, split by kind of change.
/// Paths are repository-relative. Read-only input to task matching.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub moved: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    /// All four lists concatenated.
    pub fn all(&self) -> Vec<String> {
        self.added
            .iter()
            .chain(&self.modified)
            .chain(&self.moved)
            .chain(&self.deleted)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.modified.is_empty()
            && self.moved.is_empty()
            && self.deleted.is_empty()
    }

    /// The combined file list with paths matching any ignore glob removed.
    /// Ignore patterns that fail to compile are skipped with a warning.
    pub fn without_ignored(&self, ignore: &[String]) -> Vec<String> {
        let patterns: Vec<glob::Pattern> = ignore
            .iter()
            .filter_map(|raw| match glob::Pattern::new(raw) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("skipping invalid ignore pattern '{}': {}", raw, e);
                    None
                }
            })
            .collect();

        self.all()
            .into_iter()
            .filter(|file| !patterns.iter().any(|p| p.matches(file)))
            .collect()
    }
}

/// Source of changed files between two revision references.
pub trait ChangeProvider {
    fn modified_files(
        &self,
        from_ref: Option<&str>,
        through_ref: Option<&str>,
    ) -> Result<ChangeSet>;
}

/// Change provider backed by the repository's git history.
pub struct GitChanges {
    repo: Repository,
}

impl GitChanges {
    /// Discovers the repository containing `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::discover(path.as_ref())?;
        Ok(Self { repo })
    }

    /// Working-tree status, including untracked files, classified into a
    /// change set. Used when no base revision is given.
    fn status_changes(&self) -> Result<ChangeSet> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);

        let mut set = ChangeSet::default();
        for entry in self.repo.statuses(Some(&mut opts))?.iter() {
            let Some(path) = entry.path() else { continue };
            let status = entry.status();
            if status.is_wt_new() || status.is_index_new() {
                set.added.push(path.to_string());
            } else if status.is_wt_deleted() || status.is_index_deleted() {
                set.deleted.push(path.to_string());
            } else if status.is_wt_renamed() || status.is_index_renamed() {
                set.moved.push(path.to_string());
            } else if status.is_wt_modified()
                || status.is_index_modified()
                || status.is_wt_typechange()
                || status.is_index_typechange()
            {
                set.modified.push(path.to_string());
            }
        }
        Ok(set)
    }

    fn tree_for(&self, reference: &str) -> Result<Tree<'_>> {
        Ok(self.repo.revparse_single(reference)?.peel_to_commit()?.tree()?)
    }

    fn diff_changes(&self, from_ref: &str, through_ref: Option<&str>) -> Result<ChangeSet> {
        let old_tree = self.tree_for(from_ref)?;
        let new_tree = match through_ref {
            Some(reference) => self.tree_for(reference)?,
            None => self.repo.head()?.peel_to_commit()?.tree()?,
        };

        let mut opts = DiffOptions::new();
        let mut diff =
            self.repo
                .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))?;
        // Rename detection so moves are classified rather than reported as
        // a delete plus an add.
        diff.find_similar(None)?;

        let mut set = ChangeSet::default();
        for delta in diff.deltas() {
            let new_path = delta.new_file().path();
            let old_path = delta.old_file().path();
            let Some(path) = new_path.or(old_path) else { continue };
            let path = path.to_string_lossy().to_string();
            match delta.status() {
                Delta::Added | Delta::Copied => set.added.push(path),
                Delta::Deleted => set.deleted.push(path),
                Delta::Renamed => set.moved.push(path),
                Delta::Modified | Delta::Typechange => set.modified.push(path),
                _ => {}
            }
        }
        Ok(set)
    }
}

impl ChangeProvider for GitChanges {
    fn modified_files(
        &self,
        from_ref: Option<&str>,
        through_ref: Option<&str>,
    ) -> Result<ChangeSet> {
        match from_ref {
            Some(from) => self.diff_changes(from, through_ref),
            None => self.status_changes(),
        }
    }
}
