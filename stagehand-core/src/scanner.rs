//! Repository scanner for discovering workspace manifests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};
use crate::graph::WorkspaceGraph;
use crate::manifest::{Manifest, Workspace, MANIFEST_FILE};

/// Discovers `stagehand.toml` manifests under a repository root and builds
/// workspaces from them. The manifest at the root itself becomes the root
/// workspace; its presence is required.
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Parses every discovered manifest into a [`Workspace`].
    ///
    /// # Errors
    ///
    /// Fails when the root manifest is missing, a manifest does not parse,
    /// or two workspaces declare the same name.
    pub fn scan(&self) -> Result<Vec<Workspace>> {
        if !self.root.join(MANIFEST_FILE).is_file() {
            return Err(Error::RootManifestMissing(self.root.clone()));
        }

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut workspaces = Vec::new();

        let entries = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| !is_skipped(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == MANIFEST_FILE);

        for entry in entries {
            let manifest_path = entry.path();
            let dir = manifest_path
                .parent()
                .unwrap_or(&self.root);
            let location = dir
                .strip_prefix(&self.root)
                .map(|p| p.to_path_buf())
                .unwrap_or_default();

            let raw = std::fs::read_to_string(manifest_path)?;
            let manifest: Manifest = toml::from_str(&raw)
                .map_err(|e| Error::toml(e, manifest_path.display().to_string()))?;

            if let Some(first) = seen.get(&manifest.name) {
                return Err(Error::DuplicateWorkspace {
                    name: manifest.name,
                    first: first.display().to_string(),
                    second: location.display().to_string(),
                });
            }
            seen.insert(manifest.name.clone(), location.clone());

            workspaces.push(Workspace::new(&self.root, location, manifest));
        }

        Ok(workspaces)
    }

    /// Scans and builds the workspace graph in one step.
    pub fn graph(&self) -> Result<WorkspaceGraph> {
        WorkspaceGraph::new(self.scan()?)
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "target" || name == "node_modules"
}
