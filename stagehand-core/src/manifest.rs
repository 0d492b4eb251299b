//! Workspace manifests and lazily-loaded task configuration.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::Result;
use crate::tasks::{TaskConfig, Tasks};

/// File name of the per-workspace manifest.
pub const MANIFEST_FILE: &str = "stagehand.toml";

/// File name of the per-workspace task configuration.
pub const TASKS_FILE: &str = "tasks.toml";

/// Workspace descriptor as defined in `stagehand.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Unique workspace name, optionally scoped (e.g. `@acme/web`).
    pub name: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "peer-dependencies")]
    pub peer_dependencies: BTreeMap<String, String>,
}

/// A single buildable unit within the monorepo.
///
/// Constructed once when the graph is built; immutable afterward except for
/// the task-configuration cache, which is populated at most once on first
/// read and never invalidated within an invocation.
#[derive(Debug)]
pub struct Workspace {
    name: String,
    location: PathBuf,
    dir: PathBuf,
    manifest: Manifest,
    is_root: bool,
    task_config: OnceCell<TaskConfig>,
}

impl Workspace {
    /// Creates a workspace rooted at `root` with a repo-relative `location`.
    /// The workspace at the empty location is the repository root itself.
    pub fn new(root: &Path, location: impl AsRef<Path>, manifest: Manifest) -> Self {
        let location = location.as_ref().to_path_buf();
        let dir = root.join(&location);
        let is_root = location.as_os_str().is_empty();
        Self {
            name: manifest.name.clone(),
            location,
            dir,
            manifest,
            is_root,
            task_config: OnceCell::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location relative to the repository root; empty for the root itself.
    #[inline]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Absolute directory of the workspace.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.manifest.private
    }

    pub fn dependencies(&self) -> &BTreeMap<String, String> {
        &self.manifest.dependencies
    }

    pub fn dev_dependencies(&self) -> &BTreeMap<String, String> {
        &self.manifest.dev_dependencies
    }

    pub fn peer_dependencies(&self) -> &BTreeMap<String, String> {
        &self.manifest.peer_dependencies
    }

    /// Declared aliases, plus the un-scoped short name when the workspace
    /// name is scoped.
    pub fn aliases(&self) -> SmallVec<[String; 4]> {
        let mut aliases: SmallVec<[String; 4]> =
            SmallVec::from_vec(self.manifest.aliases.clone());
        if let Some((_, short)) = self.name.split_once('/') {
            aliases.push(short.to_string());
        }
        aliases
    }

    /// The workspace's task configuration, loaded from `tasks.toml` on
    /// first access and cached for the rest of the invocation.
    ///
    /// A missing file or unparsable contents classifies as "absent or
    /// invalid" and yields the empty configuration, opting the workspace
    /// out of all lifecycles. Any other I/O failure propagates.
    pub fn task_config(&self) -> Result<&TaskConfig> {
        self.task_config
            .get_or_try_init(|| load_task_config(&self.dir))
    }

    /// Resolves the declared lanes for a lifecycle key; both lanes are
    /// empty when the key is absent.
    pub fn tasks_for(&self, key: &str) -> Result<Tasks> {
        Ok(self.task_config()?.get(key).cloned().unwrap_or_default())
    }
}

fn load_task_config(dir: &Path) -> Result<TaskConfig> {
    let path = dir.join(TASKS_FILE);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("no task configuration at {}", path.display());
            return Ok(TaskConfig::default());
        }
        Err(e) => return Err(e.into()),
    };

    match toml::from_str(&raw) {
        Ok(config) => Ok(config),
        Err(error) => {
            tracing::warn!(
                "ignoring invalid task configuration at {}: {}",
                path.display(),
                error
            );
            Ok(TaskConfig::default())
        }
    }
}
