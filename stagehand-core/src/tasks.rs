//! Task configuration schema and lifecycle keys.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single declared task: either a bare command string or a structured
/// record carrying an optional file-match glob and free-form metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskEntry {
    Command(String),
    Matched(MatchedTask),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedTask {
    /// Glob pattern, relative to the owning workspace, that selects the
    /// changed files this task cares about.
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_glob: Option<String>,
    pub cmd: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl TaskEntry {
    #[inline]
    pub fn command(&self) -> &str {
        match self {
            TaskEntry::Command(cmd) => cmd,
            TaskEntry::Matched(task) => &task.cmd,
        }
    }

    #[inline]
    pub fn match_glob(&self) -> Option<&str> {
        match self {
            TaskEntry::Command(_) => None,
            TaskEntry::Matched(task) => task.match_glob.as_deref(),
        }
    }

    pub fn meta(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            TaskEntry::Command(_) => None,
            TaskEntry::Matched(task) => Some(&task.meta),
        }
    }

    /// True for plain command strings, which are driven by graph membership
    /// rather than file changes.
    #[inline]
    pub fn is_bare(&self) -> bool {
        matches!(self, TaskEntry::Command(_))
    }
}

/// The two execution lanes a lifecycle key can declare tasks under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tasks {
    #[serde(default)]
    pub sequential: Vec<TaskEntry>,
    #[serde(default)]
    pub parallel: Vec<TaskEntry>,
}

impl Tasks {
    pub fn is_empty(&self) -> bool {
        self.sequential.is_empty() && self.parallel.is_empty()
    }
}

/// Per-workspace task configuration: lifecycle key to lanes.
///
/// Keys are kept as strings so user-extended custom events using the same
/// `pre-`/bare/`post-` convention can be declared alongside the standard
/// eighteen.
pub type TaskConfig = IndexMap<String, Tasks>;

/// The closed set of standard lifecycle keys: `pre-`, bare, and `post-`
/// phases for each of six events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lifecycle {
    PreCommit,
    Commit,
    PostCommit,
    PreCheckout,
    Checkout,
    PostCheckout,
    PreMerge,
    Merge,
    PostMerge,
    PreBuild,
    Build,
    PostBuild,
    PreDeploy,
    Deploy,
    PostDeploy,
    PrePublish,
    Publish,
    PostPublish,
}

impl Lifecycle {
    pub const ALL: [Lifecycle; 18] = [
        Lifecycle::PreCommit,
        Lifecycle::Commit,
        Lifecycle::PostCommit,
        Lifecycle::PreCheckout,
        Lifecycle::Checkout,
        Lifecycle::PostCheckout,
        Lifecycle::PreMerge,
        Lifecycle::Merge,
        Lifecycle::PostMerge,
        Lifecycle::PreBuild,
        Lifecycle::Build,
        Lifecycle::PostBuild,
        Lifecycle::PreDeploy,
        Lifecycle::Deploy,
        Lifecycle::PostDeploy,
        Lifecycle::PrePublish,
        Lifecycle::Publish,
        Lifecycle::PostPublish,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::PreCommit => "pre-commit",
            Lifecycle::Commit => "commit",
            Lifecycle::PostCommit => "post-commit",
            Lifecycle::PreCheckout => "pre-checkout",
            Lifecycle::Checkout => "checkout",
            Lifecycle::PostCheckout => "post-checkout",
            Lifecycle::PreMerge => "pre-merge",
            Lifecycle::Merge => "merge",
            Lifecycle::PostMerge => "post-merge",
            Lifecycle::PreBuild => "pre-build",
            Lifecycle::Build => "build",
            Lifecycle::PostBuild => "post-build",
            Lifecycle::PreDeploy => "pre-deploy",
            Lifecycle::Deploy => "deploy",
            Lifecycle::PostDeploy => "post-deploy",
            Lifecycle::PrePublish => "pre-publish",
            Lifecycle::Publish => "publish",
            Lifecycle::PostPublish => "post-publish",
        }
    }

    /// Parses a lifecycle string into a `Lifecycle` variant.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.as_str() == s)
    }

    #[inline]
    pub fn is_pre(&self) -> bool {
        self.as_str().starts_with("pre-")
    }

    #[inline]
    pub fn is_post(&self) -> bool {
        self.as_str().starts_with("post-")
    }

    /// The configuration key the `pre` phase resolves against, when the
    /// `pre` phase applies to this lifecycle.
    ///
    /// A bare key expands to its `pre-` form; an already-prefixed `pre-` key
    /// resolves against itself (never `pre-pre-`); a `post-` key has no
    /// `pre` phase.
    pub fn pre_key(&self) -> Option<&'static str> {
        if self.is_post() {
            return None;
        }
        if self.is_pre() {
            return Some(self.as_str());
        }
        match self {
            Lifecycle::Commit => Some("pre-commit"),
            Lifecycle::Checkout => Some("pre-checkout"),
            Lifecycle::Merge => Some("pre-merge"),
            Lifecycle::Build => Some("pre-build"),
            Lifecycle::Deploy => Some("pre-deploy"),
            Lifecycle::Publish => Some("pre-publish"),
            _ => None,
        }
    }

    /// The configuration key the `run` phase resolves against. Only bare
    /// lifecycles have a `run` phase.
    pub fn run_key(&self) -> Option<&'static str> {
        if self.is_pre() || self.is_post() {
            None
        } else {
            Some(self.as_str())
        }
    }

    /// The configuration key the `post` phase resolves against; symmetric
    /// to [`Lifecycle::pre_key`].
    pub fn post_key(&self) -> Option<&'static str> {
        if self.is_pre() {
            return None;
        }
        if self.is_post() {
            return Some(self.as_str());
        }
        match self {
            Lifecycle::Commit => Some("post-commit"),
            Lifecycle::Checkout => Some("post-checkout"),
            Lifecycle::Merge => Some("post-merge"),
            Lifecycle::Build => Some("post-build"),
            Lifecycle::Deploy => Some("post-deploy"),
            Lifecycle::Publish => Some("post-publish"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
