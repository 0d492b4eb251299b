//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error in {context}: {error}")]
    Toml {
        error: toml::de::Error,
        context: String,
    },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Workspace not found: {name}. Known workspaces: {available}")]
    WorkspaceNotFound { name: String, available: String },

    #[error("Duplicate workspace name: {name} declared at both '{first}' and '{second}'")]
    DuplicateWorkspace {
        name: String,
        first: String,
        second: String,
    },

    #[error("Root manifest not found: expected 'stagehand.toml' in {0}")]
    RootManifestMissing(PathBuf),

    #[error("Invalid lifecycle: {value}. Expected one of: {expected}")]
    InvalidLifecycle { value: String, expected: String },

    #[error("Graph error: {0}")]
    Graph(String),
}

impl Error {
    /// Wraps a TOML parse error with the path of the offending file.
    pub fn toml(error: toml::de::Error, context: impl Into<String>) -> Self {
        Error::Toml {
            error,
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
