//! The aggregated error type for the binary crate.
//!
//! Per-crate errors (`comma_v::Error`, `rcs_ed`'s internal errors,
//! `git_fast_import::Error`, `coalesce::Error`) are wrapped here rather than
//! propagated raw, so the driver can always attach a filename (and, where
//! available, a revision id) before printing context to stderr.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: comma_v::Error,
    },

    #[error("{path}: revision {revision} assigns a diff base twice")]
    DuplicateDiffBase { path: PathBuf, revision: String },

    #[error("{path}: revision {revision} has no text and no diff base")]
    MissingDiffBase { path: PathBuf, revision: String },

    #[error("{path}: has no head revision")]
    MissingHead { path: PathBuf },

    #[error("{path}: revision {revision} has no delta text")]
    MissingRevisionText { path: PathBuf, revision: String },

    #[error("{path}: symbol {symbol} at {revision} has no dated descendant (complex branch structure)")]
    ComplexBranchStructure {
        path: PathBuf,
        symbol: String,
        revision: String,
    },

    #[error("{path}: revision {revision}: {source}")]
    Replay {
        path: PathBuf,
        revision: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{context}: {source}")]
    Identity {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Export(#[from] git_fast_import::Error),

    #[error(transparent)]
    Coalesce(#[from] coalesce::Error),

    #[error("malformed authors-map entry: {0}")]
    AuthorsMap(String),

    #[error("input path not found: {}", .0.display())]
    NotFound(PathBuf),
}

impl Error {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn parse(path: &Path, source: comma_v::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn replay(path: &Path, revision: &comma_v::Num, source: anyhow::Error) -> Self {
        Self::Replay {
            path: path.to_path_buf(),
            revision: revision.to_string(),
            source,
        }
    }

    pub fn identity(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Identity {
            context: context.into(),
            source,
        }
    }
}
