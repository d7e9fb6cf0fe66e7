//! Domain-specific errors for mod operations
//!
//! Every variant renders a reason a frontend can show as-is.

use std::path::PathBuf;

use modlayer_schema::RepoKeyError;
use thiserror::Error;

/// Everything that can go wrong in a mod operation.
#[derive(Error, Debug)]
pub enum ModError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Format(String),

    #[error("rate limit exhausted, try later ({needed} request(s) needed, {remaining} left)")]
    QuotaExceeded { needed: u64, remaining: u64 },

    #[error("download of {url} failed: {reason}")]
    Transfer { url: String, reason: String },

    #[error("download of {0} was cancelled")]
    Cancelled(String),

    #[error("no installable asset in archive {}", path.display())]
    Extraction { path: PathBuf },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("catalog store error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0} is a local mod and has no remote releases")]
    LocalMod(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type ModResult<T> = Result<T, ModError>;

impl ModError {
    /// Attach the offending path to an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure is a skipped call that can simply be retried later.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

impl From<RepoKeyError> for ModError {
    fn from(err: RepoKeyError) -> Self {
        Self::Format(err.to_string())
    }
}

impl From<std::io::Error> for ModError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
