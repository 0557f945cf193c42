//! Store error taxonomy.

use std::path::PathBuf;

use crate::frontmatter::FrontmatterError;

/// Broad category of a [`StoreError`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Io,
}

/// Errors that can occur reading or writing the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("{0}")]
    UnsupportedValue(FrontmatterError),

    #[error("Markdown file not found: {0}")]
    NotFound(String),

    #[error("Markdown file already exists: {0}")]
    AlreadyExists(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) | Self::InvalidName(_) | Self::UnsupportedValue(_) => {
                ErrorKind::Validation
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::Conflict,
            Self::Io { .. } | Self::Frontmatter { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
