use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by WebDAV transfer and chunk codec operations
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid configuration: {details}")]
    Configuration { details: String },

    #[error("Transport failure for '{url}': {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status {status} from '{url}'")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Malformed server response: {details}")]
    Protocol { details: String },

    #[error("Filesystem error at '{path}': {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to transfer '{path}': {source}")]
    FileTransfer {
        path: PathBuf,
        #[source]
        source: Box<TransferError>,
    },

    #[error("Incomplete transfer: missing '{path}'")]
    IncompleteTransfer { path: PathBuf },

    #[error("Operation cancelled")]
    Cancelled,
}

impl TransferError {
    pub fn config(details: impl Into<String>) -> Self {
        Self::Configuration {
            details: details.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Attaches the local path a tree operation was working on when it
    /// failed, so callers can see which file broke a multi-file transfer.
    pub fn for_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            // Keep the more specific path from a lower layer.
            err @ (Self::Filesystem { .. } | Self::FileTransfer { .. }) => err,
            other => Self::FileTransfer {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// The local path a failed operation was processing, when one is known.
    pub fn failed_path(&self) -> Option<&Path> {
        match self {
            Self::Filesystem { path, .. }
            | Self::FileTransfer { path, .. }
            | Self::IncompleteTransfer { path } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
