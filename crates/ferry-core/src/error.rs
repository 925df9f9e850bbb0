//! Transfer error taxonomy.
//!
//! Backend failures are caught at the transfer boundary and re-raised as one
//! of these kinds with the adapter error attached as `source`.

use thiserror::Error;

use crate::backend::AdapterError;

/// Result alias for locator and transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

#[derive(Debug, Error)]
pub enum TransferError {
    /// Input matched no locator variant. Never retried.
    #[error("unsupported URI scheme: {input}")]
    UnsupportedScheme { input: String },

    /// HTTP or object-store fetch failed.
    #[error("failed to download {uri}")]
    Download {
        uri: String,
        #[source]
        source: AdapterError,
    },

    /// Copying a local source into scratch failed.
    #[error("failed to copy {uri}")]
    FileCopy {
        uri: String,
        #[source]
        source: AdapterError,
    },

    /// Writing to the object store failed.
    #[error("failed to upload {uri} to {target}")]
    Upload {
        uri: String,
        target: String,
        #[source]
        source: AdapterError,
    },

    /// Scratch allocation failed (disk full, permission denied).
    #[error("scratch allocation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    pub fn unsupported(input: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            input: input.into(),
        }
    }

    /// The locator or raw input the error refers to, if any.
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::UnsupportedScheme { input } => Some(input),
            Self::Download { uri, .. } | Self::FileCopy { uri, .. } | Self::Upload { uri, .. } => {
                Some(uri)
            }
            Self::Io(_) => None,
        }
    }
}
