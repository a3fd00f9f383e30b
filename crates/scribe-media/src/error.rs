//! Error types for the scribe-media crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    /// An artifact exists but does not have the expected shape.
    #[error("Malformed artifact {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// Two patch entries cover intersecting time ranges.
    #[error("Patch entries {first} and {second} overlap")]
    OverlappingPatches { first: String, second: String },

    /// The broadcast page did not reference an HLS playlist.
    #[error("No playlist URL found at {url}")]
    PlaylistNotFound { url: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MediaError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means an upstream artifact is unusable, as opposed
    /// to an environmental failure such as I/O or network.
    pub fn is_malformed_artifact(&self) -> bool {
        match self {
            MediaError::Malformed { .. } | MediaError::OverlappingPatches { .. } => true,
            MediaError::Csv(e) => !e.is_io_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
