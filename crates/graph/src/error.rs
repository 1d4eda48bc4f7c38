use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures of the load stage.
///
/// Everything else that can go wrong with a vault (an unreadable file, a
/// malformed link) is recorded in the report instead of aborting the run.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("vault root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclude pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

pub type Result<T> = std::result::Result<T, VaultError>;
