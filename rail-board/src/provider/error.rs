//! Fixture loading errors.

use std::path::PathBuf;

/// Errors raised while loading fixture files.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// File or directory could not be read
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File was not valid fixture JSON
    #[error("failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Directory held no board files
    #[error("no board fixtures found in {0:?}")]
    NoBoards(PathBuf),
}
