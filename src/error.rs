// File: src/error.rs
use std::path::PathBuf;

/// Errors surfaced by the rater outside of the rating path itself.
///
/// Rating never fails; these cover snapshot files, table documents and config.
#[derive(Debug, thiserror::Error)]
pub enum RaterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("dictionary tables could not be decoded: {0}")]
    Tables(#[from] serde_json::Error),

    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type RaterResult<T> = Result<T, RaterError>;
