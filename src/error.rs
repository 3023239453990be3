use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("invalid card notation `{0}`")]
    CardParse(String),

    #[error("learned-depth cache I/O at {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("learned-depth cache at {path} is malformed: {source}")]
    CacheFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("search has already been started")]
    AlreadyStarted,

    #[error("failed to spawn search worker: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T, E = SolverError> = std::result::Result<T, E>;
