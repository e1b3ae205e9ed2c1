//! Library error type.

use std::path::PathBuf;

pub type GridFuzzResult<T> = Result<T, GridFuzzError>;

#[derive(Debug, thiserror::Error)]
pub enum GridFuzzError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("config error: {0}")]
    Config(String),

    /// No usable seed maps; fuzzing must not start.
    #[error("seed corpus is empty: no usable seed maps in {}", .dir.display())]
    CorpusEmpty { dir: PathBuf },

    /// Rename or log-append failed while archiving an abnormal run.
    #[error("archive error: {0}")]
    Archive(String),
}
