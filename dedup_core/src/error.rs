use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the deduplication pipeline.
///
/// Every variant is fatal: there is no retry path inside the pipeline itself.
/// A `DedupError` observed by any stage sets the shared abort flag and is
/// propagated up through `run_pipeline` to the caller.
#[derive(Error, Debug)]
pub enum DedupError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}: not a regular file (use preloading mode for non-regular inputs)")]
    NotARegularFile(PathBuf),

    #[error("{codec} compression failed: {source}")]
    Codec {
        codec: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("pipeline aborted by a sibling stage")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, DedupError>;
