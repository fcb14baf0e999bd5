use std::io;
use thiserror::Error;

/// Error type for worker pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// IO error from spawning worker threads.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for worker pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
