//! Error taxonomy for job dispatch, step assembly, and streaming.

use thiserror::Error;

/// All failures the framework itself can report.
///
/// Collaborator-defined failures (a producer's database error, a consumer's
/// write error) travel through the transparent `Other` variant; the framework
/// never retries and never replaces them.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Dispatch: the requested job name was never registered.
    #[error("Not found job name: {0}")]
    JobNotFound(String),

    /// Build: a step was assembled without a producer.
    #[error("ERROR: Reader must be set.")]
    ReaderUnset,

    /// Build: a step was assembled without a consumer.
    #[error("ERROR: Writer must be set.")]
    WriterUnset,

    /// A consumer was handed a chunk variant it cannot interpret.
    #[error("Not supported such a chunk type: {0}")]
    UnsupportedChunk(String),

    /// The task was unblocked by a peer's failure rather than its own work.
    #[error("step execution canceled")]
    Canceled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Opaque failure raised by a producer or consumer implementation.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BatchError {
    /// True when this side was torn down by its peer, not by its own work.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, BatchError::Canceled)
    }
}
