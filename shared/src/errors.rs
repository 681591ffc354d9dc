use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinerError {
    /// The protocol layer handed us a round we refuse to search.
    #[error("invalid round: {0}")]
    InvalidRound(String),
    #[error("invalid indices: {0}")]
    InvalidIndices(String),
    #[error("proof does not match the indices")]
    ProofMismatch,
    /// Recoverable: the scheduler falls back to sequential evaluation.
    #[error("worker pool: {0}")]
    WorkerPool(String),
    #[error("config: {0}")]
    Config(String),
}

pub type MinerResult<T> = Result<T, MinerError>;
