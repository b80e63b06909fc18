//! Error types for matrix-mul operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] matrix_mul_transport::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to allocate {0} elements")]
    Allocation(usize),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("matrix dimension mismatch: A is {0}x{1}, B is {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),

    #[error("data length {len} does not match dimensions {rows}x{columns}")]
    ShapeMismatch {
        len: usize,
        rows: usize,
        columns: usize,
    },

    #[error("index ({row}, {column}) out of bounds for {rows}x{columns} matrix")]
    OutOfBounds {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },

    #[error("rank task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("distributed product differs from the sequential reference")]
    VerificationFailed,

    #[error("report output failed: {0}")]
    Io(#[from] std::io::Error),
}
