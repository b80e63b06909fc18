//! Error types for transport operations.

use matrix_mul_types::{Rank, WireError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] WireError),

    #[error("connection to rank {0} closed")]
    ConnectionClosed(Rank),

    #[error("rank {rank} is outside a group of {size}")]
    InvalidRank { rank: Rank, size: usize },

    #[error("expected {expected} from rank {peer}, received {found}")]
    UnexpectedMessage {
        peer: Rank,
        expected: &'static str,
        found: &'static str,
    },

    #[error("expected {expected} elements from rank {peer}, received {found}")]
    LengthMismatch {
        peer: Rank,
        expected: usize,
        found: usize,
    },

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("timed out waiting for rank {0}")]
    Timeout(Rank),
}
