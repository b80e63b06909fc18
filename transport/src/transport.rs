//! The point-to-point contract every backend provides.

use async_trait::async_trait;
use matrix_mul_types::{Message, Rank};

use crate::Error;

/// Blocking, ordered message passing inside a fixed group of ranks.
///
/// Messages sent from one rank to another arrive in the order they were
/// sent. `receive` suspends until a message from `source` is available; it
/// only returns early when the peer has gone away.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Rank of the calling participant.
    fn rank(&self) -> Rank;

    /// Number of participants in the group.
    fn size(&self) -> usize;

    async fn send(&self, destination: Rank, message: Message) -> Result<(), Error>;

    async fn receive(&self, source: Rank) -> Result<Message, Error>;

    /// Fails with [`Error::InvalidRank`] unless `rank` belongs to the group.
    fn check_rank(&self, rank: Rank) -> Result<(), Error> {
        if rank < self.size() {
            Ok(())
        } else {
            Err(Error::InvalidRank {
                rank,
                size: self.size(),
            })
        }
    }
}
