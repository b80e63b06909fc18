//! Collective operations built from point-to-point messages.
//!
//! Every algorithm here is linear in the group size: the root talks to each
//! other rank directly, in ascending rank order. That keeps the ordering
//! guarantees obvious (scatter and gather follow rank order) and works on any
//! [`Transport`].

use async_trait::async_trait;
use matrix_mul_types::{Element, Message, Rank};
use tracing::debug;

use crate::{Error, Transport};

/// Rank that coordinates [`Collective::barrier`].
const BARRIER_ROOT: Rank = 0;

#[async_trait]
pub trait Collective: Transport {
    /// Distributes one chunk per rank from `root`.
    ///
    /// The root passes `Some(chunks)` with exactly [`Transport::size`] chunks
    /// of `count` elements each, in rank order; every other rank passes
    /// `None`. Each rank, the root included, returns its own chunk.
    async fn scatter(
        &self,
        chunks: Option<Vec<Vec<Element>>>,
        count: usize,
        root: Rank,
    ) -> Result<Vec<Element>, Error> {
        self.check_rank(root)?;

        if self.rank() != root {
            let chunk = expect_block(self.receive(root).await?, root)?;
            return check_len(chunk, count, root);
        }

        let chunks = chunks.unwrap_or_default();
        if chunks.len() != self.size() {
            return Err(Error::LengthMismatch {
                peer: root,
                expected: self.size(),
                found: chunks.len(),
            });
        }

        let mut own = Vec::new();
        for (rank, chunk) in chunks.into_iter().enumerate() {
            let chunk = check_len(chunk, count, root)?;
            if rank == root {
                own = chunk;
            } else {
                debug!(rank, count, "scatter chunk");
                self.send(rank, Message::Block(chunk)).await?;
            }
        }
        Ok(own)
    }

    /// Replicates the root's `buffer` into every rank's `buffer`.
    ///
    /// Non-root ranks must preallocate `buffer` with the expected length.
    /// Returns only after every rank holds the copy.
    async fn broadcast(&self, buffer: &mut Vec<Element>, root: Rank) -> Result<(), Error> {
        self.check_rank(root)?;

        if self.rank() == root {
            for rank in (0..self.size()).filter(|&rank| rank != root) {
                debug!(rank, len = buffer.len(), "broadcast copy");
                self.send(rank, Message::Block(buffer.clone())).await?;
            }
        } else {
            let received = expect_block(self.receive(root).await?, root)?;
            *buffer = check_len(received, buffer.len(), root)?;
        }

        self.barrier().await
    }

    /// Collects `local` from every rank at `root`, ordered by ascending rank.
    ///
    /// Every rank must contribute the same number of elements. Only the root
    /// gets `Some`.
    async fn gather(&self, local: &[Element], root: Rank) -> Result<Option<Vec<Element>>, Error> {
        self.check_rank(root)?;

        if self.rank() != root {
            self.send(root, Message::Block(local.to_vec())).await?;
            return Ok(None);
        }

        let mut assembled = Vec::with_capacity(local.len() * self.size());
        for rank in 0..self.size() {
            if rank == root {
                assembled.extend_from_slice(local);
            } else {
                let chunk = expect_block(self.receive(rank).await?, rank)?;
                assembled.extend(check_len(chunk, local.len(), rank)?);
            }
        }
        Ok(Some(assembled))
    }

    /// Blocks until every rank of the group has entered the barrier.
    async fn barrier(&self) -> Result<(), Error> {
        if self.rank() == BARRIER_ROOT {
            for rank in 1..self.size() {
                expect_barrier(self.receive(rank).await?, rank)?;
            }
            for rank in 1..self.size() {
                self.send(rank, Message::Barrier).await?;
            }
        } else {
            self.send(BARRIER_ROOT, Message::Barrier).await?;
            expect_barrier(self.receive(BARRIER_ROOT).await?, BARRIER_ROOT)?;
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Collective for T {}

fn expect_block(message: Message, peer: Rank) -> Result<Vec<Element>, Error> {
    match message {
        Message::Block(data) => Ok(data),
        other => Err(Error::UnexpectedMessage {
            peer,
            expected: "block",
            found: other.kind(),
        }),
    }
}

fn expect_barrier(message: Message, peer: Rank) -> Result<(), Error> {
    match message {
        Message::Barrier => Ok(()),
        other => Err(Error::UnexpectedMessage {
            peer,
            expected: "barrier",
            found: other.kind(),
        }),
    }
}

fn check_len(chunk: Vec<Element>, expected: usize, peer: Rank) -> Result<Vec<Element>, Error> {
    if chunk.len() == expected {
        Ok(chunk)
    } else {
        Err(Error::LengthMismatch {
            peer,
            expected,
            found: chunk.len(),
        })
    }
}
