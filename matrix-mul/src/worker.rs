//! Compute side of both strategies.
//!
//! Collective strategy: every rank (the root included) receives its row block
//! of A and a full copy of B, computes its block of the product and takes part
//! in the gather. Master/worker strategy: a non-root rank answers work items
//! until it is told to terminate, and never speaks first.

use matrix_mul_transport::{Collective, Transport};
use matrix_mul_types::{Element, Message, WorkItem};
use tracing::{debug, info};

use crate::config::{Config, Strategy};
use crate::matrix::{FlatMatrix, ProductBlock, RowBlock};
use crate::partition::block_rows;
use crate::Error;

/// What a worker did before it exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerSummary {
    /// Work items answered (master/worker strategy).
    pub tasks: usize,
    /// Product rows computed (collective strategy).
    pub rows: usize,
}

pub struct Worker<'a, T: ?Sized> {
    transport: &'a T,
    config: &'a Config,
}

impl<'a, T: Transport + ?Sized> Worker<'a, T> {
    pub fn new(transport: &'a T, config: &'a Config) -> Self {
        Self { transport, config }
    }

    pub async fn run(&self) -> Result<WorkerSummary, Error> {
        match self.config.strategy {
            Strategy::Collective => {
                let rows = block_rows(self.config.rows, self.transport.size())?;
                multiply_partition(self.transport, self.config, None, Vec::new()).await?;
                Ok(WorkerSummary { tasks: 0, rows })
            }
            Strategy::MasterWorker => self.serve().await,
        }
    }

    /// Answers work items from the root until a [`Message::Terminate`]
    /// arrives. Nothing is sent in response to the termination message.
    async fn serve(&self) -> Result<WorkerSummary, Error> {
        let rank = self.transport.rank();
        let root = self.config.root;
        let mut summary = WorkerSummary::default();

        loop {
            match self.transport.receive(root).await? {
                Message::Task(item) => {
                    let reply = answer(&item)?;
                    self.transport.send(root, Message::Reply(reply)).await?;
                    summary.tasks += 1;
                }
                Message::Terminate => {
                    info!(rank, tasks = summary.tasks, "worker terminated");
                    return Ok(summary);
                }
                other => {
                    return Err(Error::ProtocolViolation(format!(
                        "rank {rank} received a {} message while waiting for work",
                        other.kind()
                    )));
                }
            }
        }
    }
}

/// One collective round, identical on every rank: scatter A, broadcast B,
/// multiply locally, gather at the root, barrier.
///
/// The root passes its row blocks of A (as flat chunks, in rank order) and
/// the full B; other ranks pass `None` and an empty B. Returns the assembled
/// product buffer at the root and `None` elsewhere.
pub(crate) async fn multiply_partition<T: Transport + ?Sized>(
    transport: &T,
    config: &Config,
    chunks: Option<Vec<Vec<Element>>>,
    b: Vec<Element>,
) -> Result<Option<Vec<Element>>, Error> {
    let rank = transport.rank();
    let rows_per_block = block_rows(config.rows, transport.size())?;

    let local = transport
        .scatter(chunks, rows_per_block * config.columns, config.root)
        .await?;
    let block = RowBlock::from_vec(local, rows_per_block, config.columns)?;

    let mut b = if rank == config.root {
        b
    } else {
        FlatMatrix::zeros(config.columns, config.rows)?.into_vec()
    };
    transport.broadcast(&mut b, config.root).await?;
    let b = FlatMatrix::from_vec(b, config.columns, config.rows)?;
    debug!(rank, rows = block.rows(), "received partition");

    let product = multiply_block(&block, &b)?;
    debug!(rank, rows = product.rows(), "computed product block");

    let gathered = transport.gather(product.as_slice(), config.root).await?;
    transport.barrier().await?;
    Ok(gathered)
}

/// Multiplies a row block of A by the whole of B.
///
/// Uses the i-k-j loop order so the inner loop walks both B and the output
/// row contiguously.
pub fn multiply_block(block: &RowBlock, b: &FlatMatrix) -> Result<ProductBlock, Error> {
    if block.columns() != b.rows() {
        return Err(Error::DimensionMismatch(
            block.rows(),
            block.columns(),
            b.rows(),
            b.columns(),
        ));
    }

    let width = b.columns();
    let mut product = vec![0; block.rows() * width];
    for (out_row, a_row) in product
        .chunks_mut(width.max(1))
        .zip(block.as_slice().chunks(block.columns().max(1)))
    {
        for (k, &a) in a_row.iter().enumerate() {
            let b_row = &b.as_slice()[k * width..(k + 1) * width];
            for (out, &b) in out_row.iter_mut().zip(b_row) {
                *out += a * b;
            }
        }
    }
    ProductBlock::from_vec(product, block.rows(), width)
}

pub fn dot(lhs: &[Element], rhs: &[Element]) -> Element {
    let mut sum = 0;
    for (a, b) in lhs.iter().zip(rhs) {
        sum += a * b;
    }
    sum
}

/// Computes the reply to one work item: one dot product per item row.
pub fn answer(item: &WorkItem) -> Result<Vec<Element>, Error> {
    if !item.is_well_formed() {
        return Err(Error::ProtocolViolation(format!(
            "work item with {} rows carries {} values for a depth of {}",
            item.rows,
            item.lhs.len(),
            item.depth()
        )));
    }
    if item.depth() == 0 {
        return Ok(vec![0; item.rows]);
    }
    Ok(item
        .lhs
        .chunks(item.depth())
        .map(|row| dot(row, &item.rhs))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_computes_one_dot_product_per_row() {
        let item = WorkItem::new(2, vec![1, 2, 3, 4], vec![10, 1]);
        assert_eq!(answer(&item).unwrap(), vec![12, 34]);
    }

    #[test]
    fn answer_rejects_malformed_item() {
        let item = WorkItem::new(2, vec![1, 2, 3], vec![10, 1]);
        assert!(matches!(answer(&item), Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn block_product_matches_reference() {
        let a = FlatMatrix::from_vec((1..=12).collect(), 3, 4).unwrap();
        let b = FlatMatrix::from_vec((1..=8).rev().collect(), 4, 2).unwrap();
        assert_eq!(multiply_block(&a, &b).unwrap(), a.multiply(&b).unwrap());
    }
}
