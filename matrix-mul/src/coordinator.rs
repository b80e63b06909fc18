//! Root side of both strategies.

use matrix_mul_transport::Transport;
use matrix_mul_types::{Element, Message, Rank, WorkItem};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::config::{Config, DispatchMode, Granularity, Strategy};
use crate::dispatch::RoundRobin;
use crate::matrix::{FlatMatrix, RowBlock};
use crate::partition::{extract_column, extract_row, split_into_blocks, write_column};
use crate::report::{Stopwatch, Timing};
use crate::worker::multiply_partition;
use crate::Error;

/// The two input matrices: A is `rows x columns`, B is `columns x rows`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operands {
    pub a: FlatMatrix,
    pub b: FlatMatrix,
}

impl Operands {
    pub fn new(a: FlatMatrix, b: FlatMatrix) -> Result<Self, Error> {
        if a.columns() != b.rows() || a.rows() != b.columns() {
            return Err(Error::DimensionMismatch(
                a.rows(),
                a.columns(),
                b.rows(),
                b.columns(),
            ));
        }
        Ok(Self { a, b })
    }

    /// Draws A then B from one generator seeded with `config.seed`, so the
    /// same configuration always yields the same operands.
    pub fn generate(config: &Config) -> Result<Self, Error> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let a = FlatMatrix::random(config.rows, config.columns, config.max_value, &mut rng)?;
        let b = FlatMatrix::random(config.columns, config.rows, config.max_value, &mut rng)?;
        Ok(Self { a, b })
    }

    fn check_shape(&self, config: &Config) -> Result<(), Error> {
        let a_ok = self.a.rows() == config.rows && self.a.columns() == config.columns;
        let b_ok = self.b.rows() == config.columns && self.b.columns() == config.rows;
        if !(a_ok && b_ok) {
            return Err(Error::DimensionMismatch(
                self.a.rows(),
                self.a.columns(),
                self.b.rows(),
                self.b.columns(),
            ));
        }
        Ok(())
    }

    /// Rejects entries whose magnitude reaches `config.max_value`; the
    /// accumulator bound checked by [`Config::validate`] only holds below it.
    fn check_range(&self, config: &Config) -> Result<(), Error> {
        let limit = config.max_value.unsigned_abs();
        let entries = self.a.as_slice().iter().chain(self.b.as_slice());
        if let Some(value) = entries.copied().find(|v| v.unsigned_abs() >= limit) {
            return Err(Error::Configuration(format!(
                "operand entry {value} is outside (-{limit}, {limit})"
            )));
        }
        Ok(())
    }
}

/// Everything the root knows once a multiplication has finished.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub operands: Operands,
    pub product: FlatMatrix,
    pub timing: Timing,
}

impl Outcome {
    /// Recomputes the product sequentially and compares.
    pub fn verify(&self) -> Result<bool, Error> {
        Ok(self.operands.a.multiply(&self.operands.b)? == self.product)
    }
}

/// One master/worker work unit: a block of A (one row for cell granularity)
/// against one column of B.
#[derive(Debug, Clone, Copy)]
struct Assignment {
    block: usize,
    column: usize,
}

pub struct Coordinator<'a, T: ?Sized> {
    transport: &'a T,
    config: &'a Config,
}

impl<'a, T: Transport + ?Sized> Coordinator<'a, T> {
    pub fn new(transport: &'a T, config: &'a Config) -> Self {
        Self { transport, config }
    }

    /// Runs the configured strategy and returns the assembled product with
    /// its timing. Every other rank must be running a [`crate::Worker`] with
    /// the same configuration.
    pub async fn run(&self, operands: Operands) -> Result<Outcome, Error> {
        operands.check_shape(self.config)?;
        operands.check_range(self.config)?;

        let stopwatch = Stopwatch::start();
        let product = match self.config.strategy {
            Strategy::Collective => self.multiply_collective(&operands).await?,
            Strategy::MasterWorker => self.multiply_dispatched(&operands).await?,
        };
        let timing = stopwatch.stop();

        info!(
            strategy = ?self.config.strategy,
            rows = self.config.rows,
            columns = self.config.columns,
            processes = self.transport.size(),
            elapsed = ?timing.elapsed,
            "multiplication finished"
        );
        Ok(Outcome {
            operands,
            product,
            timing,
        })
    }

    async fn multiply_collective(&self, operands: &Operands) -> Result<FlatMatrix, Error> {
        let chunks = split_into_blocks(&operands.a, self.transport.size())?
            .into_iter()
            .map(FlatMatrix::into_vec)
            .collect();
        let gathered = multiply_partition(
            self.transport,
            self.config,
            Some(chunks),
            operands.b.as_slice().to_vec(),
        )
        .await?
        .ok_or_else(|| Error::ProtocolViolation("gather returned nothing at the root".into()))?;
        FlatMatrix::from_vec(gathered, self.config.rows, self.config.rows)
    }

    async fn multiply_dispatched(&self, operands: &Operands) -> Result<FlatMatrix, Error> {
        let blocks = self.work_blocks(&operands.a)?;
        let columns = (0..operands.b.columns())
            .map(|column| extract_column(&operands.b, column))
            .collect::<Result<Vec<_>, _>>()?;

        let assignments: Vec<Assignment> = (0..blocks.len())
            .flat_map(|block| (0..columns.len()).map(move |column| Assignment { block, column }))
            .collect();

        let mut workers = RoundRobin::new(self.transport.size(), self.config.root)?;
        let window = match self.config.dispatch {
            DispatchMode::Lockstep => 1,
            DispatchMode::Pipelined => workers.worker_count(),
        };
        let mut product = FlatMatrix::zeros(self.config.rows, self.config.rows)?;

        for round in assignments.chunks(window) {
            let mut pending = Vec::with_capacity(round.len());
            for &assignment in round {
                let block = &blocks[assignment.block];
                let item = WorkItem::new(
                    block.rows(),
                    block.as_slice().to_vec(),
                    columns[assignment.column].clone(),
                );
                let worker = workers.next_worker();
                self.transport.send(worker, Message::Task(item)).await?;
                pending.push((worker, assignment));
            }

            for (worker, assignment) in pending {
                let rows = blocks[assignment.block].rows();
                let values = self.receive_reply(worker, rows).await?;
                write_column(
                    &mut product,
                    assignment.column,
                    assignment.block * rows,
                    &values,
                )?;
            }
        }

        debug!(items = assignments.len(), "all work items answered");
        for worker in workers.workers() {
            self.transport.send(worker, Message::Terminate).await?;
        }
        Ok(product)
    }

    /// The A blocks master/worker items are cut from: single rows for cell
    /// granularity, one block per process otherwise.
    fn work_blocks(&self, a: &FlatMatrix) -> Result<Vec<RowBlock>, Error> {
        match self.config.granularity {
            Granularity::Cell => (0..a.rows())
                .map(|row| RowBlock::from_vec(extract_row(a, row)?, 1, a.columns()))
                .collect(),
            Granularity::RowBlock => split_into_blocks(a, self.transport.size()),
        }
    }

    async fn receive_reply(&self, worker: Rank, rows: usize) -> Result<Vec<Element>, Error> {
        match self.transport.receive(worker).await? {
            Message::Reply(values) if values.len() == rows => Ok(values),
            Message::Reply(values) => Err(Error::ProtocolViolation(format!(
                "rank {worker} replied with {} values, expected {rows}",
                values.len()
            ))),
            other => Err(Error::ProtocolViolation(format!(
                "rank {worker} sent a {} message instead of a reply",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_is_deterministic_per_seed() {
        let config = Config::new(4, 3).with_seed(11);
        let first = Operands::generate(&config).unwrap();
        assert_eq!(first, Operands::generate(&config).unwrap());
        assert_eq!((first.a.rows(), first.a.columns()), (4, 3));
        assert_eq!((first.b.rows(), first.b.columns()), (3, 4));
        assert_ne!(first, Operands::generate(&config.with_seed(12)).unwrap());
    }

    #[test]
    fn generate_rejects_non_positive_max_value() {
        let config = Config::new(4, 2).with_max_value(0);
        assert!(matches!(
            Operands::generate(&config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn range_check_uses_magnitude() {
        let config = Config::new(2, 1).with_max_value(10);
        let operands = |a: Vec<i64>| {
            Operands::new(
                FlatMatrix::from_vec(a, 2, 1).unwrap(),
                FlatMatrix::from_vec(vec![1, 2], 1, 2).unwrap(),
            )
            .unwrap()
        };
        assert!(operands(vec![9, -9]).check_range(&config).is_ok());
        assert!(operands(vec![10, 0]).check_range(&config).is_err());
        assert!(operands(vec![i64::MIN, 0]).check_range(&config).is_err());
    }

    #[test]
    fn operands_reject_incompatible_shapes() {
        let a = FlatMatrix::zeros(4, 2).unwrap();
        let b = FlatMatrix::zeros(3, 4).unwrap();
        assert!(matches!(
            Operands::new(a, b),
            Err(Error::DimensionMismatch(4, 2, 3, 4))
        ));
    }
}
