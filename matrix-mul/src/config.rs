//! Run configuration shared by every rank.

use clap::ValueEnum;
use matrix_mul_types::{Element, Rank};

use crate::Error;
use crate::partition::block_rows;

/// How the product is distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Strategy {
    /// Scatter row blocks of A, broadcast B, gather product blocks.
    #[default]
    Collective,
    /// The root hands out work items round-robin and collects replies.
    MasterWorker,
}

/// Size of one master/worker work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Granularity {
    /// One output cell per item; the reply is a scalar.
    #[default]
    Cell,
    /// One (row block, column) pair per item; the reply is a column segment.
    RowBlock,
}

/// How many master/worker items are in flight at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DispatchMode {
    /// Send one item, wait for its reply, then send the next.
    #[default]
    Lockstep,
    /// Send one item to every worker, then collect the replies in order.
    Pipelined,
}

/// Shapes and policies for one multiplication.
///
/// A is `rows x columns`, B is `columns x rows`, so the product is
/// `rows x rows`. Every rank must be handed the same configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rows: usize,
    pub columns: usize,
    pub root: Rank,
    pub seed: u64,
    /// Exclusive upper bound of generated entries.
    pub max_value: Element,
    pub strategy: Strategy,
    pub granularity: Granularity,
    pub dispatch: DispatchMode,
}

impl Config {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            root: 0,
            seed: 0,
            max_value: 100,
            strategy: Strategy::default(),
            granularity: Granularity::default(),
            dispatch: DispatchMode::default(),
        }
    }

    pub fn with_root(mut self, root: Rank) -> Self {
        self.root = root;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_value(mut self, max_value: Element) -> Self {
        self.max_value = max_value;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Checks every precondition that depends only on the configuration and
    /// the group size. Runs on each rank before any message is sent.
    pub fn validate(&self, process_count: usize) -> Result<(), Error> {
        if self.rows == 0 || self.columns == 0 {
            return Err(Error::Configuration(format!(
                "matrix dimensions must be positive, got {}x{}",
                self.rows, self.columns
            )));
        }
        if process_count < 2 {
            return Err(Error::Configuration(format!(
                "at least 2 processes are required, got {process_count}"
            )));
        }
        block_rows(self.rows, process_count)?;
        if self.root >= process_count {
            return Err(Error::Configuration(format!(
                "root rank {} is outside a group of {process_count}",
                self.root
            )));
        }
        if self.max_value <= 0 {
            return Err(Error::Configuration(format!(
                "max value must be positive, got {}",
                self.max_value
            )));
        }

        let largest = self.max_value - 1;
        let bound = Element::try_from(self.columns)
            .ok()
            .and_then(|columns| largest.checked_mul(largest)?.checked_mul(columns));
        if bound.is_none() {
            return Err(Error::Configuration(format!(
                "{} columns of values below {} overflow the accumulator",
                self.columns, self.max_value
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_rows_not_divisible_by_process_count() {
        let err = Config::new(3, 2).validate(2).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn rejects_single_process() {
        assert!(Config::new(4, 2).validate(1).is_err());
    }

    #[test]
    fn rejects_root_outside_group() {
        assert!(Config::new(4, 2).with_root(2).validate(2).is_err());
        assert!(Config::new(4, 2).with_root(1).validate(2).is_ok());
    }

    #[test]
    fn rejects_accumulator_overflow() {
        let config = Config::new(2, 4).with_max_value(Element::MAX);
        assert!(config.validate(2).is_err());
    }
}
