//! Distributed dense integer matrix multiplication.
//!
//! `matrix-mul` computes `C = A x B` for an `R x C` matrix A and a `C x R`
//! matrix B across a fixed group of ranks connected by a
//! [`Transport`](matrix_mul_transport::Transport). One rank, the root,
//! owns the operands and receives the product.
//!
//! # Strategies
//!
//! - [`Strategy::Collective`]: A is split into equal row blocks and
//!   scattered, B is broadcast, every rank (the root included) multiplies its
//!   block, and the product blocks are gathered back in rank order.
//! - [`Strategy::MasterWorker`]: the root keeps A and B and hands out work
//!   items round-robin to the other ranks, one output cell
//!   ([`Granularity::Cell`]) or one block-column segment
//!   ([`Granularity::RowBlock`]) at a time, then tells every worker to stop.
//!
//! Both strategies produce exactly the sequential product
//! ([`FlatMatrix::multiply`]).
//!
//! # Example
//!
//! ```no_run
//! use matrix_mul::{Config, Strategy, run_local};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new(8, 3)
//!         .with_seed(42)
//!         .with_strategy(Strategy::MasterWorker);
//!
//!     let outcome = run_local(config, 4).await?;
//!     assert!(outcome.verify()?);
//!     println!("{}", outcome.product);
//!
//!     Ok(())
//! }
//! ```

mod config;
mod coordinator;
mod dispatch;
mod error;
mod matrix;
mod partition;
mod report;
mod session;
mod worker;

pub use config::{Config, DispatchMode, Granularity, Strategy};
pub use coordinator::{Coordinator, Operands, Outcome};
pub use dispatch::RoundRobin;
pub use error::Error;
pub use matrix::{FlatMatrix, ProductBlock, RowBlock};
pub use partition::{block_rows, extract_column, extract_row, split_into_blocks, write_column};
pub use report::{ConsoleReporter, Reporter, Stopwatch, Timing};
pub use session::{run, run_local, run_local_with_operands, run_with_operands};
pub use worker::{Worker, WorkerSummary, answer, dot, multiply_block};
