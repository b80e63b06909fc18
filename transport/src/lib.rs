//! Message passing between the ranks of a matrix-mul group.
//!
//! `matrix-mul-transport` moves [`Message`](matrix_mul_types::Message)s
//! between a fixed set of ranks. Backends implement the point-to-point
//! [`Transport`] trait; the [`Collective`] operations (scatter, broadcast,
//! gather, barrier) come for free on top of it.
//!
//! # Backends
//!
//! - [`LocalTransport`]: every rank is a task inside one process, connected
//!   by channels. Used by tests and single-machine runs.
//! - [`TcpTransport`]: every rank is its own process, connected in a full
//!   TCP mesh.
//! - [`Timeout`]: wraps any backend and bounds every receive.
//!
//! # Example
//!
//! ```no_run
//! use matrix_mul_transport::{Collective, LocalTransport, Transport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut handles = Vec::new();
//!     for transport in LocalTransport::group(2) {
//!         handles.push(tokio::spawn(async move {
//!             let mut buffer = vec![0; 3];
//!             if transport.rank() == 0 {
//!                 buffer = vec![1, 2, 3];
//!             }
//!             transport.broadcast(&mut buffer, 0).await.map(|_| buffer)
//!         }));
//!     }
//!     for handle in handles {
//!         assert_eq!(handle.await??, vec![1, 2, 3]);
//!     }
//!     Ok(())
//! }
//! ```

mod collective;
mod error;
mod local;
mod probe;
mod tcp;
mod timeout;
mod transport;

pub use collective::Collective;
pub use error::Error;
pub use local::LocalTransport;
pub use probe::ping_pong;
pub use tcp::TcpTransport;
pub use timeout::Timeout;
pub use transport::Transport;
