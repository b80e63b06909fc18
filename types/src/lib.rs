//! Wire vocabulary shared by every matrix-mul rank.
//!
//! Both the transport layer and the engine speak in [`Message`]s. A message is
//! a tagged union, so control signals such as [`Message::Terminate`] never
//! share a value space with matrix data.

mod message;
mod wire;

pub use message::{Element, Message, Rank, WorkItem};
pub use wire::{decode, encode, WireError};
