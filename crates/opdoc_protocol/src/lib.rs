//! # opdoc Protocol
//!
//! Wire protocol types for opdoc collaborative text editing.
//!
//! This crate provides:
//! - `ServerMessage` / `ClientMessage` for the JSON-over-WebSocket wire
//! - `HistoryEntry` for committed edits in server order
//! - `HistoryBatch` for revision-numbered replay
//!
//! This is a pure protocol crate with no I/O operations. Edit
//! operations themselves are `operational_transform::OperationSeq`
//! values, carried opaquely and serialized in the algebra's compact
//! array form (retains as positive integers, deletes as negative
//! integers, inserts as strings).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod messages;

pub use messages::{ClientMessage, HistoryBatch, HistoryEntry, ProtocolError, ServerMessage};

/// Identity assigned by the server to one connection.
pub type ClientId = u64;

/// Count of committed operations a client has accounted for.
pub type Revision = u64;
