//! # opdoc Server
//!
//! Reference canonical-document server for opdoc.
//!
//! This crate provides:
//! - `Document`: canonical text plus the committed operation log
//! - `DocServer`: connection identities, edit commit with transform
//!   over the concurrent suffix, and history replay
//!
//! The server is the single serialization point: clients apply remote
//! operations in exactly the order this log commits them. The crate is
//! transport-agnostic; a wire binding feeds it parsed messages and
//! pumps history batches back to each connection.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod server;

pub use document::Document;
pub use error::{ServerError, ServerResult};
pub use server::DocServer;
