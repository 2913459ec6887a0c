//! # opdoc Client
//!
//! Client-side synchronization state machine for collaborative text
//! editing, built on Operational Transformation.
//!
//! This crate provides:
//! - `SyncEngine`: the OT client protocol (outstanding/buffer slots,
//!   transform and compose, revision-numbered history consumption)
//! - `EditAdapter`: converts raw editor change events into operations
//! - History resync handling with idempotent replay
//! - `Session`: one logical connection with reconnect bookkeeping,
//!   driven by explicit events for deterministic testing
//! - An async WebSocket wire driver
//!
//! ## Architecture
//!
//! The state machine is synchronous and event-driven: every transition
//! happens inside a single dispatch call, so no locks are needed and
//! the user's typing is never blocked. The server is the single
//! serialization point; remote operations are applied in exactly the
//! order the server commits them.
//!
//! ## Key invariants
//!
//! - At most one local edit is unacknowledged on the server.
//! - The buffer is never set while no edit is outstanding.
//! - The revision never decreases and advances exactly once per
//!   history entry consumed.
//! - Protocol violations tear the session down; recovery goes through
//!   reconnect-and-resync, never silent repair.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod config;
mod engine;
mod error;
mod history;
mod session;
mod wire;

pub use adapter::{ChangeKind, EditAdapter, EditorChange};
pub use config::SessionConfig;
pub use engine::{ClientEvent, Effect, SyncEngine, SyncState};
pub use error::{ClientError, ClientResult};
pub use history::{classify, unseen_entries, EntryKind};
pub use session::{ConnectionStatus, EditorHandle, Session, SessionAction, SessionEvent};
pub use wire::{run, ConnectionNotice};
