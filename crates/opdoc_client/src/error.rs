//! Error types for the client.

use opdoc_protocol::{ProtocolError, Revision};
use operational_transform::OTError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the synchronization client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server acknowledged an operation while none was outstanding.
    #[error("acknowledgment received with no outstanding operation")]
    AckWithoutOutstanding,

    /// A history batch started beyond the locally tracked revision.
    #[error("history starts at revision {start} but client is at revision {revision}")]
    HistoryGap {
        /// Starting revision claimed by the server.
        start: Revision,
        /// Revision the client has accounted for.
        revision: Revision,
    },

    /// Transform, compose, or apply failed on incompatible operations.
    #[error("incompatible operations: {0}")]
    Algebra(#[from] OTError),

    /// An operation was built against a different document length than
    /// the one the client is tracking.
    #[error("operation expects document length {op} but client tracks length {doc}")]
    LengthMismatch {
        /// Length the operation was built against.
        op: usize,
        /// Length the client is tracking.
        doc: usize,
    },

    /// The editor emitted a change event the adapter cannot express.
    #[error("malformed editor change: {0}")]
    AdapterInput(String),

    /// A wire message could not be decoded or encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The underlying wire failed.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Returns true if the session must be torn down.
    ///
    /// Everything except a transport failure is fatal: protocol
    /// violations and adapter-input violations are never retried, and
    /// recovery happens only through reconnect-and-resync.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ClientError::Transport(_))
    }
}
