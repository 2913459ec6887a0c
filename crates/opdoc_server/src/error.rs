//! Error types for the reference server.

use opdoc_protocol::Revision;
use operational_transform::OTError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while committing client edits.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A client claimed a revision ahead of the committed log.
    #[error("edit tagged revision {revision}, but the log is at revision {current}")]
    RevisionAhead {
        /// Revision claimed by the client.
        revision: Revision,
        /// Current length of the committed log.
        current: Revision,
    },

    /// Transform or apply failed on incompatible operations.
    #[error("incompatible operations: {0}")]
    Algebra(#[from] OTError),
}
