//! Protocol messages for the client/server wire.

use crate::{ClientId, Revision};
use operational_transform::OperationSeq;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while encoding or decoding wire messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The message text was not valid JSON for the expected shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One committed edit in the canonical log.
///
/// `id` is the identity of the connection that authored the edit; a
/// client compares it against its own identity to distinguish an
/// acknowledgment from a foreign operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Identity of the authoring connection.
    pub id: ClientId,
    /// The committed operation, in server order.
    pub operation: OperationSeq,
}

/// An ordered batch of committed edits starting at revision `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryBatch {
    /// Revision number of the first entry in `operations`.
    pub start: Revision,
    /// Committed edits, in server order.
    pub operations: Vec<HistoryEntry>,
}

impl HistoryBatch {
    /// Revision the log reaches once every entry in the batch is consumed.
    pub fn end(&self) -> Revision {
        self.start + self.operations.len() as Revision
    }
}

/// A message from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Assigns the receiving connection its identity.
    Identity(ClientId),
    /// Replays committed edits from a given revision.
    History(HistoryBatch),
}

/// A message from a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// The client's outstanding edit, tagged with its current revision.
    Edit {
        /// Number of committed operations the client has observed.
        revision: Revision,
        /// The edit, built against the document at `revision`.
        operation: OperationSeq,
    },
}

impl ServerMessage {
    /// Decodes a server message from wire text.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encodes this message to wire text.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ClientMessage {
    /// Decodes a client message from wire text.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encodes this message to wire text.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
