//! The canonical document: text plus committed operation log.

use crate::error::{ServerError, ServerResult};
use opdoc_protocol::{ClientId, HistoryBatch, HistoryEntry, Revision};
use operational_transform::OperationSeq;

/// The server-held document state.
///
/// The committed log is the single serialization point of the system:
/// its order is the order every client applies operations in, and the
/// log length is the canonical revision number.
#[derive(Debug, Default)]
pub struct Document {
    text: String,
    log: Vec<HistoryEntry>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The canonical revision: number of committed operations.
    pub fn revision(&self) -> Revision {
        self.log.len() as Revision
    }

    /// Commits one client edit.
    ///
    /// The edit was built against the document at `revision`; it is
    /// transformed past every operation committed since, applied to
    /// the text, and appended to the log. An edit claiming a revision
    /// ahead of the log is rejected.
    pub fn commit(
        &mut self,
        id: ClientId,
        revision: Revision,
        operation: OperationSeq,
    ) -> ServerResult<()> {
        let current = self.revision();
        if revision > current {
            return Err(ServerError::RevisionAhead { revision, current });
        }

        let mut operation = operation;
        for entry in &self.log[revision as usize..] {
            operation = operation.transform(&entry.operation)?.0;
        }

        self.text = operation.apply(&self.text)?;
        self.log.push(HistoryEntry { id, operation });
        Ok(())
    }

    /// Returns the committed suffix from `start`, or `None` if there
    /// is nothing past it.
    pub fn history_since(&self, start: Revision) -> Option<HistoryBatch> {
        if start >= self.revision() {
            return None;
        }
        Some(HistoryBatch {
            start,
            operations: self.log[start as usize..].to_vec(),
        })
    }
}
