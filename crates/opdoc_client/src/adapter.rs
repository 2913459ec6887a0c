//! Edit adapter: turns raw editor change events into operations.
//!
//! The adapter is the only path that produces local-edit operations,
//! and it owns the running document-length bookkeeping. Offsets and
//! lengths are counted in Unicode scalar values, the unit the
//! operation algebra counts in.

use crate::error::{ClientError, ClientResult};
use operational_transform::OperationSeq;

/// The kind of a contiguous editor change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Text was inserted at the offset.
    Insert,
    /// Text was removed starting at the offset.
    Remove,
}

/// A single contiguous change reported by the editor widget.
///
/// Composite multi-region edits are not decomposed here; each change
/// event must already be atomic at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorChange {
    /// Whether text was inserted or removed.
    pub kind: ChangeKind,
    /// Offset of the change, in chars from the start of the document.
    pub start: usize,
    /// The inserted text, or the removed text for a removal.
    pub text: String,
}

impl EditorChange {
    /// Creates an insert change.
    pub fn insert(start: usize, text: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Insert,
            start,
            text: text.into(),
        }
    }

    /// Creates a removal change.
    pub fn remove(start: usize, text: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Remove,
            start,
            text: text.into(),
        }
    }
}

/// Converts editor change events into operations against the tracked
/// document length.
#[derive(Debug, Default)]
pub struct EditAdapter {
    known_len: usize,
}

impl EditAdapter {
    /// Creates an adapter tracking an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an adapter tracking a document of the given length.
    pub fn with_len(known_len: usize) -> Self {
        Self { known_len }
    }

    /// The document length (in chars) the adapter currently tracks.
    pub fn known_len(&self) -> usize {
        self.known_len
    }

    /// Converts one change event into an operation.
    ///
    /// The produced operation is retain(start), then the insert or
    /// delete, then a retain over the rest of the prior document, so
    /// applying it to the prior text yields exactly the new text.
    /// Malformed input is a local invariant violation and fatal to the
    /// session.
    pub fn adapt(&mut self, change: &EditorChange) -> ClientResult<OperationSeq> {
        let change_len = change.text.chars().count();
        if change.start > self.known_len {
            return Err(ClientError::AdapterInput(format!(
                "change offset {} beyond document length {}",
                change.start, self.known_len
            )));
        }

        let mut op = OperationSeq::default();
        op.retain(change.start as u64);

        match change.kind {
            ChangeKind::Insert => {
                op.insert(&change.text);
                op.retain((self.known_len - change.start) as u64);
                self.known_len += change_len;
            }
            ChangeKind::Remove => {
                if change.start + change_len > self.known_len {
                    return Err(ClientError::AdapterInput(format!(
                        "removal of {} chars at offset {} exceeds document length {}",
                        change_len, change.start, self.known_len
                    )));
                }
                op.delete(change_len as u64);
                op.retain((self.known_len - change.start - change_len) as u64);
                self.known_len -= change_len;
            }
        }

        Ok(op)
    }

    /// Records a remote operation the engine has applied to the editor,
    /// advancing the tracked length to the operation's output length.
    pub fn observe_applied(&mut self, op: &OperationSeq) -> ClientResult<()> {
        if op.base_len() != self.known_len {
            return Err(ClientError::LengthMismatch {
                op: op.base_len(),
                doc: self.known_len,
            });
        }
        self.known_len = op.target_len();
        Ok(())
    }
}
