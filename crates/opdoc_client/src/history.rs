//! History resync handling.
//!
//! Validates an inbound history batch against the locally tracked
//! revision, slices off the already-seen prefix, and classifies each
//! remaining entry as this client's own acknowledgment or a foreign
//! operation.

use crate::error::{ClientError, ClientResult};
use opdoc_protocol::{ClientId, HistoryEntry, Revision};

/// How a history entry is routed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Authored by this client: acknowledges the outstanding operation.
    Own,
    /// Authored by another client: transformed and applied locally.
    Foreign,
}

/// Returns the unseen suffix of a history batch.
///
/// A batch starting past the tracked revision is a gap the client
/// cannot repair and closes the session. A batch starting before it is
/// a replay: the `revision - start` already-consumed entries are
/// skipped, so replaying the same batch twice mutates nothing for the
/// seen prefix.
pub fn unseen_entries<'a>(
    start: Revision,
    revision: Revision,
    entries: &'a [HistoryEntry],
) -> ClientResult<&'a [HistoryEntry]> {
    if start > revision {
        return Err(ClientError::HistoryGap { start, revision });
    }
    let skip = (revision - start) as usize;
    if skip >= entries.len() {
        return Ok(&[]);
    }
    Ok(&entries[skip..])
}

/// Classifies a history entry against this client's identity.
///
/// An unset identity never matches: the server assigns identity before
/// it replays any of this client's own edits.
pub fn classify(entry: &HistoryEntry, identity: Option<ClientId>) -> EntryKind {
    if identity == Some(entry.id) {
        EntryKind::Own
    } else {
        EntryKind::Foreign
    }
}
