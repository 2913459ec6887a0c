//! Synchronization engine state machine.
//!
//! The engine owns the revision counter, the outstanding and buffer
//! operation slots, and the transform/compose protocol. It consumes
//! explicit events (adapted local edits and parsed server messages)
//! through a single dispatch function and produces effects (outbound
//! wire messages and local-apply instructions), so it can be unit
//! tested deterministically without a socket or a widget.

use crate::error::{ClientError, ClientResult};
use crate::history::{self, EntryKind};
use opdoc_protocol::{ClientId, ClientMessage, HistoryBatch, Revision, ServerMessage};
use operational_transform::OperationSeq;

/// The current state of the synchronization engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No local edit is awaiting acknowledgment.
    Synchronized,
    /// One local edit has been sent and not yet acknowledged.
    AwaitingAck,
    /// One edit is in flight and further edits are buffered behind it.
    AwaitingAckWithBuffer,
}

impl SyncState {
    /// Returns true if a local edit is awaiting acknowledgment.
    pub fn is_awaiting(&self) -> bool {
        !matches!(self, SyncState::Synchronized)
    }
}

/// An event consumed by the engine.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A local edit, already adapted into an operation against the
    /// current document.
    LocalEdit(OperationSeq),
    /// A parsed message from the server.
    Message(ServerMessage),
}

/// An instruction produced by the engine for its caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a message to the server.
    Send(ClientMessage),
    /// Apply a transformed remote operation to the local document.
    ApplyToEditor(OperationSeq),
    /// The server assigned this connection its identity.
    IdentityAssigned(ClientId),
}

/// The client-side OT synchronization state machine.
///
/// Invariants:
/// - `buffer` is never set while `outstanding` is unset.
/// - At most one operation from this client is unacknowledged on the
///   server at any time.
/// - `revision` advances exactly once per history entry consumed and
///   never decreases.
#[derive(Debug, Default)]
pub struct SyncEngine {
    revision: Revision,
    identity: Option<ClientId>,
    outstanding: Option<OperationSeq>,
    buffer: Option<OperationSeq>,
}

impl SyncEngine {
    /// Creates an engine at revision zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine that resumes from a retained revision.
    ///
    /// Used when rebuilding the machine after a reconnect: identity is
    /// unset until the server reassigns it, but the revision persists
    /// so the server's replay can be sliced to the unseen suffix.
    pub fn with_revision(revision: Revision) -> Self {
        Self {
            revision,
            ..Self::default()
        }
    }

    /// The number of committed operations this client has accounted for.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// The identity the server assigned to this connection, if any.
    pub fn identity(&self) -> Option<ClientId> {
        self.identity
    }

    /// The derived protocol state.
    pub fn state(&self) -> SyncState {
        // The buffer slot is only ever filled while outstanding is set,
        // and an ack moves buffer into outstanding atomically.
        match (&self.outstanding, &self.buffer) {
            (Some(_), Some(_)) => SyncState::AwaitingAckWithBuffer,
            (Some(_), None) => SyncState::AwaitingAck,
            (None, _) => SyncState::Synchronized,
        }
    }

    /// Dispatches one event, returning the effects to execute in order.
    pub fn handle(&mut self, event: ClientEvent) -> ClientResult<Vec<Effect>> {
        let mut effects = Vec::new();
        match event {
            ClientEvent::LocalEdit(op) => self.local_edit(op, &mut effects)?,
            ClientEvent::Message(ServerMessage::Identity(id)) => {
                self.identity = Some(id);
                effects.push(Effect::IdentityAssigned(id));
            }
            ClientEvent::Message(ServerMessage::History(batch)) => {
                self.history(&batch, &mut effects)?;
            }
        }
        Ok(effects)
    }

    fn local_edit(&mut self, op: OperationSeq, effects: &mut Vec<Effect>) -> ClientResult<()> {
        match self.outstanding {
            None => {
                effects.push(self.edit_message(&op));
                self.outstanding = Some(op);
            }
            Some(_) => match self.buffer.take() {
                None => self.buffer = Some(op),
                // Earliest edit composed first, preserving temporal order.
                Some(buffer) => self.buffer = Some(buffer.compose(&op)?),
            },
        }
        Ok(())
    }

    fn history(&mut self, batch: &HistoryBatch, effects: &mut Vec<Effect>) -> ClientResult<()> {
        let unseen = history::unseen_entries(batch.start, self.revision, &batch.operations)?;
        for entry in unseen {
            self.revision += 1;
            match history::classify(entry, self.identity) {
                EntryKind::Own => self.ack(effects)?,
                EntryKind::Foreign => self.foreign(entry.operation.clone(), effects)?,
            }
        }
        Ok(())
    }

    /// The server committed this client's outstanding operation.
    ///
    /// The buffer, if any, becomes the new outstanding and is sent
    /// immediately: it was never on the wire while buffered.
    fn ack(&mut self, effects: &mut Vec<Effect>) -> ClientResult<()> {
        if self.outstanding.take().is_none() {
            return Err(ClientError::AckWithoutOutstanding);
        }
        self.outstanding = self.buffer.take();
        if let Some(op) = &self.outstanding {
            effects.push(Effect::Send(ClientMessage::Edit {
                revision: self.revision,
                operation: op.clone(),
            }));
        }
        Ok(())
    }

    /// A foreign operation committed ahead of ours.
    ///
    /// Outstanding is transformed first: it was generated against an
    /// older document state than the buffer, and transforming in the
    /// wrong order corrupts convergence.
    fn foreign(&mut self, mut server_op: OperationSeq, effects: &mut Vec<Effect>) -> ClientResult<()> {
        if let Some(outstanding) = self.outstanding.take() {
            let (outstanding, transformed) = outstanding.transform(&server_op)?;
            self.outstanding = Some(outstanding);
            server_op = transformed;

            if let Some(buffer) = self.buffer.take() {
                let (buffer, transformed) = buffer.transform(&server_op)?;
                self.buffer = Some(buffer);
                server_op = transformed;
            }
        }
        if !server_op.is_noop() {
            effects.push(Effect::ApplyToEditor(server_op));
        }
        Ok(())
    }

    fn edit_message(&self, op: &OperationSeq) -> Effect {
        Effect::Send(ClientMessage::Edit {
            revision: self.revision,
            operation: op.clone(),
        })
    }
}
