//! The shared document server.

use crate::document::Document;
use crate::error::ServerResult;
use opdoc_protocol::{ClientId, ClientMessage, HistoryBatch, Revision, ServerMessage};
use operational_transform::OperationSeq;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tracing::info;

/// One shared document, its committed history, and the connection
/// counter that assigns client identities.
///
/// The server is transport-agnostic: a wire binding calls
/// [`DocServer::connect`] when a socket opens, feeds inbound frames to
/// [`DocServer::handle_message`], and pumps [`DocServer::next_history`]
/// back out to the client.
#[derive(Debug, Default)]
pub struct DocServer {
    document: RwLock<Document>,
    next_id: AtomicU64,
    notify: Notify,
}

impl DocServer {
    /// Creates a server holding an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical text.
    pub fn text(&self) -> String {
        self.document.read().text().to_string()
    }

    /// The canonical revision.
    pub fn revision(&self) -> Revision {
        self.document.read().revision()
    }

    /// Registers a new connection.
    ///
    /// Returns the assigned identity and the initial messages to send:
    /// the identity assignment, then a full history replay when the
    /// log is non-empty.
    pub fn connect(&self) -> (ClientId, Vec<ServerMessage>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(id, "connection");

        let mut messages = vec![ServerMessage::Identity(id)];
        if let Some(batch) = self.history_since(0) {
            messages.push(ServerMessage::History(batch));
        }
        (id, messages)
    }

    /// Handles one parsed message from a connected client.
    pub fn handle_message(&self, id: ClientId, message: ClientMessage) -> ServerResult<()> {
        match message {
            ClientMessage::Edit {
                revision,
                operation,
            } => self.apply_edit(id, revision, operation),
        }
    }

    /// Commits a client edit and wakes every replay pump.
    pub fn apply_edit(
        &self,
        id: ClientId,
        revision: Revision,
        operation: OperationSeq,
    ) -> ServerResult<()> {
        self.document.write().commit(id, revision, operation)?;
        self.notify.notify_waiters();
        Ok(())
    }

    /// Returns committed operations from `start`, if any.
    pub fn history_since(&self, start: Revision) -> Option<HistoryBatch> {
        self.document.read().history_since(start)
    }

    /// Waits until operations past `from` exist, then returns them.
    ///
    /// One such pump runs per connection, replaying everything the
    /// client has not yet seen in commit order.
    pub async fn next_history(&self, from: Revision) -> HistoryBatch {
        loop {
            let notified = self.notify.notified();
            if let Some(batch) = self.history_since(from) {
                return batch;
            }
            notified.await;
        }
    }
}
