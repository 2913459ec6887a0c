//! Transport session: one logical connection to the document server.
//!
//! The session is a synchronous event dispatcher. A driver (the real
//! WebSocket wire in [`crate::wire`], or a test harness) feeds it
//! [`SessionEvent`]s and executes the [`SessionAction`]s it returns.
//! All mutation of the engine, the adapter, and the connection flags
//! happens inside one `handle` call; no two calls ever interleave on
//! the same session.

use crate::adapter::{EditAdapter, EditorChange};
use crate::config::SessionConfig;
use crate::engine::{ClientEvent, Effect, SyncEngine};
use crate::error::ClientResult;
use opdoc_protocol::ServerMessage;
use tracing::{debug, warn};

/// Read/overwrite access to the editor's document.
///
/// `set_text` must not be re-observed as a new local change event;
/// implementations route engine-originated overwrites through a
/// non-event-raising path. The session is the only caller of
/// `set_text`, and the adapter is the only producer of local-edit
/// operations, so there is no reentrancy flag to get wrong.
pub trait EditorHandle {
    /// Reads the full current document text.
    fn read_text(&self) -> String;

    /// Overwrites the full document text without raising change events.
    fn set_text(&mut self, text: &str);
}

/// Connection status of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No wire and no attempt in progress.
    Disconnected,
    /// One connection attempt is in progress.
    Connecting,
    /// A wire is open.
    Connected,
}

/// An event fed to the session by its driver.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The reconnect timer fired.
    Tick,
    /// The connection attempt succeeded.
    Opened,
    /// The wire closed, or a connection attempt failed.
    Closed,
    /// The wire reported an error; treated like a close.
    WireError(String),
    /// A text frame arrived from the server.
    Incoming(String),
    /// The editor reported a local change.
    Edit(EditorChange),
}

/// An instruction for the driver to execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a new connection to the configured URL.
    Connect,
    /// Send a text frame on the wire.
    SendText(String),
    /// Report to the host that the session is connected.
    NotifyConnected,
    /// Report to the host that the session is disconnected.
    NotifyDisconnected,
}

/// A client session: engine + adapter + connection bookkeeping.
///
/// On disconnect the state machine is torn down and rebuilt with the
/// retained revision; identity resets to unset and any outstanding or
/// buffered operation is dropped. Recovery relies on the server's
/// history replay, never on resending (see DESIGN.md).
pub struct Session<E: EditorHandle> {
    config: SessionConfig,
    editor: E,
    engine: SyncEngine,
    adapter: EditAdapter,
    status: ConnectionStatus,
}

impl<E: EditorHandle> Session<E> {
    /// Creates a disconnected session around an editor handle.
    pub fn new(config: SessionConfig, editor: E) -> Self {
        let initial_len = editor.read_text().chars().count();
        Self {
            config,
            editor,
            engine: SyncEngine::new(),
            adapter: EditAdapter::with_len(initial_len),
            status: ConnectionStatus::Disconnected,
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// The underlying synchronization engine.
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// The editor handle.
    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Dispatches one event.
    ///
    /// A fatal error tears the session down: the driver must close the
    /// wire and stop feeding events. Transport-level events never
    /// return errors.
    pub fn handle(&mut self, event: SessionEvent) -> ClientResult<Vec<SessionAction>> {
        match event {
            SessionEvent::Tick => Ok(self.tick()),
            SessionEvent::Opened => Ok(self.opened()),
            SessionEvent::Closed => Ok(self.closed()),
            SessionEvent::WireError(reason) => {
                warn!(%reason, "wire error");
                Ok(self.closed())
            }
            SessionEvent::Incoming(text) => self.incoming(&text),
            SessionEvent::Edit(change) => self.local_edit(&change),
        }
    }

    /// Attempts a connection while disconnected; never runs two
    /// attempts concurrently.
    fn tick(&mut self) -> Vec<SessionAction> {
        if self.status != ConnectionStatus::Disconnected {
            return Vec::new();
        }
        self.status = ConnectionStatus::Connecting;
        vec![SessionAction::Connect]
    }

    fn opened(&mut self) -> Vec<SessionAction> {
        debug!(revision = self.engine.revision(), "connected");
        self.status = ConnectionStatus::Connected;
        vec![SessionAction::NotifyConnected]
    }

    /// Tears down the state machine, retaining only the revision.
    fn closed(&mut self) -> Vec<SessionAction> {
        let was_connected = self.status == ConnectionStatus::Connected;
        self.status = ConnectionStatus::Disconnected;
        self.engine = SyncEngine::with_revision(self.engine.revision());
        if was_connected {
            debug!("disconnected");
            vec![SessionAction::NotifyDisconnected]
        } else {
            Vec::new()
        }
    }

    fn incoming(&mut self, text: &str) -> ClientResult<Vec<SessionAction>> {
        let message = ServerMessage::from_json(text)?;
        let effects = self.engine.handle(ClientEvent::Message(message))?;
        self.run_effects(effects)
    }

    fn local_edit(&mut self, change: &EditorChange) -> ClientResult<Vec<SessionAction>> {
        // The adapter tracks length even while disconnected; the
        // editor keeps moving regardless of the wire.
        let op = self.adapter.adapt(change)?;
        if self.status != ConnectionStatus::Connected {
            debug!("dropping local edit while disconnected");
            return Ok(Vec::new());
        }
        let effects = self.engine.handle(ClientEvent::LocalEdit(op))?;
        self.run_effects(effects)
    }

    fn run_effects(&mut self, effects: Vec<Effect>) -> ClientResult<Vec<SessionAction>> {
        let mut actions = Vec::new();
        for effect in effects {
            match effect {
                Effect::Send(message) => {
                    actions.push(SessionAction::SendText(message.to_json()?));
                }
                Effect::ApplyToEditor(op) => {
                    let text = self.editor.read_text();
                    let updated = op.apply(&text)?;
                    self.editor.set_text(&updated);
                    self.adapter.observe_applied(&op)?;
                }
                Effect::IdentityAssigned(id) => {
                    debug!(identity = id, "identity assigned");
                }
            }
        }
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SyncState;
    use crate::error::ClientError;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Editor stand-in: a shared string the test can inspect.
    #[derive(Clone, Default)]
    struct FakeEditor(Rc<RefCell<String>>);

    impl FakeEditor {
        fn with_text(text: &str) -> Self {
            Self(Rc::new(RefCell::new(text.to_string())))
        }

        fn text(&self) -> String {
            self.0.borrow().clone()
        }
    }

    impl EditorHandle for FakeEditor {
        fn read_text(&self) -> String {
            self.0.borrow().clone()
        }

        fn set_text(&mut self, text: &str) {
            *self.0.borrow_mut() = text.to_string();
        }
    }

    fn connected_session(text: &str) -> (Session<FakeEditor>, FakeEditor) {
        let editor = FakeEditor::with_text(text);
        let mut session = Session::new(SessionConfig::new("ws://test"), editor.clone());
        session.handle(SessionEvent::Tick).unwrap();
        session.handle(SessionEvent::Opened).unwrap();
        session
            .handle(SessionEvent::Incoming(r#"{"Identity":0}"#.into()))
            .unwrap();
        (session, editor)
    }

    #[test]
    fn tick_connects_once() {
        let editor = FakeEditor::default();
        let mut session = Session::new(SessionConfig::new("ws://test"), editor);

        assert_eq!(
            session.handle(SessionEvent::Tick).unwrap(),
            vec![SessionAction::Connect]
        );
        assert_eq!(session.status(), ConnectionStatus::Connecting);

        // Further ticks while an attempt is in progress do nothing.
        assert!(session.handle(SessionEvent::Tick).unwrap().is_empty());

        session.handle(SessionEvent::Opened).unwrap();
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert!(session.handle(SessionEvent::Tick).unwrap().is_empty());
    }

    #[test]
    fn failed_attempt_allows_retry() {
        let editor = FakeEditor::default();
        let mut session = Session::new(SessionConfig::new("ws://test"), editor);

        session.handle(SessionEvent::Tick).unwrap();
        let actions = session.handle(SessionEvent::Closed).unwrap();
        assert!(actions.is_empty(), "no disconnect notice for a failed attempt");
        assert_eq!(session.status(), ConnectionStatus::Disconnected);

        assert_eq!(
            session.handle(SessionEvent::Tick).unwrap(),
            vec![SessionAction::Connect]
        );
    }

    #[test]
    fn local_edit_is_sent_when_connected() {
        let (mut session, editor) = connected_session("abc");
        // The editor applies the change itself before the event reaches us.
        session.editor.set_text("aXbc");

        let actions = session
            .handle(SessionEvent::Edit(EditorChange::insert(1, "X")))
            .unwrap();
        assert_eq!(
            actions,
            vec![SessionAction::SendText(
                r#"{"Edit":{"revision":0,"operation":[1,"X",2]}}"#.into()
            )]
        );
        assert_eq!(editor.text(), "aXbc");
    }

    #[test]
    fn remote_operation_applied_to_editor() {
        let (mut session, editor) = connected_session("abc");

        let actions = session
            .handle(SessionEvent::Incoming(
                r#"{"History":{"start":0,"operations":[{"id":1,"operation":[1,"Z",2]}]}}"#.into(),
            ))
            .unwrap();
        assert!(actions.is_empty());
        assert_eq!(editor.text(), "aZbc");
        assert_eq!(session.engine().revision(), 1);
    }

    #[test]
    fn ack_promotes_buffer_and_sends_it() {
        let (mut session, _editor) = connected_session("abc");
        session.editor.set_text("aXbc");
        session
            .handle(SessionEvent::Edit(EditorChange::insert(1, "X")))
            .unwrap();
        session.editor.set_text("Xbc");
        session
            .handle(SessionEvent::Edit(EditorChange::remove(0, "a")))
            .unwrap();
        assert_eq!(session.engine().state(), SyncState::AwaitingAckWithBuffer);

        let actions = session
            .handle(SessionEvent::Incoming(
                r#"{"History":{"start":0,"operations":[{"id":0,"operation":[1,"X",2]}]}}"#.into(),
            ))
            .unwrap();
        assert_eq!(
            actions,
            vec![SessionAction::SendText(
                r#"{"Edit":{"revision":1,"operation":[-1,3]}}"#.into()
            )]
        );
        assert_eq!(session.engine().state(), SyncState::AwaitingAck);
    }

    #[test]
    fn edits_while_disconnected_are_dropped_not_queued() {
        let editor = FakeEditor::with_text("abc");
        let mut session = Session::new(SessionConfig::new("ws://test"), editor);

        session.editor.set_text("aXbc");
        let actions = session
            .handle(SessionEvent::Edit(EditorChange::insert(1, "X")))
            .unwrap();
        assert!(actions.is_empty());
        assert_eq!(session.engine().state(), SyncState::Synchronized);
    }

    #[test]
    fn disconnect_drops_outstanding_and_resets_identity() {
        let (mut session, _editor) = connected_session("abc");
        session.editor.set_text("aXbc");
        session
            .handle(SessionEvent::Edit(EditorChange::insert(1, "X")))
            .unwrap();
        session
            .handle(SessionEvent::Incoming(
                r#"{"History":{"start":0,"operations":[{"id":1,"operation":[3,"!"]}]}}"#.into(),
            ))
            .unwrap();
        assert_eq!(session.engine().revision(), 1);

        let actions = session.handle(SessionEvent::Closed).unwrap();
        assert_eq!(actions, vec![SessionAction::NotifyDisconnected]);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);

        // Revision persists; identity and in-flight state do not, and
        // nothing is resent on the next connection.
        assert_eq!(session.engine().revision(), 1);
        assert_eq!(session.engine().identity(), None);
        assert_eq!(session.engine().state(), SyncState::Synchronized);

        session.handle(SessionEvent::Tick).unwrap();
        let actions = session.handle(SessionEvent::Opened).unwrap();
        assert_eq!(actions, vec![SessionAction::NotifyConnected]);
    }

    #[test]
    fn protocol_violation_surfaces_as_fatal_error() {
        let (mut session, _editor) = connected_session("");

        let err = session
            .handle(SessionEvent::Incoming(
                r#"{"History":{"start":5,"operations":[]}}"#.into(),
            ))
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, ClientError::HistoryGap { .. }));
    }

    #[test]
    fn malformed_frame_is_fatal() {
        let (mut session, _editor) = connected_session("");
        let err = session
            .handle(SessionEvent::Incoming("garbage".into()))
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
