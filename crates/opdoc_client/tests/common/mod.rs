//! Loopback harness: client sessions wired to an in-process reference
//! server, no socket involved. Outbound `SendText` actions are parsed
//! and committed on the server synchronously; `deliver` pumps history
//! back to every client until the whole system is quiescent.

use opdoc_client::{
    ChangeKind, EditorChange, EditorHandle, Session, SessionAction, SessionConfig, SessionEvent,
    SyncState,
};
use opdoc_protocol::{ClientId, ClientMessage, ServerMessage};
use opdoc_server::DocServer;
use std::cell::RefCell;
use std::rc::Rc;

/// A shared editable string standing in for the editor widget.
#[derive(Clone, Default)]
pub struct SharedEditor(Rc<RefCell<String>>);

impl SharedEditor {
    pub fn text(&self) -> String {
        self.0.borrow().clone()
    }

    /// Mutates the text the way the widget does before it emits the
    /// change event.
    pub fn apply_change(&self, change: &EditorChange) {
        let chars: Vec<char> = self.0.borrow().chars().collect();
        let change_len = change.text.chars().count();
        let mut updated = String::new();
        match change.kind {
            ChangeKind::Insert => {
                updated.extend(&chars[..change.start]);
                updated.push_str(&change.text);
                updated.extend(&chars[change.start..]);
            }
            ChangeKind::Remove => {
                updated.extend(&chars[..change.start]);
                updated.extend(&chars[change.start + change_len..]);
            }
        }
        *self.0.borrow_mut() = updated;
    }
}

impl EditorHandle for SharedEditor {
    fn read_text(&self) -> String {
        self.0.borrow().clone()
    }

    fn set_text(&mut self, text: &str) {
        *self.0.borrow_mut() = text.to_string();
    }
}

pub struct LoopbackClient {
    pub id: ClientId,
    pub session: Session<SharedEditor>,
    pub editor: SharedEditor,
}

#[derive(Default)]
pub struct Harness {
    pub server: DocServer,
    pub clients: Vec<LoopbackClient>,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a fresh client and replays the server's initial
    /// messages into it.
    pub fn add_client(&mut self) -> usize {
        let editor = SharedEditor::default();
        let mut session = Session::new(SessionConfig::new("loopback"), editor.clone());
        session.handle(SessionEvent::Tick).unwrap();
        session.handle(SessionEvent::Opened).unwrap();

        let (id, messages) = self.server.connect();
        let index = self.clients.len();
        self.clients.push(LoopbackClient {
            id,
            session,
            editor,
        });
        for message in messages {
            let text = message.to_json().unwrap();
            let actions = self.clients[index]
                .session
                .handle(SessionEvent::Incoming(text))
                .unwrap();
            self.route(index, actions);
        }
        index
    }

    /// Applies a local change at one client and forwards whatever it
    /// sends.
    pub fn edit(&mut self, index: usize, change: EditorChange) {
        self.clients[index].editor.apply_change(&change);
        let actions = self.clients[index]
            .session
            .handle(SessionEvent::Edit(change))
            .unwrap();
        self.route(index, actions);
    }

    fn route(&mut self, index: usize, actions: Vec<SessionAction>) {
        let id = self.clients[index].id;
        for action in actions {
            if let SessionAction::SendText(text) = action {
                let message = ClientMessage::from_json(&text).unwrap();
                self.server.handle_message(id, message).unwrap();
            }
        }
    }

    /// Pumps history to every client until no client is behind the
    /// server and nothing is left in flight.
    pub fn deliver(&mut self) {
        loop {
            let mut progressed = false;
            for index in 0..self.clients.len() {
                let revision = self.clients[index].session.engine().revision();
                if let Some(batch) = self.server.history_since(revision) {
                    let text = ServerMessage::History(batch).to_json().unwrap();
                    let actions = self.clients[index]
                        .session
                        .handle(SessionEvent::Incoming(text))
                        .unwrap();
                    self.route(index, actions);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
    }

    /// Asserts every replica equals the canonical text and every
    /// engine is idle.
    pub fn assert_converged(&self) {
        let canonical = self.server.text();
        for client in &self.clients {
            assert_eq!(
                client.editor.text(),
                canonical,
                "client {} diverged",
                client.id
            );
            assert_eq!(client.session.engine().state(), SyncState::Synchronized);
        }
    }
}
