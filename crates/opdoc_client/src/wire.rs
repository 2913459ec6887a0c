//! Async WebSocket driver for a [`Session`].
//!
//! Translates socket frames, editor changes, and the reconnect timer
//! into [`SessionEvent`]s and executes the returned actions. The
//! session itself stays synchronous; this module owns the only socket
//! handle.

use crate::adapter::EditorChange;
use crate::error::ClientResult;
use crate::session::{EditorHandle, Session, SessionAction, SessionEvent};
use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// Connection status change reported to the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionNotice {
    /// The session connected.
    Connected,
    /// The session disconnected; reconnect attempts continue.
    Disconnected,
}

type Wire = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Runs a session over a real WebSocket until the editor-change
/// channel closes (session disposed) or a fatal error tears it down.
///
/// Reconnect attempts run on the configured interval while
/// disconnected; the first attempt fires immediately.
pub async fn run<E: EditorHandle>(
    mut session: Session<E>,
    mut edits: mpsc::UnboundedReceiver<EditorChange>,
    notices: mpsc::UnboundedSender<ConnectionNotice>,
) -> ClientResult<()> {
    let url = session.config().url.clone();
    let mut interval = tokio::time::interval(session.config().reconnect_interval);
    let mut wire: Option<Wire> = None;

    loop {
        let Some(event) = next_event(&mut wire, &mut edits, &mut interval).await else {
            // Editor side disposed the session.
            close_wire(&mut wire).await;
            return Ok(());
        };
        if matches!(event, SessionEvent::Closed | SessionEvent::WireError(_)) {
            wire = None;
        }

        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let actions = match session.handle(event) {
                Ok(actions) => actions,
                Err(err) if err.is_fatal() => {
                    warn!(error = %err, "fatal session error, closing");
                    close_wire(&mut wire).await;
                    let _ = notices.send(ConnectionNotice::Disconnected);
                    return Err(err);
                }
                Err(err) => {
                    warn!(error = %err, "transport error");
                    continue;
                }
            };

            for action in actions {
                execute(action, &url, &mut wire, &mut pending, &notices).await;
            }
        }
    }
}

async fn execute(
    action: SessionAction,
    url: &str,
    wire: &mut Option<Wire>,
    pending: &mut VecDeque<SessionEvent>,
    notices: &mpsc::UnboundedSender<ConnectionNotice>,
) {
    match action {
        SessionAction::Connect => match connect_async(url).await {
            Ok((stream, _)) => {
                *wire = Some(stream);
                pending.push_back(SessionEvent::Opened);
            }
            Err(err) => {
                debug!(error = %err, "connection attempt failed");
                pending.push_back(SessionEvent::Closed);
            }
        },
        SessionAction::SendText(text) => {
            if let Some(stream) = wire.as_mut() {
                if let Err(err) = stream.send(Message::Text(text)).await {
                    *wire = None;
                    pending.push_back(SessionEvent::WireError(err.to_string()));
                }
            }
        }
        SessionAction::NotifyConnected => {
            let _ = notices.send(ConnectionNotice::Connected);
        }
        SessionAction::NotifyDisconnected => {
            let _ = notices.send(ConnectionNotice::Disconnected);
        }
    }
}

/// Waits for the next event from the timer, the editor, or the wire.
/// Returns `None` when the editor-change channel has closed.
async fn next_event(
    wire: &mut Option<Wire>,
    edits: &mut mpsc::UnboundedReceiver<EditorChange>,
    interval: &mut tokio::time::Interval,
) -> Option<SessionEvent> {
    loop {
        match wire.as_mut() {
            Some(stream) => {
                tokio::select! {
                    _ = interval.tick() => return Some(SessionEvent::Tick),
                    change = edits.recv() => return change.map(SessionEvent::Edit),
                    frame = stream.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            return Some(SessionEvent::Incoming(text));
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Some(SessionEvent::Closed);
                        }
                        // Ping/pong and binary frames carry nothing for us.
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => {
                            return Some(SessionEvent::WireError(err.to_string()));
                        }
                    },
                }
            }
            None => {
                tokio::select! {
                    _ = interval.tick() => return Some(SessionEvent::Tick),
                    change = edits.recv() => return change.map(SessionEvent::Edit),
                }
            }
        }
    }
}

async fn close_wire(wire: &mut Option<Wire>) {
    if let Some(mut stream) = wire.take() {
        let _ = stream.close(None).await;
    }
}
