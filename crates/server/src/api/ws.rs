//! Viewer sessions over WebSocket.
//!
//! A viewer only listens: each gallery event arrives as a text frame holding
//! the event tag (e.g. `image_uploaded`). Inbound text is ignored.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::debug;

use galleria_gallery::Session;

use super::AppState;

/// `GET /ws` -- upgrade to a viewer session.
///
/// The session is registered before the handshake completes and only
/// marked open once the socket is live. If the upgrade never happens the
/// session is dropped, which unregisters it.
pub async fn viewer(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let session = state.gallery.connect();
    ws.on_upgrade(move |socket| run_session(socket, session))
}

async fn run_session(socket: WebSocket, mut session: Session) {
    session.mark_open();
    debug!(session = %session.id(), "viewer connected");
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = session.recv() => {
                let Some(event) = event else { break };
                if sink.send(Message::Text(event.tag().into())).await.is_err() {
                    break;
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    session.close();
    debug!(session = %session.id(), "viewer disconnected");
}
