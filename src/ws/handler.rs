//! WebSocket upgrade handlers
//!
//! `/ws/peer` carries the remote side's data channel, `/ws/control` the
//! local tracker and UI.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::SessionEvent;
use crate::http::routes::AppError;
use crate::ws::protocol::{ClientMsg, ServerMsg};
use crate::ws::transport::PeerLink;

// ============================================================================
// Peer socket
// ============================================================================

/// Peer upgrade; refused while another link is attached
pub async fn peer_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.peer_connected() {
        warn!("Refused second peer connection");
        return AppError::Conflict("peer already connected".to_string()).into_response();
    }
    ws.on_upgrade(move |socket| handle_peer_socket(socket, state))
}

async fn handle_peer_socket(socket: WebSocket, state: AppState) {
    let (link, mut outbound_rx) = PeerLink::channel();
    let link_id = link.id;

    // Lost the race to another upgrade
    if !state.claim_peer(link_id) {
        warn!(link_id = %link_id, "Refused second peer connection");
        return;
    }

    info!(link_id = %link_id, "Peer connected");
    let (mut ws_sink, ws_stream) = socket.split();

    let opened = SessionEvent::PeerOpened {
        link_id,
        transport: Box::new(link),
    };
    if !state.session.send(opened).await {
        state.release_peer(link_id);
        return;
    }

    // Writer task: session -> peer
    let writer_handle = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(text)).await {
                debug!(link_id = %link_id, error = %e, "Peer send failed");
                break;
            }
        }
    });

    run_peer_reader(link_id, ws_stream, &state).await;

    let _ = state.session.send(SessionEvent::PeerClosed { link_id }).await;
    state.release_peer(link_id);
    writer_handle.abort();

    info!(link_id = %link_id, "Peer disconnected");
}

/// Reader loop: peer -> session, in arrival order
async fn run_peer_reader(link_id: Uuid, mut ws_stream: SplitStream<WebSocket>, state: &AppState) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !state.session.send(SessionEvent::Remote(text)).await {
                    debug!(link_id = %link_id, "Session closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                debug!(link_id = %link_id, "Dropped binary peer payload");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(link_id = %link_id, "Peer initiated close");
                break;
            }
            Err(e) => {
                warn!(link_id = %link_id, error = %e, "Peer socket error");
                break;
            }
        }
    }
}

// ============================================================================
// Control socket
// ============================================================================

pub async fn control_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_control_socket(socket, state))
}

async fn handle_control_socket(socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    info!(client_id = %client_id, "Control client connected");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let mut views = state.session.subscribe();

    // Writer task: view changes -> UI
    let writer_handle = tokio::spawn(async move {
        loop {
            let view = views.borrow_and_update().clone();
            if let Err(e) = send_msg(&mut ws_sink, &ServerMsg::View(view)).await {
                debug!(client_id = %client_id, error = %e, "Control send failed");
                break;
            }
            if views.changed().await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_stream.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Control socket error");
                break;
            }
        };

        let msg = match ClientMsg::decode(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Failed to parse control message");
                continue;
            }
        };

        if !dispatch_control(&state, msg).await {
            debug!(client_id = %client_id, "Session closed");
            break;
        }
    }

    writer_handle.abort();
    info!(client_id = %client_id, "Control client disconnected");
}

/// Route one control message; false once the session is gone
async fn dispatch_control(state: &AppState, msg: ClientMsg) -> bool {
    let event = match msg {
        ClientMsg::Frame { hands } => {
            if !state.frame_limiter.check_frame() {
                debug!("Rate limited hand frame");
                return true;
            }
            state.session.submit_frame(hands);
            return true;
        }
        ClientMsg::Start => SessionEvent::Start,
        ClientMsg::Exit => SessionEvent::Exit,
        ClientMsg::Tap { action } => SessionEvent::Tap(action),
        ClientMsg::Hold { active } => SessionEvent::Hold(active),
    };
    state.session.send(event).await
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
