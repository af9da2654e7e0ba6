//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{SessionEvent, SessionInput};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::connections::ConnectionRegistry;
use crate::ws::protocol::{decode_frame, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let connection_id = Uuid::new_v4();
    debug!(connection_id = %connection_id, "WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, connection_id, state))
}

/// Whether a decoded event may pass the per-connection input quota.
/// Events that stop or remove a player are never dropped.
fn admit(rate_limiter: &ConnectionRateLimiter, event: &SessionEvent) -> bool {
    event.ends_activity() || rate_limiter.check_input()
}

/// Keep the player owner index in step with joins and leaves
fn track_ownership(connections: &ConnectionRegistry, connection_id: Uuid, event: &SessionEvent) {
    match event {
        SessionEvent::Join { player_id, .. } => {
            if let Some(previous) = connections.owner_of(player_id).filter(|o| *o != connection_id) {
                debug!(
                    player_id = %player_id,
                    from = %previous,
                    to = %connection_id,
                    "Player rejoined through another connection"
                );
            }
            connections.track_player(connection_id, player_id)
        }
        SessionEvent::Disconnect { player_id } => connections.untrack_player(player_id),
        _ => {}
    }
}

/// Disconnects for every player the closing connection still owns
fn closing_disconnects(connections: &ConnectionRegistry, connection_id: Uuid) -> Vec<SessionInput> {
    connections
        .unregister(connection_id)
        .into_iter()
        .map(|player_id| SessionInput {
            connection_id,
            event: SessionEvent::Disconnect { player_id },
            received_at: unix_millis(),
        })
        .collect()
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, connection_id: Uuid, state: AppState) {
    state.connections.register(connection_id);
    info!(
        connection_id = %connection_id,
        connections = state.connections.len(),
        "New WebSocket connection"
    );

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        connection_id,
        server_time: unix_millis(),
        arena: state.session.arena(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
        cleanup(connection_id, &state).await;
        return;
    }

    run_connection(connection_id, &state, ws_sink, ws_stream).await;

    cleanup(connection_id, &state).await;
    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Drive one connection: session broadcasts out, client events in
async fn run_connection(
    connection_id: Uuid,
    state: &AppState,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
) {
    let rate_limiter = ConnectionRateLimiter::new();
    let encoding = state.config.movement_encoding;
    let input_tx = state.session.input_tx.clone();
    let mut events_rx = state.session.subscribe();
    let (direct_tx, mut direct_rx) = mpsc::channel::<ServerMsg>(16);

    // Writer task: session broadcasts and direct replies -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                direct = direct_rx.recv() => match direct {
                    Some(msg) => msg,
                    None => break,
                },
                received = events_rx.recv() => match received {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            connection_id = %connection_id,
                            lagged_count = n,
                            "Client lagged, skipping {} messages", n
                        );
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(connection_id = %connection_id, "Session channel closed");
                        break;
                    }
                },
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> session
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let event = match decode_frame(&text, encoding) {
                    Ok(event) => event,
                    Err(e) => {
                        if !rate_limiter.check_input() {
                            continue;
                        }
                        warn!(connection_id = %connection_id, error = %e, "Dropping rejected frame");
                        let _ = direct_tx.try_send(ServerMsg::Error {
                            code: e.code().to_string(),
                            message: e.to_string(),
                        });
                        continue;
                    }
                };

                if !admit(&rate_limiter, &event) {
                    warn!(connection_id = %connection_id, "Rate limited input frame");
                    continue;
                }

                track_ownership(&state.connections, connection_id, &event);

                let input = SessionInput {
                    connection_id,
                    event,
                    received_at: unix_millis(),
                };
                if input_tx.send(input).await.is_err() {
                    debug!(connection_id = %connection_id, "Session input channel closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary frame, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Unregister the connection and remove every player it still owns
async fn cleanup(connection_id: Uuid, state: &AppState) {
    if let Some(connected_at) = state.connections.connected_at(connection_id) {
        debug!(
            connection_id = %connection_id,
            duration_ms = unix_millis().saturating_sub(connected_at),
            "Connection ended"
        );
    }

    for input in closing_disconnects(&state.connections, connection_id) {
        debug!(connection_id = %connection_id, event = ?input.event, "Removing orphaned player");
        if state.session.input_tx.send(input).await.is_err() {
            break;
        }
    }

    if state.connections.is_empty() {
        debug!("No connections left");
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}
