//! WebSocket transport in front of the table actors.
//!
//! A client connects with `GET /ws/{table}?username=<name>`; the socket is
//! joined to that table (created on first use) and from then on carries
//! JSON [`ClientEvent`]s inbound and [`ServerEvent`]s outbound. The socket
//! layer validates payloads into the closed event unions and moves
//! messages — every game decision stays inside the table actor.
//!
//! Authentication is an external collaborator and is not handled here; the
//! username query parameter is taken at face value, while every chip
//! balance stays server-side in the ledger.

use axum::{
    Router,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use fair_blackjack::{
    ClientEvent, ServerEvent, TableHandle, TableManager, TableMessage, TableResponse,
    entities::Username,
};

#[derive(Clone)]
pub struct AppState {
    pub table_manager: Arc<TableManager>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/{table_id}", get(websocket_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    username: String,
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(table_id): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, table_id, query.username, state))
}

async fn handle_socket(socket: WebSocket, table_id: String, username: String, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let session = Uuid::new_v4();
    let username = Username::new(&username);

    info!("websocket connected: table='{table_id}', user={username}");

    let handle = state.table_manager.get_or_create(&table_id).await;

    // Fan-out from the table, and direct replies to this client's own
    // intents.
    let (event_tx, mut event_rx) = mpsc::channel::<ServerEvent>(32);
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerEvent>(32);

    if handle
        .send(TableMessage::Subscribe {
            session,
            sender: event_tx,
        })
        .await
        .is_err()
    {
        return;
    }

    // Take a seat before anything else; a full table (or a taken name)
    // turns the connection away.
    let (tx, rx) = oneshot::channel();
    if handle
        .send(TableMessage::Join {
            session,
            username: username.clone(),
            response: tx,
        })
        .await
        .is_err()
    {
        return;
    }
    match rx.await {
        Ok(response) if response.is_success() => {}
        Ok(response) => {
            let event = match response {
                TableResponse::Rejected(reason) => ServerEvent::Rejected { reason },
                other => ServerEvent::Error {
                    message: other
                        .error_message()
                        .unwrap_or_else(|| "join failed".to_string()),
                },
            };
            warn!("table '{table_id}': {username} could not join: {event}");
            if let Ok(json) = serde_json::to_string(&event) {
                let _ = sender.send(Message::Text(json.into())).await;
            }
            let _ = handle.send(TableMessage::Unsubscribe { session }).await;
            return;
        }
        Err(_) => return,
    }

    // Push table events and direct replies out to the socket.
    let send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(event) = event_rx.recv() => event,
                Some(event) = reply_rx.recv() => event,
                else => break,
            };
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive client intents.
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(ClientEvent::Leave) => break,
                    Ok(event) => {
                        debug!("table '{table_id}': {username} {event}");
                        if let Some(reply) = dispatch(&handle, session, event).await
                            && reply_tx.send(reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("malformed message from {username}: {e}");
                        let reply = ServerEvent::Error {
                            message: "invalid message format".to_string(),
                        };
                        if reply_tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!("websocket error for {username}: {e}");
                break;
            }
            _ => {}
        }
    }

    // Cleanup: drop the subscription and release the seat. A disconnect
    // mid-turn counts as an implicit stand inside the table.
    send_task.abort();
    let _ = handle.send(TableMessage::Unsubscribe { session }).await;
    let (tx, rx) = oneshot::channel();
    if handle
        .send(TableMessage::Leave {
            session,
            response: tx,
        })
        .await
        .is_ok()
        && matches!(rx.await, Ok(response) if response.is_success())
    {
        info!("{username} left table '{table_id}'");
    }

    info!("websocket disconnected: table='{table_id}', user={username}");
}

/// Forward one intent to the table. Returns an event for this client only
/// when there is something to say beyond the table's own broadcast (a
/// rejection, a failure, or requested verification data).
async fn dispatch(handle: &TableHandle, session: Uuid, event: ClientEvent) -> Option<ServerEvent> {
    match event {
        ClientEvent::PlaceBet { amount } => {
            respond(handle, |tx| TableMessage::PlaceBet {
                session,
                amount,
                response: tx,
            })
            .await
        }
        ClientEvent::Action { action } => {
            respond(handle, |tx| TableMessage::TakeAction {
                session,
                action,
                response: tx,
            })
            .await
        }
        ClientEvent::TakeInsurance => {
            respond(handle, |tx| TableMessage::TakeInsurance {
                session,
                response: tx,
            })
            .await
        }
        ClientEvent::StartRound => {
            respond(handle, |tx| TableMessage::StartRound {
                session,
                response: tx,
            })
            .await
        }
        ClientEvent::RequestVerification => {
            let (tx, rx) = oneshot::channel();
            handle
                .send(TableMessage::RequestVerification { response: tx })
                .await
                .ok()?;
            let verification = rx.await.ok()?;
            Some(ServerEvent::Verification { verification })
        }
        // Handled by the socket loop.
        ClientEvent::Leave => None,
    }
}

async fn respond<F>(handle: &TableHandle, build: F) -> Option<ServerEvent>
where
    F: FnOnce(oneshot::Sender<TableResponse>) -> TableMessage,
{
    let (tx, rx) = oneshot::channel();
    handle.send(build(tx)).await.ok()?;
    match rx.await.ok()? {
        // The table's broadcast already carries the state change.
        TableResponse::Ack | TableResponse::Seated { .. } => None,
        TableResponse::Rejected(reason) => Some(ServerEvent::Rejected { reason }),
        TableResponse::Failed(message) => Some(ServerEvent::Error { message }),
    }
}
