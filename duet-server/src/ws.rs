use crate::link::{detach, dispatch};
use crate::relay::SignalRelay;
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use duet_core::{ClientMessage, IceServerConfig, PartyId, RelayEvent};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<SignalRelay>,
    pub ice_servers: Vec<IceServerConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let party_id = PartyId::new();
    info!("New WebSocket connection: {party_id}");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.relay.subscribe(party_id.clone(), tx.clone());
    let _ = tx.send(RelayEvent::Welcome {
        party_id: party_id.clone(),
        ice_servers: state.ice_servers.clone(),
    });

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize relay event: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let relay = Arc::clone(&state.relay);
        let party_id = party_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => dispatch(&relay, &party_id, client_msg),
                        // A malformed frame rejects that one message only;
                        // the connection stays up.
                        Err(e) => warn!("Invalid message from {party_id}: {e}"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    detach(&state.relay, &party_id);
    info!("WebSocket disconnected: {party_id}");
}
