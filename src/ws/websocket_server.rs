use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::commands::Command;
use crate::controller::Snapshot;

#[derive(Debug, Serialize)]
pub struct WebSocketResponse {
    pub success: bool,
    pub message: Option<String>,
    pub state: Option<Snapshot>,
}

impl WebSocketResponse {
    fn ok(state: Snapshot) -> Self {
        Self {
            success: true,
            message: None,
            state: Some(state),
        }
    }

    fn failed(message: String, state: Option<Snapshot>) -> Self {
        Self {
            success: false,
            message: Some(message),
            state,
        }
    }
}

/// Answer one text frame: a JSON command in, a response with the new state out.
pub fn handle_text(app: &App, text: &str) -> WebSocketResponse {
    match serde_json::from_str::<Command>(text) {
        Ok(command) => {
            debug!(?command, "websocket command");
            match app.apply(command) {
                Ok(state) => WebSocketResponse::ok(state),
                Err(e) => WebSocketResponse::failed(e.to_string(), Some(app.snapshot())),
            }
        }
        Err(e) => {
            warn!("failed to parse message: {e}");
            WebSocketResponse::failed(format!("Parse error: {e}"), None)
        }
    }
}

pub async fn start_websocket_server(addr: SocketAddr, app: App) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("WebSocket server listening on: {addr}");

    while let Ok((stream, peer_addr)) = listener.accept().await {
        info!("New WebSocket connection from: {peer_addr}");
        tokio::spawn(handle_connection(stream, peer_addr, app.clone()));
    }

    Ok(())
}

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, app: App) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake failed with {peer_addr}: {e}");
            return;
        }
    };

    debug!("WebSocket handshake completed with {peer_addr}");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut updates = app.subscribe();

    loop {
        let reply = tokio::select! {
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => Some(handle_text(&app, &text)),
                Some(Ok(Message::Close(_))) | None => {
                    info!("WebSocket connection closed by {peer_addr}");
                    break;
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                        warn!("Failed to send pong: {e}");
                        break;
                    }
                    None
                }
                Some(Ok(_)) => None,
                Some(Err(e)) => {
                    warn!("WebSocket error from {peer_addr}: {e}");
                    break;
                }
            },
            update = updates.recv() => match update {
                Ok(state) => Some(WebSocketResponse::ok(state)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("{peer_addr} lagged behind by {skipped} updates");
                    None
                }
                Err(RecvError::Closed) => break,
            },
        };

        let Some(reply) = reply else { continue };
        match serde_json::to_string(&reply) {
            Ok(json) => {
                if let Err(e) = ws_sender.send(Message::Text(json)).await {
                    warn!("Failed to send WebSocket response: {e}");
                    break;
                }
            }
            Err(e) => error!("cannot encode response: {e}"),
        }
    }

    info!("WebSocket connection with {peer_addr} terminated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use crate::storage::persist::TASKS_KEY;
    use crate::storage::{KeyValueStore, MemoryStore, Persistence};

    fn app() -> App {
        App::new(Controller::load(Persistence::new(MemoryStore::new())), false)
    }

    #[test]
    fn command_replies_with_new_state() {
        let app = app();
        let response = handle_text(&app, r#"{"type":"addTask","name":"Write report"}"#);
        assert!(response.success);
        let state = response.state.unwrap();
        assert_eq!(state.tasks.len(), 1);
        assert_eq!(state.tasks[0].name, "Write report");

        let json = serde_json::to_string(&WebSocketResponse::ok(state)).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"selectedTaskId\":null"));
        assert!(json.contains("\"isWorkSession\":true"));
    }

    #[test]
    fn parse_errors_are_reported() {
        let response = handle_text(&app(), r#"{"type":"explode"}"#);
        assert!(!response.success);
        assert!(response.message.unwrap().starts_with("Parse error"));
        assert!(response.state.is_none());
    }

    #[test]
    fn task_ids_must_match_exactly() {
        let mut store = MemoryStore::new();
        store
            .set(
                TASKS_KEY,
                r#"[{"id":"5","name":"Five","done":false,"pomodoros":0},
                    {"id":"abc","name":"Letters","done":false,"pomodoros":0}]"#,
            )
            .unwrap();
        let app = App::new(Controller::load(Persistence::new(store)), false);
        let before = app.snapshot().tasks;

        let response = handle_text(&app, r#"{"type":"deleteTask","id":"1"}"#);
        assert!(!response.success);
        let response = handle_text(&app, r#"{"type":"toggleTask","id":"a"}"#);
        assert!(!response.success);
        assert_eq!(app.snapshot().tasks, before);

        let response = handle_text(&app, r#"{"type":"deleteTask","id":"5"}"#);
        assert!(response.success);
        let ids: Vec<String> = response.state.unwrap().tasks.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["abc"]);
    }

    #[test]
    fn unknown_task_keeps_state_in_reply() {
        let response = handle_text(&app(), r#"{"type":"toggleTask","id":"nope"}"#);
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("no task matches `nope`"));
        assert!(response.state.is_some());
    }
}
