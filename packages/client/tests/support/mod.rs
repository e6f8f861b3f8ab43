//! Shared helpers for the chat client integration tests.
//!
//! - [`RecordingTransport`] and [`Harness`] drive a `ChatSession` by hand
//! - [`Backend`] is an in-process axum chat endpoint speaking the wire protocol

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use agora_client::{
    ChatSession,
    connection::{
        ConnectionId, ConnectionManager, StaticToken, Transport, TransportError, TransportEvent,
    },
    session::RoomSession,
};
use axum::{
    Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tokio::sync::{broadcast, watch};

pub const TOKEN: &str = "test-token";
pub const USER_ID: &str = "u-1";
pub const NICKNAME: &str = "alice";
pub const ENDPOINT: &str = "ws://chat.test/ws/chat";

// ========================================
// Recording transport
// ========================================

#[derive(Debug, Default)]
pub struct Recording {
    pub opened: Vec<(ConnectionId, String)>,
    pub sent: Vec<String>,
    pub closes: usize,
}

/// Transport that records every call and never touches the network
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    recording: Arc<Mutex<Recording>>,
}

impl RecordingTransport {
    pub fn last_connection(&self) -> Option<ConnectionId> {
        self.recording.lock().unwrap().opened.last().map(|(id, _)| *id)
    }

    pub fn last_url(&self) -> Option<String> {
        self.recording
            .lock()
            .unwrap()
            .opened
            .last()
            .map(|(_, url)| url.clone())
    }

    pub fn open_count(&self) -> usize {
        self.recording.lock().unwrap().opened.len()
    }

    pub fn close_count(&self) -> usize {
        self.recording.lock().unwrap().closes
    }

    /// Frames sent since the last call, parsed as JSON
    pub fn take_sent(&self) -> Vec<Value> {
        let sent = std::mem::take(&mut self.recording.lock().unwrap().sent);
        sent.iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn open(&mut self, connection: ConnectionId, url: &str) -> Result<(), TransportError> {
        self.recording
            .lock()
            .unwrap()
            .opened
            .push((connection, url.to_string()));
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.recording.lock().unwrap().sent.push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.recording.lock().unwrap().closes += 1;
    }
}

/// A session wired to a [`RecordingTransport`]
pub struct Harness {
    pub session: ChatSession<RecordingTransport, StaticToken>,
    pub transport: RecordingTransport,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_token(StaticToken::new(TOKEN))
    }

    pub fn with_token(token: StaticToken) -> Self {
        let transport = RecordingTransport::default();
        let connection = ConnectionManager::new(transport.clone(), token, ENDPOINT);
        let session = ChatSession::new(connection, RoomSession::new(50, 200));
        Self { session, transport }
    }

    fn connection(&self) -> ConnectionId {
        self.transport
            .last_connection()
            .expect("no connection was opened")
    }

    /// Connect and report the transport as open
    pub fn open(&mut self) -> ConnectionId {
        self.session.connect().unwrap();
        let connection = self.connection();
        self.session
            .handle_transport_event(TransportEvent::opened(connection));
        connection
    }

    /// Deliver an envelope on the current connection
    pub fn deliver(&mut self, envelope: Value) {
        self.deliver_raw(envelope.to_string().into_bytes());
    }

    pub fn deliver_raw(&mut self, frame: Vec<u8>) {
        let connection = self.connection();
        self.session
            .handle_transport_event(TransportEvent::frame(connection, frame));
    }

    /// Report the current connection as failed
    pub fn fail(&mut self, reason: &str) {
        let connection = self.connection();
        self.session
            .handle_transport_event(TransportEvent::failed(connection, reason));
    }

    pub fn message_ids(&self) -> Vec<String> {
        self.session.messages().into_iter().map(|m| m.id).collect()
    }
}

// ========================================
// Envelope builders
// ========================================

pub fn history_result(request_id: &Value, ids: &[&str]) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "content": format!("history {id}"),
                "created_at": "2024-05-01T10:00:00Z",
            })
        })
        .collect();
    json!({
        "v": 1,
        "type": "chat.history.result",
        "requestId": request_id,
        "data": { "items": items },
    })
}

pub fn live_message(room_id: &str, id: &str) -> Value {
    json!({
        "v": 1,
        "type": "chat.message",
        "data": {
            "id": id,
            "roomId": room_id,
            "sender": { "id": "u-2", "nickname": "bob" },
            "content": format!("live {id}"),
            "created_at": "2024-05-01T10:05:00Z",
        },
    })
}

// ========================================
// In-process backend
// ========================================

#[derive(Default)]
struct Store {
    rooms: Mutex<HashMap<String, Vec<Value>>>,
    next_id: AtomicU64,
}

#[derive(Clone)]
struct BackendState {
    store: Arc<Store>,
    kick: broadcast::Sender<()>,
}

/// Chat endpoint accepting [`TOKEN`] at `/ws/chat`
pub struct Backend {
    pub url: String,
    state: BackendState,
}

impl Backend {
    pub async fn start() -> Self {
        let (kick, _) = broadcast::channel(4);
        let state = BackendState {
            store: Arc::new(Store::default()),
            kick,
        };
        let app = Router::new()
            .route("/ws/chat", get(websocket_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("ws://{}/ws/chat", addr),
            state,
        }
    }

    /// Store a message as if another user had sent it earlier
    pub fn seed(&self, room_id: &str, content: &str) {
        self.state.store.add(room_id, "u-2", "bob", content);
    }

    /// Drop every open connection
    pub fn kick_all(&self) {
        let _ = self.state.kick.send(());
    }
}

impl Store {
    fn add(&self, room_id: &str, sender_id: &str, nickname: &str, content: &str) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let message = json!({
            "id": format!("m-{id}"),
            "roomId": room_id,
            "sender": { "id": sender_id, "nickname": nickname },
            "content": content,
            "created_at": chrono::Utc::now().to_rfc3339(),
        });
        self.rooms
            .lock()
            .unwrap()
            .entry(room_id.to_string())
            .or_default()
            .push(message.clone());
        message
    }

    fn history(&self, room_id: &str, limit: usize) -> Vec<Value> {
        let rooms = self.rooms.lock().unwrap();
        let messages = rooms.get(room_id).cloned().unwrap_or_default();
        let skip = messages.len().saturating_sub(limit);
        messages
            .into_iter()
            .skip(skip)
            .map(|m| json!({ "id": m["id"], "content": m["content"], "created_at": m["created_at"] }))
            .collect()
    }
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<BackendState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if query.get("token").map(String::as_str) != Some(TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn envelope(kind: &str, request_id: &Value, data: Option<Value>) -> Value {
    let mut envelope = json!({ "v": 1, "type": kind });
    if !request_id.is_null() {
        envelope["requestId"] = request_id.clone();
    }
    if let Some(data) = data {
        envelope["data"] = data;
    }
    envelope
}

fn error(request_id: &Value, code: i64, message: &str) -> Value {
    let mut envelope = envelope("error", request_id, None);
    envelope["error"] = json!({ "code": code, "message": message });
    envelope
}

async fn handle_socket(mut socket: WebSocket, state: BackendState) {
    let mut kick = state.kick.subscribe();
    let mut joined: Option<String> = None;

    let connected = envelope(
        "system.connected",
        &Value::Null,
        Some(json!({ "userId": USER_ID })),
    );
    if socket
        .send(Message::Text(connected.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            _ = kick.recv() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            message = socket.recv() => {
                let Some(Ok(message)) = message else { break };
                let Message::Text(text) = message else { continue };
                let Ok(request) = serde_json::from_str::<Value>(text.as_str()) else { continue };
                for reply in respond(&state.store, &request, &mut joined) {
                    if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

fn respond(store: &Store, request: &Value, joined: &mut Option<String>) -> Vec<Value> {
    let request_id = &request["requestId"];
    let data = &request["data"];
    let room_id = data["roomId"].as_str().unwrap_or_default().to_string();

    match request["type"].as_str().unwrap_or_default() {
        "chat.join" if !room_id.is_empty() => {
            *joined = Some(room_id.clone());
            vec![envelope(
                "chat.joined",
                request_id,
                Some(json!({ "roomId": room_id })),
            )]
        }
        "chat.join" => vec![error(request_id, 3002, "invalid join payload")],
        "chat.history" if !room_id.is_empty() => {
            let limit = data["limit"].as_u64().unwrap_or(50) as usize;
            vec![envelope(
                "chat.history.result",
                request_id,
                Some(json!({ "items": store.history(&room_id, limit) })),
            )]
        }
        "chat.history" => vec![error(request_id, 3005, "invalid history payload")],
        "chat.send" => {
            let content = data["content"].as_str().unwrap_or_default();
            if room_id.is_empty() || content.is_empty() {
                return vec![error(request_id, 3003, "invalid send payload")];
            }
            if joined.as_deref() != Some(room_id.as_str()) {
                return vec![error(request_id, 3004, "not joined")];
            }
            let message = store.add(&room_id, USER_ID, NICKNAME, content);
            vec![envelope("chat.message", &Value::Null, Some(message))]
        }
        "system.ping" => vec![envelope("system.pong", request_id, None)],
        _ => vec![error(request_id, 3001, "unknown event")],
    }
}

// ========================================
// Waiting
// ========================================

/// Wait until the watched value satisfies `predicate`, or panic after 5s
pub async fn wait_for<T: Clone>(
    receiver: &mut watch::Receiver<T>,
    predicate: impl FnMut(&T) -> bool,
) -> T {
    tokio::time::timeout(Duration::from_secs(5), receiver.wait_for(predicate))
        .await
        .expect("timed out waiting for session state")
        .map(|value| value.clone())
        .expect("session task stopped")
}
