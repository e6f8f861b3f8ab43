//! Chat session facade.
//!
//! Combines the connection manager and the room session behind the
//! operations a UI needs, and publishes every observable through `watch`
//! channels. All methods run on the caller's thread and never block.

use tokio::sync::watch;

use crate::{
    connection::{
        ConnectionManager, ConnectionSignal, CredentialSource, LossCause, Transport,
        TransportEvent,
    },
    domain::{ChatMessage, ConnectionStatus, RoomId},
    error::SessionError,
    protocol::{CorrelationId, Inbound, OutboundFrame, PROTOCOL_VERSION, decode},
};

use super::room::{RoomSession, RoomUpdate};

/// Surfaced when an inbound frame cannot be decoded
pub const PARSE_FAILED_MESSAGE: &str = "message parse failed";
/// Surfaced when the transport fails
pub const CONNECTION_FAILED_MESSAGE: &str = "connection failed";
/// Surfaced when an operation needs a ready connection
pub const NOT_CONNECTED_MESSAGE: &str = "not connected";

/// Outcome of [`ChatSession::switch_room`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Join and history requests were sent
    Joined,
    /// Not ready yet; the room is joined once the connection opens
    Deferred,
}

/// Point-in-time copy of every observable
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub messages: Vec<ChatMessage>,
    pub last_error: Option<String>,
    pub room: Option<RoomId>,
    pub user_id: Option<String>,
}

/// Receivers for every observable
#[derive(Debug, Clone)]
pub struct SessionWatch {
    pub status: watch::Receiver<ConnectionStatus>,
    pub messages: watch::Receiver<Vec<ChatMessage>>,
    pub last_error: watch::Receiver<Option<String>>,
    pub room: watch::Receiver<Option<RoomId>>,
    pub user_id: watch::Receiver<Option<String>>,
}

pub struct ChatSession<T, C> {
    connection: ConnectionManager<T, C>,
    room: RoomSession,
    deferred_room: Option<RoomId>,
    last_error: watch::Sender<Option<String>>,
    current_room: watch::Sender<Option<RoomId>>,
    user_id: watch::Sender<Option<String>>,
}

impl<T: Transport, C: CredentialSource> ChatSession<T, C> {
    pub fn new(connection: ConnectionManager<T, C>, room: RoomSession) -> Self {
        let (last_error, _) = watch::channel(None);
        let (current_room, _) = watch::channel(None);
        let (user_id, _) = watch::channel(None);
        Self {
            connection,
            room,
            deferred_room: None,
            last_error,
            current_room,
            user_id,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.room.messages()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn current_room(&self) -> Option<RoomId> {
        self.room.active_room().cloned()
    }

    /// Room waiting to be joined once the connection is ready
    pub fn deferred_room(&self) -> Option<&RoomId> {
        self.deferred_room.as_ref()
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.borrow().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status(),
            messages: self.messages(),
            last_error: self.last_error(),
            room: self.current_room(),
            user_id: self.user_id(),
        }
    }

    pub fn subscribe(&self) -> SessionWatch {
        SessionWatch {
            status: self.connection.subscribe(),
            messages: self.room.subscribe(),
            last_error: self.last_error.subscribe(),
            room: self.current_room.subscribe(),
            user_id: self.user_id.subscribe(),
        }
    }

    /// Connect unless a connection is already opening or open
    pub fn connect(&mut self) -> Result<(), SessionError> {
        if self.status().is_active() {
            tracing::debug!("Already {}, connect ignored", self.status());
            return Ok(());
        }
        self.open_connection()
    }

    /// Replace the current connection with a new one
    ///
    /// The joined room is left and not rejoined; a pending deferred request
    /// is kept.
    pub fn reconnect(&mut self) -> Result<(), SessionError> {
        self.room.connection_lost();
        self.publish_room();
        self.open_connection()
    }

    /// Join `room` now, or once the connection becomes ready
    pub fn switch_room(&mut self, room: RoomId) -> Result<SwitchOutcome, SessionError> {
        if !self.status().is_ready() {
            tracing::info!("Not connected yet, joining '{}' once ready", room);
            self.deferred_room = Some(room);
            return Ok(SwitchOutcome::Deferred);
        }
        self.deferred_room = None;
        self.join(room)?;
        Ok(SwitchOutcome::Joined)
    }

    /// Send a chat message to the joined room
    pub fn send(&mut self, text: &str) -> Result<(), SessionError> {
        let content = text.trim();
        if content.is_empty() {
            return Err(SessionError::EmptyContent);
        }
        let status = self.status();
        if !status.is_ready() {
            self.set_error(NOT_CONNECTED_MESSAGE);
            return Err(SessionError::NotReady(status));
        }
        let frame = self.room.send_message(content)?;
        self.transmit(&frame)
    }

    /// Send a `system.ping`
    pub fn ping(&mut self) -> Result<(), SessionError> {
        let status = self.status();
        if !status.is_ready() {
            return Err(SessionError::NotReady(status));
        }
        let frame = self.room.ping()?;
        self.transmit(&frame)
    }

    /// Close the connection and forget all session state
    pub fn disconnect(&mut self) {
        self.connection.disconnect();
        self.room.reset();
        self.deferred_room = None;
        self.publish_room();
        self.clear_error();
    }

    /// Process one transport event
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        let Some(signal) = self.connection.handle_event(event) else {
            return;
        };

        match signal {
            ConnectionSignal::Opened => {
                if let Some(room) = self.deferred_room.take()
                    && let Err(e) = self.join(room)
                {
                    tracing::warn!("Failed to join deferred room: {}", e);
                }
            }
            ConnectionSignal::Frame(frame) => self.handle_frame(&frame),
            ConnectionSignal::Lost(cause) => {
                self.room.connection_lost();
                self.publish_room();
                if let LossCause::Failed(_) = cause {
                    self.set_error(CONNECTION_FAILED_MESSAGE);
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: &[u8]) {
        let envelope = match decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Discarding undecodable frame: {}", e);
                self.set_error(PARSE_FAILED_MESSAGE);
                return;
            }
        };
        if envelope.version() != PROTOCOL_VERSION {
            tracing::warn!(
                "Envelope '{}' has protocol version {}, expected {}",
                envelope.kind(),
                envelope.version(),
                PROTOCOL_VERSION
            );
        }
        let inbound = match Inbound::from_envelope(&envelope) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!("Discarding frame with invalid payload: {}", e);
                self.set_error(PARSE_FAILED_MESSAGE);
                return;
            }
        };

        match inbound {
            Inbound::Connected(connected) => {
                tracing::info!("Signed in as user {}", connected.user_id);
                self.user_id.send_replace(Some(connected.user_id));
            }
            Inbound::Unknown(kind) => {
                tracing::debug!("Ignoring envelope of unknown type '{}'", kind);
            }
            inbound => self.apply(envelope.correlation_id(), inbound),
        }
    }

    fn apply(&mut self, correlation_id: Option<&CorrelationId>, inbound: Inbound) {
        match self.room.apply(correlation_id, inbound) {
            RoomUpdate::Error(error) => {
                tracing::warn!("Chat error {}: {}", error.code, error.message);
                self.set_error(error.message);
            }
            RoomUpdate::Confirmed(_) | RoomUpdate::MessagesChanged => self.publish_room(),
            RoomUpdate::Pong => tracing::debug!("Received pong"),
            RoomUpdate::Ignored => {}
        }
    }

    fn open_connection(&mut self) -> Result<(), SessionError> {
        self.clear_error();
        if let Err(e) = self.connection.connect() {
            self.set_error(e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    fn join(&mut self, room: RoomId) -> Result<(), SessionError> {
        let frames = self.room.join(room)?;
        self.publish_room();
        for frame in &frames {
            self.transmit(frame)?;
        }
        Ok(())
    }

    fn transmit(&mut self, frame: &OutboundFrame) -> Result<(), SessionError> {
        if let Err(e) = self.connection.send(frame) {
            self.room.cancel(&frame.correlation_id);
            let error = SessionError::from(e);
            self.set_error(error.to_string());
            return Err(error);
        }
        Ok(())
    }

    fn publish_room(&self) {
        let room = self.room.active_room().cloned();
        self.current_room.send_if_modified(|current| {
            if *current == room {
                false
            } else {
                *current = room;
                true
            }
        });
    }

    fn set_error(&self, message: impl Into<String>) {
        self.last_error.send_replace(Some(message.into()));
    }

    fn clear_error(&self) {
        self.last_error.send_if_modified(|current| current.take().is_some());
    }
}
