//! Per-room message state.
//!
//! Tracks the joined room, the bounded message buffer and the requests still
//! waiting for a response. Produces encoded frames but never touches the
//! transport.

use tokio::sync::watch;

use crate::{
    domain::{ChatMessage, MessageBuffer, RoomId},
    error::SessionError,
    protocol::{
        CorrelationId, EncodeError, ErrorPayload, Inbound, MessageKind, OutboundFrame,
        encode_request,
        payload::{HistoryRequest, JoinRequest, SendRequest},
    },
};

use super::correlation::{PendingCorrelations, RequestIntent, Resolution};

/// Number of messages requested when joining a room
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
struct ActiveRoom {
    id: RoomId,
    generation: u64,
    confirmed: bool,
}

/// Result of applying an inbound payload
#[derive(Debug, Clone, PartialEq)]
pub enum RoomUpdate {
    /// Nothing changed (stale, unknown or unrelated)
    Ignored,
    /// The message list was replaced or appended to
    MessagesChanged,
    /// The backend acknowledged the join
    Confirmed(RoomId),
    /// An error to surface to the user
    Error(ErrorPayload),
    Pong,
}

pub struct RoomSession {
    active: Option<ActiveRoom>,
    buffer: MessageBuffer,
    pending: PendingCorrelations,
    history_limit: usize,
    messages: watch::Sender<Vec<ChatMessage>>,
}

impl RoomSession {
    pub fn new(history_limit: usize, buffer_capacity: usize) -> Self {
        let (messages, _) = watch::channel(Vec::new());
        Self {
            active: None,
            buffer: MessageBuffer::with_capacity(buffer_capacity),
            pending: PendingCorrelations::new(),
            history_limit,
            messages,
        }
    }

    pub fn active_room(&self) -> Option<&RoomId> {
        self.active.as_ref().map(|active| &active.id)
    }

    /// Whether the backend acknowledged the current join
    pub fn is_confirmed(&self) -> bool {
        self.active.as_ref().is_some_and(|active| active.confirmed)
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.buffer.to_vec()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.messages.subscribe()
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Enter `room`, returning the `chat.join` and `chat.history` frames to send in order.
    ///
    /// The buffer is cleared right away and every request of the previous
    /// room is invalidated.
    pub fn join(&mut self, room: RoomId) -> Result<Vec<OutboundFrame>, EncodeError> {
        let generation = self.pending.advance_generation();
        tracing::info!("Joining room '{}' (generation {})", room, generation);

        self.active = Some(ActiveRoom {
            id: room.clone(),
            generation,
            confirmed: false,
        });
        self.buffer.clear();
        self.publish();

        let join = encode_request(
            MessageKind::ChatJoin,
            Some(&JoinRequest {
                room_id: room.as_str().to_string(),
            }),
        )?;
        let history = encode_request(
            MessageKind::ChatHistory,
            Some(&HistoryRequest {
                room_id: room.into_string(),
                limit: self.history_limit,
            }),
        )?;

        self.pending
            .register(join.correlation_id.clone(), RequestIntent::Join);
        self.pending
            .register(history.correlation_id.clone(), RequestIntent::History);
        Ok(vec![join, history])
    }

    /// Build a `chat.send` frame for the joined room
    pub fn send_message(&mut self, content: &str) -> Result<OutboundFrame, SessionError> {
        let room = self.active_room().ok_or(SessionError::NoActiveRoom)?;
        let frame = encode_request(
            MessageKind::ChatSend,
            Some(&SendRequest {
                room_id: room.as_str().to_string(),
                content: content.to_string(),
            }),
        )?;
        self.pending
            .register(frame.correlation_id.clone(), RequestIntent::Send);
        Ok(frame)
    }

    /// Build a `system.ping` frame
    pub fn ping(&mut self) -> Result<OutboundFrame, EncodeError> {
        let frame = encode_request::<()>(MessageKind::SystemPing, None)?;
        self.pending
            .register(frame.correlation_id.clone(), RequestIntent::Ping);
        Ok(frame)
    }

    /// Forget a request whose frame could not be transmitted
    pub fn cancel(&mut self, correlation_id: &CorrelationId) {
        self.pending.cancel(correlation_id);
    }

    /// Apply an inbound payload
    pub fn apply(&mut self, correlation_id: Option<&CorrelationId>, inbound: Inbound) -> RoomUpdate {
        match inbound {
            Inbound::HistoryResult(result) => {
                if self.resolve(correlation_id) != Some(Resolution::Current(RequestIntent::History)) {
                    tracing::debug!("Dropping history result for a stale or unknown request");
                    return RoomUpdate::Ignored;
                }
                let messages = result.into_messages();
                tracing::debug!("Loaded {} history messages", messages.len());
                self.buffer.replace(messages);
                self.publish();
                RoomUpdate::MessagesChanged
            }
            Inbound::LiveMessage(message) => {
                let Some(active) = self.active.as_ref() else {
                    tracing::debug!("Dropping live message received outside a room");
                    return RoomUpdate::Ignored;
                };
                if let Some(room_id) = message.room_id.as_deref()
                    && room_id != active.id.as_str()
                {
                    tracing::debug!(
                        "Dropping live message for room '{}' while in '{}'",
                        room_id,
                        active.id
                    );
                    return RoomUpdate::Ignored;
                }
                let evicted = self.buffer.push(ChatMessage::from(message));
                if evicted > 0 {
                    tracing::trace!("Evicted {} oldest messages", evicted);
                }
                self.publish();
                RoomUpdate::MessagesChanged
            }
            Inbound::Joined(joined) => {
                if self.resolve(correlation_id) == Some(Resolution::Superseded) {
                    return RoomUpdate::Ignored;
                }
                match self.active.as_mut() {
                    Some(active) if active.id.as_str() == joined.room_id => {
                        active.confirmed = true;
                        tracing::info!(
                            "Joined room '{}' (generation {})",
                            active.id,
                            active.generation
                        );
                        RoomUpdate::Confirmed(active.id.clone())
                    }
                    _ => RoomUpdate::Ignored,
                }
            }
            Inbound::Error(error) => {
                // Only answers to requests of a room that was left are dropped
                if self.resolve(correlation_id) == Some(Resolution::Superseded) {
                    tracing::debug!(
                        "Dropping error for a request of a previous room: {}",
                        error.message
                    );
                    RoomUpdate::Ignored
                } else {
                    RoomUpdate::Error(error)
                }
            }
            Inbound::Pong => {
                self.resolve(correlation_id);
                RoomUpdate::Pong
            }
            Inbound::Connected(_) | Inbound::Unknown(_) => RoomUpdate::Ignored,
        }
    }

    /// The transport went away: leave the room but keep the messages on display
    pub fn connection_lost(&mut self) {
        self.active = None;
        self.pending.clear();
    }

    /// Forget everything, including the displayed messages
    pub fn reset(&mut self) {
        self.active = None;
        self.pending.clear();
        self.buffer.clear();
        self.publish();
    }

    /// `None` when the inbound envelope carried no correlation id
    fn resolve(&mut self, correlation_id: Option<&CorrelationId>) -> Option<Resolution> {
        correlation_id.map(|id| self.pending.resolve(id))
    }

    fn publish(&self) {
        self.messages.send_replace(self.buffer.to_vec());
    }
}
