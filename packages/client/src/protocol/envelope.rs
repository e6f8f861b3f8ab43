//! The versioned envelope carried by every frame.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Protocol version attached to every outbound envelope
pub const PROTOCOL_VERSION: u32 = 1;

/// Identifier linking an outbound request to its response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error body of an `error` envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: i64,
    pub message: String,
}

/// Envelope types known to the chat client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    ChatJoin,
    ChatJoined,
    ChatHistory,
    ChatHistoryResult,
    ChatSend,
    ChatMessage,
    SystemConnected,
    SystemPing,
    SystemPong,
    Error,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatJoin => "chat.join",
            Self::ChatJoined => "chat.joined",
            Self::ChatHistory => "chat.history",
            Self::ChatHistoryResult => "chat.history.result",
            Self::ChatSend => "chat.send",
            Self::ChatMessage => "chat.message",
            Self::SystemConnected => "system.connected",
            Self::SystemPing => "system.ping",
            Self::SystemPong => "system.pong",
            Self::Error => "error",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        let kind = match value {
            "chat.join" => Self::ChatJoin,
            "chat.joined" => Self::ChatJoined,
            "chat.history" => Self::ChatHistory,
            "chat.history.result" => Self::ChatHistoryResult,
            "chat.send" => Self::ChatSend,
            "chat.message" => Self::ChatMessage,
            "system.connected" => Self::SystemConnected,
            "system.ping" => Self::SystemPing,
            "system.pong" => Self::SystemPong,
            "error" => Self::Error,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded or about-to-be-encoded frame. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "v", default)]
    version: u32,
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorPayload>,
}

impl Envelope {
    /// Build an outbound request with the current protocol version and a
    /// freshly generated correlation id
    pub fn request(kind: MessageKind, data: Option<serde_json::Value>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            kind: kind.as_str().to_string(),
            correlation_id: Some(CorrelationId::generate()),
            data,
            error: None,
        }
    }

    /// Build an arbitrary envelope (used for responses and tests)
    pub fn new(
        kind: impl Into<String>,
        correlation_id: Option<CorrelationId>,
        data: Option<serde_json::Value>,
        error: Option<ErrorPayload>,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            kind: kind.into(),
            correlation_id,
            data,
            error,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Raw `type` tag
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// `type` tag mapped to a known kind, if any
    pub fn known_kind(&self) -> Option<MessageKind> {
        MessageKind::from_wire(&self.kind)
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorPayload> {
        self.error.as_ref()
    }
}
