//! Chat messages and the bounded per-room message buffer.

use std::collections::VecDeque;

use agora_shared::time::{format_for_display, parse_rfc3339};
use chrono::{DateTime, FixedOffset};

/// Maximum number of messages kept for the joined room
pub const MESSAGE_BUFFER_CAPACITY: usize = 200;

/// How a message reached the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Loaded in bulk when the room was joined
    History,
    /// Received incrementally while joined
    Live,
}

/// Creation time of a message as sent by the backend.
///
/// The raw value is always kept; `parsed` is filled when it is valid RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAt {
    raw: String,
    parsed: Option<DateTime<FixedOffset>>,
}

impl CreatedAt {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = parse_rfc3339(&raw);
        Self { raw, parsed }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn parsed(&self) -> Option<&DateTime<FixedOffset>> {
        self.parsed.as_ref()
    }

    /// Local-time rendering, or the raw value if it did not parse
    pub fn display(&self) -> String {
        format_for_display(&self.raw)
    }
}

/// A single chat message. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub created_at: CreatedAt,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub origin: MessageOrigin,
}

impl ChatMessage {
    pub fn is_history(&self) -> bool {
        self.origin == MessageOrigin::History
    }

    /// Whether the message was sent by the given user
    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id.as_deref() == Some(user_id)
    }
}

/// Ordered, capacity-bounded message list (oldest first).
///
/// Eviction is FIFO by arrival order.
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    entries: VecDeque<ChatMessage>,
    capacity: usize,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::with_capacity(MESSAGE_BUFFER_CAPACITY)
    }

    /// Create a buffer with a custom bound (clamped to at least 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append at the tail, returning the number of evicted head entries
    pub fn push(&mut self, message: ChatMessage) -> usize {
        self.entries.push_back(message);
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Replace the whole content, keeping only the newest `capacity` entries
    pub fn replace(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.entries.clear();
        for message in messages {
            self.push(message);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}
