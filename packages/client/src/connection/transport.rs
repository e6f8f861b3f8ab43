//! Transport abstraction.
//!
//! A transport opens one bidirectional connection at a time. Opening is
//! asynchronous: `open` only starts the attempt, and the outcome is reported
//! later as a [`TransportEvent`] tagged with the [`ConnectionId`] passed to
//! `open`. Tagging lets the connection manager ignore late events from a
//! connection it has already replaced.

use thiserror::Error;

/// Identifier of one connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// What happened on a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// The connection is open and frames can flow
    Opened,
    /// A frame was received
    Frame(Vec<u8>),
    /// The peer closed the connection
    Closed { reason: Option<String> },
    /// The connection could not be opened or broke
    Failed(String),
}

/// An event reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub connection: ConnectionId,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn opened(connection: ConnectionId) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Opened,
        }
    }

    pub fn frame(connection: ConnectionId, frame: impl Into<Vec<u8>>) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Frame(frame.into()),
        }
    }

    pub fn closed(connection: ConnectionId, reason: Option<String>) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Closed { reason },
        }
    }

    pub fn failed(connection: ConnectionId, message: impl Into<String>) -> Self {
        Self {
            connection,
            kind: TransportEventKind::Failed(message.into()),
        }
    }
}

/// Transport errors reported synchronously
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No connection is open
    #[error("Transport is not open")]
    NotOpen,

    /// The connection attempt could not be started
    #[error("Failed to open transport: {0}")]
    Open(String),

    /// The frame could not be handed to the connection
    #[error("Failed to send frame: {0}")]
    Send(String),
}

/// A bidirectional frame transport
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Start opening a connection to `url`; events must carry `connection`
    fn open(&mut self, connection: ConnectionId, url: &str) -> Result<(), TransportError>;

    /// Hand a text frame to the open connection
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Tear down the current connection, if any. Must be idempotent.
    fn close(&mut self);
}
