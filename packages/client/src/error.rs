//! Error types for the chat session client.

use thiserror::Error;

use crate::{
    connection::{ConnectError, SendError, TransportError},
    domain::ConnectionStatus,
    protocol::EncodeError,
};

/// Errors returned by chat session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// Message text is empty after trimming
    #[error("Message is empty")]
    EmptyContent,

    /// Operation requires a ready connection
    #[error("Not connected (status: {0})")]
    NotReady(ConnectionStatus),

    /// Operation requires a joined room
    #[error("No chat room joined")]
    NoActiveRoom,

    /// The session driver has stopped
    #[error("Chat session is closed")]
    Closed,

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<SendError> for SessionError {
    fn from(error: SendError) -> Self {
        match error {
            SendError::NotReady(status) => Self::NotReady(status),
            SendError::Transport(e) => Self::Transport(e),
        }
    }
}
