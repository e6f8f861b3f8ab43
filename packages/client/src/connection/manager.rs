//! Connection state machine.
//!
//! ```text
//! idle --connect()--> connecting --opened--> ready --closed/failed--> error
//! error --connect()--> connecting
//! any --disconnect()--> idle
//! ```
//!
//! There is no automatic retry. At most one transport connection exists at a
//! time: `connect()` tears down the current one before opening the next, and
//! events tagged with an older [`ConnectionId`] are dropped.

use thiserror::Error;
use tokio::sync::watch;

use crate::{domain::ConnectionStatus, protocol::OutboundFrame};

use super::{
    credential::CredentialSource,
    transport::{ConnectionId, Transport, TransportError, TransportEvent, TransportEventKind},
};

/// Errors raised by [`ConnectionManager::connect`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// No bearer token was available
    #[error("No bearer token available, please sign in first")]
    MissingCredential,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised by [`ConnectionManager::send`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// Frames are only accepted while ready; nothing is queued
    #[error("Connection is not ready (status: {0})")]
    NotReady(ConnectionStatus),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Why an open connection went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LossCause {
    Closed(Option<String>),
    Failed(String),
}

/// Transport events that matter to the layers above
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSignal {
    Opened,
    Frame(Vec<u8>),
    Lost(LossCause),
}

/// Owns the transport and the connection status
pub struct ConnectionManager<T, C> {
    transport: T,
    credentials: C,
    endpoint: String,
    current: Option<ConnectionId>,
    next_id: u64,
    status: watch::Sender<ConnectionStatus>,
}

impl<T: Transport, C: CredentialSource> ConnectionManager<T, C> {
    pub fn new(transport: T, credentials: C, endpoint: impl Into<String>) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Idle);
        Self {
            transport,
            credentials,
            endpoint: endpoint.into(),
            current: None,
            next_id: 0,
            status,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status transition
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Connection currently owned by the manager, if any
    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.current
    }

    /// Open a new connection, replacing any existing one.
    ///
    /// Without a bearer token the status goes straight to `error` and no
    /// transport is opened.
    pub fn connect(&mut self) -> Result<ConnectionId, ConnectError> {
        self.teardown();

        let Some(token) = self
            .credentials
            .bearer_token()
            .filter(|token| !token.trim().is_empty())
        else {
            tracing::warn!("No bearer token available, not opening a connection");
            self.set_status(ConnectionStatus::Error);
            return Err(ConnectError::MissingCredential);
        };

        let connection = self.allocate_id();
        self.set_status(ConnectionStatus::Connecting);
        tracing::info!(
            "Opening chat connection #{} to {}",
            connection.value(),
            self.endpoint
        );

        let url = build_url(&self.endpoint, &token);
        if let Err(e) = self.transport.open(connection, &url) {
            tracing::warn!("Failed to open chat connection: {}", e);
            self.set_status(ConnectionStatus::Error);
            return Err(e.into());
        }

        self.current = Some(connection);
        Ok(connection)
    }

    /// Close the connection on purpose and return to `idle`
    pub fn disconnect(&mut self) {
        self.teardown();
        self.set_status(ConnectionStatus::Idle);
    }

    /// Send an encoded frame. Fails without side effects unless ready.
    pub fn send(&mut self, frame: &OutboundFrame) -> Result<(), SendError> {
        let status = self.status();
        if !status.is_ready() {
            return Err(SendError::NotReady(status));
        }
        tracing::debug!(
            "Sending '{}' (requestId={})",
            frame.kind,
            frame.correlation_id
        );
        self.transport.send(frame.text.clone())?;
        Ok(())
    }

    /// Apply a transport event. Events from replaced connections yield `None`.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<ConnectionSignal> {
        if self.current != Some(event.connection) {
            tracing::debug!(
                "Ignoring event from stale connection #{}",
                event.connection.value()
            );
            return None;
        }

        match event.kind {
            TransportEventKind::Opened => {
                self.set_status(ConnectionStatus::Ready);
                Some(ConnectionSignal::Opened)
            }
            TransportEventKind::Frame(frame) => Some(ConnectionSignal::Frame(frame)),
            TransportEventKind::Closed { reason } => {
                tracing::info!(
                    "Chat connection closed{}",
                    reason
                        .as_deref()
                        .map(|r| format!(": {r}"))
                        .unwrap_or_default()
                );
                self.lose_connection();
                Some(ConnectionSignal::Lost(LossCause::Closed(reason)))
            }
            TransportEventKind::Failed(message) => {
                tracing::warn!("Chat connection failed: {}", message);
                self.lose_connection();
                Some(ConnectionSignal::Lost(LossCause::Failed(message)))
            }
        }
    }

    fn lose_connection(&mut self) {
        self.teardown();
        self.set_status(ConnectionStatus::Error);
    }

    fn teardown(&mut self) {
        if let Some(connection) = self.current.take() {
            tracing::debug!("Tearing down chat connection #{}", connection.value());
            self.transport.close();
        }
    }

    fn allocate_id(&mut self) -> ConnectionId {
        self.next_id += 1;
        ConnectionId::new(self.next_id)
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            tracing::info!("Connection status: {}", status);
        }
    }
}

/// Append the bearer token to the endpoint as the `token` query parameter
fn build_url(endpoint: &str, token: &str) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", endpoint, separator, urlencoding::encode(token))
}
