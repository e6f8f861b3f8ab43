//! Transport-level connection lifecycle.
//!
//! - `transport`: the [`Transport`] seam and the events it reports
//! - `credential`: the bearer token collaborator
//! - `manager`: the connection state machine
//! - `websocket`: the tokio-tungstenite transport

pub mod credential;
pub mod manager;
pub mod transport;
pub mod websocket;

pub use credential::{CredentialSource, EnvCredentialSource, StaticToken};
pub use manager::{ConnectError, ConnectionManager, ConnectionSignal, LossCause, SendError};
pub use transport::{ConnectionId, Transport, TransportError, TransportEvent, TransportEventKind};
pub use websocket::WebSocketTransport;
