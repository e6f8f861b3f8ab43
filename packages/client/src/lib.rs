//! Real-time chat session client for the Agora forum.
//!
//! The core is synchronous and transport-agnostic: [`session::ChatSession`]
//! consumes [`connection::TransportEvent`]s and produces outbound frames
//! through a [`connection::Transport`]. [`runner::ChatClient`] drives it on a
//! tokio task over a WebSocket.

pub mod config;
pub mod connection;
pub mod console;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod protocol;
pub mod runner;
pub mod session;

pub use config::ChatConfig;
pub use error::SessionError;
pub use runner::ChatClient;
pub use session::ChatSession;
