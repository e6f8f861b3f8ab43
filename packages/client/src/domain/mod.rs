//! Domain model of a chat session: connection status, rooms and messages.
//!
//! Everything in this module is plain data plus pure operations, so it can be
//! exercised without a transport or a runtime.

mod message;
mod room;
mod status;

pub use message::{ChatMessage, CreatedAt, MESSAGE_BUFFER_CAPACITY, MessageBuffer, MessageOrigin};
pub use room::{Room, RoomCatalog, RoomId, RoomIdError};
pub use status::ConnectionStatus;
