//! Room state, request correlation and the session facade.

pub mod correlation;
pub mod facade;
pub mod room;

pub use correlation::{
    MAX_PENDING_PINGS, MAX_PENDING_SENDS, MAX_SUPERSEDED, PendingCorrelations, RequestIntent,
    Resolution,
};
pub use facade::{
    CONNECTION_FAILED_MESSAGE, ChatSession, NOT_CONNECTED_MESSAGE, PARSE_FAILED_MESSAGE,
    SessionSnapshot, SessionWatch, SwitchOutcome,
};
pub use room::{HISTORY_LIMIT, RoomSession, RoomUpdate};
