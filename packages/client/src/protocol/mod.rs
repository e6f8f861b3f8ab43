//! Wire protocol: the versioned envelope, its codec and the typed payloads.
//!
//! The envelope layer never interprets `type` values; the payload layer maps
//! known types onto typed structs and the domain model.

pub mod codec;
pub mod envelope;
pub mod payload;

pub use codec::{DecodeError, EncodeError, OutboundFrame, decode, encode, encode_request};
pub use envelope::{CorrelationId, Envelope, ErrorPayload, MessageKind, PROTOCOL_VERSION};
pub use payload::{Inbound, PayloadError};
