//! Envelope encoding and fail-closed decoding.

use serde::Serialize;
use thiserror::Error;

use super::envelope::{CorrelationId, Envelope, MessageKind};

/// Errors raised while decoding an inbound frame
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame is not well-formed JSON
    #[error("Frame is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Frame is JSON but not an object
    #[error("Frame is not a JSON object")]
    NotAnObject,

    /// Object does not have the envelope shape (e.g. missing `type`)
    #[error("Frame is not a valid envelope: {0}")]
    InvalidShape(#[source] serde_json::Error),
}

/// Errors raised while encoding an outbound envelope
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// An encoded request, ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundFrame {
    pub kind: MessageKind,
    pub correlation_id: CorrelationId,
    pub text: String,
}

/// Encode an envelope as JSON text
pub fn encode(envelope: &Envelope) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Build and encode a request of the given kind with a fresh correlation id
pub fn encode_request<T: Serialize>(
    kind: MessageKind,
    data: Option<&T>,
) -> Result<OutboundFrame, EncodeError> {
    let data = data.map(serde_json::to_value).transpose()?;
    let envelope = Envelope::request(kind, data);
    let text = encode(&envelope)?;
    let correlation_id = envelope
        .correlation_id()
        .cloned()
        .unwrap_or_else(CorrelationId::generate);
    Ok(OutboundFrame {
        kind,
        correlation_id,
        text,
    })
}

/// Decode a frame into an envelope.
///
/// Anything that is not a JSON object with a string `type` is rejected as a
/// whole; a partially populated envelope is never returned.
pub fn decode(frame: &[u8]) -> Result<Envelope, DecodeError> {
    let value: serde_json::Value = serde_json::from_slice(frame).map_err(DecodeError::Malformed)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    serde_json::from_value(value).map_err(DecodeError::InvalidShape)
}
