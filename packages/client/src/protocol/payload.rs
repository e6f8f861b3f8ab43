//! Typed payloads carried in the envelope `data` field.
//!
//! Outbound payloads are serialized as-is; inbound envelopes are classified
//! into [`Inbound`] and converted into domain messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ChatMessage, CreatedAt, MessageOrigin};

use super::envelope::{Envelope, ErrorPayload, MessageKind};

/// Message surfaced when an `error` envelope carries no error body
const FALLBACK_ERROR_MESSAGE: &str = "Chat room connection problem";

/// Errors raised when a known envelope type carries an unexpected payload
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("'{0}' envelope has no data")]
    MissingData(MessageKind),

    #[error("Invalid '{kind}' payload: {source}")]
    Invalid {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
}

// ========================================
// Outbound payloads
// ========================================

/// `chat.join` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub room_id: String,
}

/// `chat.history` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub room_id: String,
    pub limit: usize,
}

/// `chat.send` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub room_id: String,
    pub content: String,
}

// ========================================
// Inbound payloads
// ========================================

/// One entry of a `chat.history.result`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub content: String,
    pub created_at: String,
}

/// `chat.history.result` payload. A missing `items` list means no history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResult {
    #[serde(default)]
    pub items: Option<Vec<HistoryItem>>,
}

impl HistoryResult {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.items
            .unwrap_or_default()
            .into_iter()
            .map(ChatMessage::from)
            .collect()
    }
}

/// Sender block of a live message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderInfo {
    pub id: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// `chat.message` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveMessage {
    pub id: String,
    #[serde(rename = "roomId", default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub content: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderInfo>,
}

/// `chat.joined` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Joined {
    pub room_id: String,
}

/// `system.connected` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    pub user_id: String,
}

/// An inbound envelope classified by its `type`
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    HistoryResult(HistoryResult),
    LiveMessage(LiveMessage),
    Joined(Joined),
    Connected(Connected),
    Pong,
    Error(ErrorPayload),
    /// Any other type; the raw tag is kept for logging
    Unknown(String),
}

impl Inbound {
    /// Classify an envelope and parse its payload
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, PayloadError> {
        let Some(kind) = envelope.known_kind() else {
            return Ok(Self::Unknown(envelope.kind().to_string()));
        };

        let inbound = match kind {
            MessageKind::ChatHistoryResult => match envelope.data() {
                Some(data) => Self::HistoryResult(parse(kind, data)?),
                None => Self::HistoryResult(HistoryResult::default()),
            },
            MessageKind::ChatMessage => Self::LiveMessage(parse(kind, required(kind, envelope)?)?),
            MessageKind::ChatJoined => Self::Joined(parse(kind, required(kind, envelope)?)?),
            MessageKind::SystemConnected => {
                Self::Connected(parse(kind, required(kind, envelope)?)?)
            }
            MessageKind::SystemPong => Self::Pong,
            MessageKind::Error => Self::Error(envelope.error().cloned().unwrap_or_else(|| {
                ErrorPayload {
                    code: 0,
                    message: FALLBACK_ERROR_MESSAGE.to_string(),
                }
            })),
            // Requests are never expected inbound
            MessageKind::ChatJoin
            | MessageKind::ChatHistory
            | MessageKind::ChatSend
            | MessageKind::SystemPing => Self::Unknown(envelope.kind().to_string()),
        };
        Ok(inbound)
    }
}

fn required(kind: MessageKind, envelope: &Envelope) -> Result<&serde_json::Value, PayloadError> {
    envelope.data().ok_or(PayloadError::MissingData(kind))
}

fn parse<'a, T: Deserialize<'a>>(
    kind: MessageKind,
    data: &'a serde_json::Value,
) -> Result<T, PayloadError> {
    T::deserialize(data).map_err(|source| PayloadError::Invalid { kind, source })
}

// ========================================
// Payload → Domain
// ========================================

impl From<HistoryItem> for ChatMessage {
    fn from(item: HistoryItem) -> Self {
        Self {
            id: item.id,
            content: item.content,
            created_at: CreatedAt::new(item.created_at),
            sender_id: None,
            sender_name: None,
            origin: MessageOrigin::History,
        }
    }
}

impl From<LiveMessage> for ChatMessage {
    fn from(message: LiveMessage) -> Self {
        let (sender_id, sender_name) = match message.sender {
            Some(sender) => (Some(sender.id), sender.nickname),
            None => (None, None),
        };
        Self {
            id: message.id,
            content: message.content,
            created_at: CreatedAt::new(message.created_at),
            sender_id,
            sender_name,
            origin: MessageOrigin::Live,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CorrelationId, decode};

    #[test]
    fn test_classify_history_result() {
        // テスト項目: chat.history.result が履歴メッセージとして解釈される
        // given (前提条件):
        let frame = br#"{"v":1,"type":"chat.history.result","requestId":"h-1","data":{"items":[
            {"id":"m1","content":"first","created_at":"2024-03-01T12:00:00Z"},
            {"id":"m2","content":"second","created_at":"2024-03-01T12:01:00Z"}]}}"#;
        let envelope = decode(frame).unwrap();

        // when (操作):
        let inbound = Inbound::from_envelope(&envelope).unwrap();

        // then (期待する結果):
        let Inbound::HistoryResult(result) = inbound else {
            panic!("expected history result");
        };
        let messages = result.into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[1].content, "second");
        assert!(messages.iter().all(|m| m.origin == MessageOrigin::History));
        assert!(messages.iter().all(|m| m.sender_id.is_none()));
    }

    #[test]
    fn test_history_result_without_items_is_empty() {
        // テスト項目: items が無い、または data 自体が無い履歴結果は空として扱われる
        // given (前提条件):
        let without_items = decode(br#"{"v":1,"type":"chat.history.result","data":{}}"#).unwrap();
        let without_data = decode(br#"{"v":1,"type":"chat.history.result"}"#).unwrap();

        // when (操作):
        let first = Inbound::from_envelope(&without_items).unwrap();
        let second = Inbound::from_envelope(&without_data).unwrap();

        // then (期待する結果):
        assert_eq!(first, Inbound::HistoryResult(HistoryResult::default()));
        assert_eq!(second, Inbound::HistoryResult(HistoryResult::default()));
    }

    #[test]
    fn test_live_message_converts_sender() {
        // テスト項目: chat.message の送信者情報がドメインメッセージに引き継がれる
        // given (前提条件):
        let frame = br#"{"v":1,"type":"chat.message","data":{"id":"m9","roomId":"general",
            "content":"hi","created_at":"2024-03-01T12:00:00Z",
            "sender":{"id":"u-1","nickname":"alice"}}}"#;
        let envelope = decode(frame).unwrap();

        // when (操作):
        let inbound = Inbound::from_envelope(&envelope).unwrap();

        // then (期待する結果):
        let Inbound::LiveMessage(live) = inbound else {
            panic!("expected live message");
        };
        assert_eq!(live.room_id.as_deref(), Some("general"));
        let message = ChatMessage::from(live);
        assert_eq!(message.origin, MessageOrigin::Live);
        assert_eq!(message.sender_id.as_deref(), Some("u-1"));
        assert_eq!(message.sender_name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_live_message_without_data_is_rejected() {
        // テスト項目: data の無い chat.message はペイロードエラーになる
        // given (前提条件):
        let envelope = decode(br#"{"v":1,"type":"chat.message"}"#).unwrap();

        // when (操作):
        let result = Inbound::from_envelope(&envelope);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(PayloadError::MissingData(MessageKind::ChatMessage))
        ));
    }

    #[test]
    fn test_live_message_with_wrong_shape_is_rejected() {
        // テスト項目: フィールドが欠けた chat.message はペイロードエラーになる
        // given (前提条件):
        let envelope = decode(br#"{"v":1,"type":"chat.message","data":{"id":"m1"}}"#).unwrap();

        // when (操作):
        let result = Inbound::from_envelope(&envelope);

        // then (期待する結果):
        assert!(matches!(result, Err(PayloadError::Invalid { .. })));
    }

    #[test]
    fn test_error_without_body_uses_fallback_message() {
        // テスト項目: error フィールドの無い error エンベロープは既定のメッセージになる
        // given (前提条件):
        let envelope = Envelope::new("error", Some(CorrelationId::new("c-1")), None, None);

        // when (操作):
        let inbound = Inbound::from_envelope(&envelope).unwrap();

        // then (期待する結果):
        assert_eq!(
            inbound,
            Inbound::Error(ErrorPayload {
                code: 0,
                message: FALLBACK_ERROR_MESSAGE.to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_types_are_preserved() {
        // テスト項目: 未知の type は Unknown として元の名前が保持される
        // given (前提条件):
        let envelope = decode(br#"{"v":1,"type":"chat.typing","data":{"who":"bob"}}"#).unwrap();

        // when (操作):
        let inbound = Inbound::from_envelope(&envelope).unwrap();

        // then (期待する結果):
        assert_eq!(inbound, Inbound::Unknown("chat.typing".to_string()));
    }

    #[test]
    fn test_system_connected_exposes_user_id() {
        // テスト項目: system.connected からユーザー ID が取り出せる
        // given (前提条件):
        let envelope =
            decode(br#"{"v":1,"type":"system.connected","data":{"userId":"u-42"}}"#).unwrap();

        // when (操作):
        let inbound = Inbound::from_envelope(&envelope).unwrap();

        // then (期待する結果):
        assert_eq!(
            inbound,
            Inbound::Connected(Connected {
                user_id: "u-42".to_string()
            })
        );
    }
}
