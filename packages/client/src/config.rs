//! Chat client configuration.

use crate::{
    domain::{MESSAGE_BUFFER_CAPACITY, RoomCatalog},
    session::HISTORY_LIMIT,
};

/// Chat endpoint of a locally running backend
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8080/ws/chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// WebSocket endpoint, without the token query parameter
    pub endpoint: String,
    /// Messages requested from history on join
    pub history_limit: usize,
    /// Messages kept for the joined room
    pub buffer_capacity: usize,
    pub rooms: RoomCatalog,
}

impl ChatConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            history_limit: HISTORY_LIMIT,
            buffer_capacity: MESSAGE_BUFFER_CAPACITY,
            rooms: RoomCatalog::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // テスト項目: デフォルト設定が履歴 50 件・バッファ 200 件・ローカルエンドポイントになる
        // given (前提条件):

        // when (操作):
        let config = ChatConfig::default();

        // then (期待する結果):
        assert_eq!(config.endpoint, "ws://127.0.0.1:8080/ws/chat");
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.buffer_capacity, 200);
        assert_eq!(config.rooms.rooms().len(), 3);
    }

    #[test]
    fn test_with_endpoint_overrides_endpoint_only() {
        // テスト項目: with_endpoint はエンドポイントのみを上書きする
        // given (前提条件):
        let config = ChatConfig::default();

        // when (操作):
        let config = config.with_endpoint("ws://chat.example/ws/chat");

        // then (期待する結果):
        assert_eq!(config.endpoint, "ws://chat.example/ws/chat");
        assert_eq!(config.history_limit, HISTORY_LIMIT);
    }
}
