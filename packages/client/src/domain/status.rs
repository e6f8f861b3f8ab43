//! Connection status of a chat session.

use std::fmt;

/// Transport-level status of a chat session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No connection has been requested, or it was closed on purpose
    #[default]
    Idle,
    /// A transport is being opened
    Connecting,
    /// The transport is open and envelopes can be sent
    Ready,
    /// The last attempt failed or the transport was lost
    Error,
}

impl ConnectionStatus {
    /// Whether envelopes may be sent right now
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether a transport is open or opening
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Ready)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_idle() {
        // テスト項目: 初期状態は Idle である
        // given (前提条件):

        // when (操作):
        let status = ConnectionStatus::default();

        // then (期待する結果):
        assert_eq!(status, ConnectionStatus::Idle);
        assert!(!status.is_ready());
        assert!(!status.is_active());
    }

    #[test]
    fn test_active_statuses() {
        // テスト項目: Connecting と Ready のみがアクティブとみなされる
        // given (前提条件):
        let statuses = [
            ConnectionStatus::Idle,
            ConnectionStatus::Connecting,
            ConnectionStatus::Ready,
            ConnectionStatus::Error,
        ];

        // when (操作):
        let active: Vec<bool> = statuses.iter().map(|s| s.is_active()).collect();

        // then (期待する結果):
        assert_eq!(active, vec![false, true, true, false]);
    }

    #[test]
    fn test_display_uses_lowercase_names() {
        // テスト項目: Display は小文字の状態名を出力する
        // given (前提条件):
        let status = ConnectionStatus::Connecting;

        // when (操作):
        let text = status.to_string();

        // then (期待する結果):
        assert_eq!(text, "connecting");
    }
}
