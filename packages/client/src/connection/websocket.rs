//! WebSocket transport backed by tokio-tungstenite.
//!
//! Each connection runs in its own task that owns both halves of the stream
//! and reports [`TransportEvent`]s on the channel handed to
//! [`WebSocketTransport::new`].

use futures_util::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, protocol::Message},
};

use super::transport::{ConnectionId, Transport, TransportError, TransportEvent};

struct Link {
    connection: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

/// [`Transport`] speaking text frames over a WebSocket
pub struct WebSocketTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    link: Option<Link>,
}

impl WebSocketTransport {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { events, link: None }
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, connection: ConnectionId, url: &str) -> Result<(), TransportError> {
        self.close();

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Open(e.to_string()))?;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(run_link(
            connection,
            url.to_string(),
            outbound_rx,
            self.events.clone(),
        ));

        self.link = Some(Link {
            connection,
            outbound,
            task,
        });
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        let link = self.link.as_ref().ok_or(TransportError::NotOpen)?;
        link.outbound
            .send(text)
            .map_err(|_| TransportError::Send("connection task has stopped".to_string()))
    }

    fn close(&mut self) {
        // Dropping the outbound sender makes the task send a close frame and exit
        if let Some(link) = self.link.take() {
            tracing::debug!("Closing websocket #{}", link.connection.value());
            drop(link.outbound);
            drop(link.task);
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(link) = self.link.take() {
            link.task.abort();
        }
    }
}

async fn run_link(
    connection: ConnectionId,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    // Frames queued during the handshake are flushed once it completes
    let mut queued = Vec::new();
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = async {
            while let Some(text) = outbound.recv().await {
                queued.push(text);
            }
        } => {
            tracing::debug!("Websocket #{} closed while opening", connection.value());
            return;
        }
    };
    let ws_stream = match connected {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            let message = match &e {
                WsError::Http(response) => {
                    format!("server rejected the handshake ({})", response.status())
                }
                _ => e.to_string(),
            };
            tracing::warn!("WebSocket connect failed: {}", message);
            let _ = events.send(TransportEvent::failed(connection, message));
            return;
        }
    };

    tracing::info!("Connected to chat server (connection #{})", connection.value());
    if events.send(TransportEvent::opened(connection)).is_err() {
        return;
    }

    let (mut write, mut read) = ws_stream.split();
    for text in queued {
        if let Err(e) = write.send(Message::Text(text.into())).await {
            tracing::warn!("Failed to send frame: {}", e);
            let _ = events.send(TransportEvent::failed(connection, e.to_string()));
            return;
        }
    }

    loop {
        tokio::select! {
            text = outbound.recv() => {
                match text {
                    Some(text) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            tracing::warn!("Failed to send frame: {}", e);
                            let _ = events.send(TransportEvent::failed(connection, e.to_string()));
                            break;
                        }
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let frame = text.as_str().as_bytes().to_vec();
                        if events.send(TransportEvent::frame(connection, frame)).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        if events.send(TransportEvent::frame(connection, data.to_vec())).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!("Server closed the connection");
                        let reason = frame
                            .map(|f| f.reason.as_str().to_string())
                            .filter(|reason| !reason.is_empty());
                        let _ = events.send(TransportEvent::closed(connection, reason));
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket read error: {}", e);
                        let _ = events.send(TransportEvent::failed(connection, e.to_string()));
                        break;
                    }
                    None => {
                        let _ = events.send(TransportEvent::closed(connection, None));
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_send_before_open_fails() {
        // テスト項目: 接続前の送信は NotOpen エラーになる
        // given (前提条件):
        let (events, _rx) = mpsc::unbounded_channel();
        let mut transport = WebSocketTransport::new(events);

        // when (操作):
        let result = transport.send("{}".to_string());

        // then (期待する結果):
        assert_eq!(result, Err(TransportError::NotOpen));
    }

    #[test]
    fn test_open_outside_runtime_fails() {
        // テスト項目: tokio ランタイム外で open するとエラーになる
        // given (前提条件):
        let (events, _rx) = mpsc::unbounded_channel();
        let mut transport = WebSocketTransport::new(events);

        // when (操作):
        let result = transport.open(ConnectionId::new(1), "ws://127.0.0.1:1/ws/chat");

        // then (期待する結果):
        assert!(matches!(result, Err(TransportError::Open(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_failure() {
        // テスト項目: 接続できないサーバーに対しては Failed イベントが通知される
        // given (前提条件):
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let (events, mut rx) = mpsc::unbounded_channel();
        let mut transport = WebSocketTransport::new(events);
        let connection = ConnectionId::new(7);

        // when (操作):
        transport
            .open(connection, &format!("ws://127.0.0.1:{port}/ws/chat"))
            .unwrap();
        let event = rx.recv().await.unwrap();

        // then (期待する結果):
        assert_eq!(event.connection, connection);
        assert!(matches!(
            event.kind,
            crate::connection::TransportEventKind::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_close_during_handshake_reports_nothing() {
        // テスト項目: ハンドシェイク中に close した接続からは Opened が通知されない
        // given (前提条件):
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    let _ = tokio_tungstenite::accept_async(stream).await;
                });
            }
        });
        let (events, mut rx) = mpsc::unbounded_channel();
        let mut transport = WebSocketTransport::new(events);
        transport
            .open(ConnectionId::new(3), &format!("ws://127.0.0.1:{port}/ws/chat"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // when (操作):
        transport.close();
        tokio::time::sleep(Duration::from_millis(400)).await;

        // then (期待する結果):
        assert!(rx.try_recv().is_err());
    }
}
