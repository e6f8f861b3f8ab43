//! Async driver for a chat session.
//!
//! A single task owns the [`ChatSession`] and processes transport events and
//! UI commands one at a time, in arrival order. [`ChatClient`] is the cheap
//! handle the UI talks to.

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    config::ChatConfig,
    connection::{
        ConnectionManager, CredentialSource, Transport, TransportEvent, WebSocketTransport,
    },
    domain::RoomId,
    error::SessionError,
    session::{ChatSession, RoomSession, SessionSnapshot, SessionWatch, SwitchOutcome},
};

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    Connect(Reply<()>),
    Reconnect(Reply<()>),
    SwitchRoom(RoomId, Reply<SwitchOutcome>),
    Send(String, Reply<()>),
    Ping(Reply<()>),
    Disconnect(Reply<()>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Handle to a running chat session
pub struct ChatClient {
    commands: mpsc::UnboundedSender<Command>,
    watch: SessionWatch,
    task: JoinHandle<()>,
}

impl ChatClient {
    /// Start a session speaking WebSocket to `config.endpoint`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C>(config: &ChatConfig, credentials: C) -> Self
    where
        C: CredentialSource + 'static,
    {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let transport = WebSocketTransport::new(event_tx);
        let connection = ConnectionManager::new(transport, credentials, config.endpoint.clone());
        let room = RoomSession::new(config.history_limit, config.buffer_capacity);
        Self::spawn_with(ChatSession::new(connection, room), event_rx)
    }

    /// Start a session over an already wired transport and its event stream
    pub fn spawn_with<T, C>(
        session: ChatSession<T, C>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self
    where
        T: Transport + 'static,
        C: CredentialSource + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let watch = session.subscribe();
        let task = tokio::spawn(run_session(session, events, command_rx));
        Self {
            commands,
            watch,
            task,
        }
    }

    /// Receivers for the session observables
    pub fn watch(&self) -> SessionWatch {
        self.watch.clone()
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(reply))
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }

    pub async fn connect(&self) -> Result<(), SessionError> {
        self.request(Command::Connect).await
    }

    pub async fn reconnect(&self) -> Result<(), SessionError> {
        self.request(Command::Reconnect).await
    }

    pub async fn switch_room(&self, room: RoomId) -> Result<SwitchOutcome, SessionError> {
        self.request(|reply| Command::SwitchRoom(room, reply)).await
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Command::Send(text, reply)).await
    }

    pub async fn ping(&self) -> Result<(), SessionError> {
        self.request(Command::Ping).await
    }

    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.request(Command::Disconnect).await
    }

    /// Disconnect and wait for the driver task to finish
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            tracing::warn!("Chat session task ended abnormally: {}", e);
        }
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(Reply<R>) -> Command,
    ) -> Result<R, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }
}

async fn run_session<T, C>(
    mut session: ChatSession<T, C>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) where
    T: Transport,
    C: CredentialSource,
{
    loop {
        tokio::select! {
            Some(event) = events.recv() => session.handle_transport_event(event),
            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::debug!("All chat client handles dropped, closing session");
                    session.disconnect();
                    break;
                };
                execute(&mut session, command);
            }
        }
    }
}

fn execute<T: Transport, C: CredentialSource>(session: &mut ChatSession<T, C>, command: Command) {
    // A dropped receiver only means the caller stopped waiting
    match command {
        Command::Connect(reply) => {
            let _ = reply.send(session.connect());
        }
        Command::Reconnect(reply) => {
            let _ = reply.send(session.reconnect());
        }
        Command::SwitchRoom(room, reply) => {
            let _ = reply.send(session.switch_room(room));
        }
        Command::Send(text, reply) => {
            let _ = reply.send(session.send(&text));
        }
        Command::Ping(reply) => {
            let _ = reply.send(session.ping());
        }
        Command::Disconnect(reply) => {
            session.disconnect();
            let _ = reply.send(Ok(()));
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(session.snapshot());
        }
    }
}
