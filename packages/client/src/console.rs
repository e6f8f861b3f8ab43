//! Interactive terminal front end.
//!
//! Reads lines with rustyline on a blocking thread and renders the session
//! observables as they change.

use std::io::Write;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    config::ChatConfig,
    connection::CredentialSource,
    domain::{ChatMessage, RoomId},
    error::SessionError,
    formatter::{MessageFormatter, Transcript, TranscriptChange},
    runner::ChatClient,
    session::SwitchOutcome,
};

const PROMPT: &str = "chat> ";

/// A line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Join(String),
    Rooms,
    Reconnect,
    Ping,
    Help,
    Quit,
    /// Plain text to send to the current room
    Say(String),
    /// A malformed command, with the message to show
    Invalid(String),
}

impl ConsoleCommand {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Self::Say(line.to_string()));
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let argument = parts.next();
        let parsed = match (name, argument) {
            ("join", Some(room)) => Self::Join(room.to_string()),
            ("join", None) => Self::Invalid("usage: /join <room>".to_string()),
            ("rooms", _) => Self::Rooms,
            ("reconnect", _) => Self::Reconnect,
            ("ping", _) => Self::Ping,
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Invalid(format!("unknown command '/{}', try /help", name)),
        };
        Some(parsed)
    }
}

/// Redisplay the prompt after printing output
fn redisplay_prompt() {
    print!("{}", PROMPT);
    std::io::stdout().flush().ok();
}

/// Run the interactive chat until the user quits.
///
/// Joins `room` as soon as the connection is ready.
pub async fn run_console<C>(config: ChatConfig, credentials: C, room: RoomId) -> Result<(), SessionError>
where
    C: CredentialSource + 'static,
{
    let client = ChatClient::spawn(&config, credentials);
    let mut watch = client.watch();

    client.switch_room(room).await?;
    if let Err(e) = client.connect().await {
        client.shutdown().await;
        return Err(e);
    }

    println!(
        "\nConnecting to {}. Type messages and press Enter to send. Type /help for commands.\n",
        config.endpoint
    );

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // rustyline is synchronous
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    let mut transcript = Transcript::new();
    let mut user_id: Option<String> = None;

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else { break };
                let Some(command) = ConsoleCommand::parse(&line) else { continue };
                if command == ConsoleCommand::Quit {
                    break;
                }
                execute(&client, &config, command).await;
                redisplay_prompt();
            }
            Ok(()) = watch.status.changed() => {
                let status = *watch.status.borrow_and_update();
                print!("{}", MessageFormatter::format_status(status));
                redisplay_prompt();
            }
            Ok(()) = watch.room.changed() => {
                let room = watch.room.borrow_and_update().clone();
                if let Some(room) = room {
                    print!("{}", MessageFormatter::format_room_joined(&room, &config.rooms));
                    redisplay_prompt();
                }
            }
            Ok(()) = watch.messages.changed() => {
                let messages = watch.messages.borrow_and_update().clone();
                if render(&mut transcript, &messages, user_id.as_deref()) {
                    redisplay_prompt();
                }
            }
            Ok(()) = watch.last_error.changed() => {
                let error = watch.last_error.borrow_and_update().clone();
                if let Some(error) = error {
                    print!("{}", MessageFormatter::format_error(&error));
                    redisplay_prompt();
                }
            }
            Ok(()) = watch.user_id.changed() => {
                user_id = watch.user_id.borrow_and_update().clone();
            }
        }
    }

    client.shutdown().await;
    println!();
    Ok(())
}

async fn execute(client: &ChatClient, config: &ChatConfig, command: ConsoleCommand) {
    let result = match command {
        ConsoleCommand::Say(text) => client.send(text).await,
        ConsoleCommand::Join(room) => match RoomId::new(room) {
            Ok(room) => match client.switch_room(room.clone()).await {
                Ok(SwitchOutcome::Deferred) => {
                    println!("\nWill join '{}' once connected", room);
                    Ok(())
                }
                Ok(SwitchOutcome::Joined) => Ok(()),
                Err(e) => Err(e),
            },
            Err(e) => {
                print!("{}", MessageFormatter::format_error(&e.to_string()));
                Ok(())
            }
        },
        ConsoleCommand::Rooms => {
            let current = client.snapshot().await.ok().and_then(|s| s.room);
            print!(
                "{}",
                MessageFormatter::format_room_list(&config.rooms, current.as_ref())
            );
            Ok(())
        }
        ConsoleCommand::Reconnect => client.reconnect().await,
        ConsoleCommand::Ping => client.ping().await,
        ConsoleCommand::Help => {
            print!("{}", MessageFormatter::format_help());
            Ok(())
        }
        ConsoleCommand::Invalid(message) => {
            print!("{}", MessageFormatter::format_error(&message));
            Ok(())
        }
        ConsoleCommand::Quit => Ok(()),
    };

    // Connection and transport failures already show up through the error observable
    if let Err(
        e @ (SessionError::EmptyContent | SessionError::NoActiveRoom | SessionError::Closed),
    ) = result
    {
        print!("{}", MessageFormatter::format_error(&e.to_string()));
    }
}

/// Print whatever part of `messages` is not on screen yet
fn render(transcript: &mut Transcript, messages: &[ChatMessage], user_id: Option<&str>) -> bool {
    let start = match transcript.update(messages) {
        TranscriptChange::Unchanged | TranscriptChange::Cleared => return false,
        TranscriptChange::Append(index) => index,
        TranscriptChange::Redraw => 0,
    };
    for message in &messages[start..] {
        print!("{}", MessageFormatter::format_chat_message(message, user_id));
    }
    true
}
