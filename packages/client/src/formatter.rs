//! Message formatting utilities for the terminal client.

use crate::domain::{ChatMessage, ConnectionStatus, RoomCatalog, RoomId};

const SEPARATOR: &str = "------------------------------------------------------------";
const BANNER: &str = "============================================================";

/// Message formatter for terminal display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a chat message
    ///
    /// # Arguments
    ///
    /// * `message` - The message to render
    /// * `own_user_id` - The signed-in user's ID (to mark as "me")
    ///
    /// # Returns
    ///
    /// A formatted string with sender, content and creation time
    pub fn format_chat_message(message: &ChatMessage, own_user_id: Option<&str>) -> String {
        let sender = message
            .sender_name
            .as_deref()
            .or(message.sender_id.as_deref())
            .unwrap_or("history");
        let me_suffix = match own_user_id {
            Some(user_id) if message.is_from(user_id) => " (me)",
            _ => "",
        };
        format!(
            "\n{SEPARATOR}\n@{}{}: {}\nsent at {}\n{SEPARATOR}\n",
            sender,
            me_suffix,
            message.content,
            message.created_at.display()
        )
    }

    /// Format the banner printed when the displayed room changes
    pub fn format_room_joined(room: &RoomId, rooms: &RoomCatalog) -> String {
        format!(
            "\n\n{BANNER}\nRoom: {} ({})\n{BANNER}\n",
            rooms.display_name(room),
            room
        )
    }

    /// Format the room catalog, marking the current room
    pub fn format_room_list(rooms: &RoomCatalog, current: Option<&RoomId>) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{BANNER}\nRooms:\n"));
        if rooms.rooms().is_empty() {
            output.push_str("(No rooms)\n");
        }
        for room in rooms.rooms() {
            let marker = if current == Some(&room.id) { " (here)" } else { "" };
            output.push_str(&format!(
                "{}{} - {}: {}\n",
                room.id, marker, room.name, room.description
            ));
        }
        output.push_str(BANNER);
        output.push('\n');
        output
    }

    pub fn format_status(status: ConnectionStatus) -> String {
        format!("\n* connection {}\n", status)
    }

    pub fn format_error(message: &str) -> String {
        format!("\n! {}\n", message)
    }

    pub fn format_help() -> String {
        [
            "",
            "Commands:",
            "  /join <room>   switch to another room",
            "  /rooms         list the available rooms",
            "  /reconnect     open a new connection",
            "  /ping          check the connection",
            "  /help          show this help",
            "  /quit          leave the chat",
            "Anything else is sent to the current room.",
            "",
        ]
        .join("\n")
    }
}

/// How the displayed message list must change to match a new snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptChange {
    Unchanged,
    /// Print the messages from this index on
    Append(usize),
    /// The list changed in some other way; print it again in full
    Redraw,
    /// The list became empty
    Cleared,
}

/// Tracks which messages are already on screen
#[derive(Debug, Default)]
pub struct Transcript {
    last_shown: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `messages` with what is on screen and remember the new state
    pub fn update(&mut self, messages: &[ChatMessage]) -> TranscriptChange {
        let change = match (&self.last_shown, messages.last()) {
            (None, None) => TranscriptChange::Unchanged,
            (Some(_), None) => TranscriptChange::Cleared,
            (None, Some(_)) => TranscriptChange::Append(0),
            (Some(last_shown), Some(_)) => {
                match messages.iter().rposition(|m| &m.id == last_shown) {
                    Some(index) if index + 1 == messages.len() => TranscriptChange::Unchanged,
                    Some(index) => TranscriptChange::Append(index + 1),
                    None => TranscriptChange::Redraw,
                }
            }
        };
        self.last_shown = messages.last().map(|m| m.id.clone());
        change
    }
}
