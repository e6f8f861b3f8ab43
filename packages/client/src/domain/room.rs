//! Chat rooms and the static room catalog.

use std::fmt;

use thiserror::Error;

/// Errors raised when constructing a [`RoomId`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomIdError {
    /// Room id is empty or whitespace only
    #[error("Room ID must not be empty")]
    Empty,
}

/// Opaque room identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Create a room id, rejecting blank values
    pub fn new(value: impl Into<String>) -> Result<Self, RoomIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(RoomIdError::Empty);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = RoomIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for RoomId {
    type Error = RoomIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chat room as presented to users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
}

impl Room {
    pub fn new(id: RoomId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Static list of rooms offered by the forum.
///
/// The catalog only provides display metadata. Joining a room that is not in
/// the catalog is allowed; its display name is the raw id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomCatalog {
    rooms: Vec<Room>,
}

impl RoomCatalog {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self { rooms }
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn get(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| &room.id == id)
    }

    /// The first room of the catalog, used when no room was requested
    pub fn default_room(&self) -> Option<&Room> {
        self.rooms.first()
    }

    pub fn display_name(&self, id: &RoomId) -> String {
        self.get(id)
            .map(|room| room.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

impl Default for RoomCatalog {
    fn default() -> Self {
        let entries = [
            ("general", "General", "Everyday chat and campus news."),
            ("study-help", "Study Help", "Homework questions and course material."),
            ("resources", "Resources", "Revision notes and exam tips."),
        ];
        let rooms = entries
            .into_iter()
            .filter_map(|(id, name, description)| {
                RoomId::new(id)
                    .ok()
                    .map(|id| Room::new(id, name, description))
            })
            .collect();
        Self { rooms }
    }
}
