//! Timestamp parsing and display helpers.
//!
//! The chat backend serializes `created_at` as an RFC 3339 string. Clients keep
//! the raw string around and only parse it for display, so a malformed value
//! never prevents a message from being shown.

use chrono::{DateTime, FixedOffset, Local, TimeZone};

/// Display format used for chat timestamps
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse an RFC 3339 timestamp (with optional fractional seconds)
pub fn parse_rfc3339(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}

/// Format a timestamp in the given time zone
pub fn format_in<Tz: TimeZone>(timestamp: &DateTime<FixedOffset>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.with_timezone(tz).format(DISPLAY_FORMAT).to_string()
}

/// Format a raw wire timestamp for display in the local time zone.
///
/// Falls back to the raw string when it cannot be parsed.
pub fn format_for_display(raw: &str) -> String {
    match parse_rfc3339(raw) {
        Some(timestamp) => format_in(&timestamp, &Local),
        None => raw.to_string(),
    }
}
