//! Event types for the badge-swipe log
//!
//! `Event` is the validated, immutable record stored in the log.
//! `RawEvent` is the unvalidated shape that arrives from ingestion
//! sources; converting it into an `Event` is the single validation point.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::parse_timestamp;

/// Direction of a badge swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Identity passed a door into the building
    Entry,
    /// Identity passed a door out of the building
    Exit,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Entry => write!(f, "entry"),
            EventKind::Exit => write!(f, "exit"),
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entry" => Ok(EventKind::Entry),
            "exit" => Ok(EventKind::Exit),
            other => Err(format!("unknown event kind '{}'", other)),
        }
    }
}

/// An immutable badge-swipe event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Wall-clock time of the swipe (no timezone)
    pub timestamp: NaiveDateTime,

    /// Badge/card identifier
    pub identity: String,

    /// Physical door number
    pub door: i64,

    /// Entry or exit
    pub kind: EventKind,
}

impl Event {
    pub fn new(timestamp: NaiveDateTime, identity: impl Into<String>, door: i64, kind: EventKind) -> Self {
        Self {
            timestamp,
            identity: identity.into(),
            door,
            kind,
        }
    }

    /// Hour of day (0-23) the event happened in
    pub fn hour(&self) -> u32 {
        use chrono::Timelike;
        self.timestamp.hour()
    }
}

/// Reason an incoming record could not become an [`Event`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEvent(pub String);

impl fmt::Display for InvalidEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unvalidated event record as produced by ingestion parsers
///
/// Every field is optional so that malformed rows survive parsing and are
/// rejected (and logged) at the store boundary instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub door: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

impl RawEvent {
    pub fn new(timestamp: &str, identity: &str, door: &str, kind: &str) -> Self {
        Self {
            timestamp: Some(timestamp.to_string()),
            identity: Some(identity.to_string()),
            door: Some(door.to_string()),
            kind: Some(kind.to_string()),
        }
    }

    /// Names of required fields that are missing or blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("timestamp", &self.timestamp),
            ("identity", &self.identity),
            ("door", &self.door),
            ("kind", &self.kind),
        ];
        fields
            .iter()
            .filter(|(_, value)| value.as_deref().map(str::trim).unwrap_or("").is_empty())
            .map(|(name, _)| *name)
            .collect()
    }
}

impl TryFrom<RawEvent> for Event {
    type Error = InvalidEvent;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let missing = raw.missing_fields();
        if !missing.is_empty() {
            return Err(InvalidEvent(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        // Checked non-empty above
        let timestamp = raw.timestamp.unwrap_or_default();
        let identity = raw.identity.unwrap_or_default();
        let door = raw.door.unwrap_or_default();
        let kind = raw.kind.unwrap_or_default();

        let timestamp = parse_timestamp(&timestamp)
            .ok_or_else(|| InvalidEvent(format!("invalid timestamp '{}'", timestamp.trim())))?;
        let door = door
            .trim()
            .parse::<i64>()
            .map_err(|_| InvalidEvent(format!("door '{}' is not an integer", door.trim())))?;
        let kind = kind.parse::<EventKind>().map_err(InvalidEvent)?;

        Ok(Event {
            timestamp,
            identity: identity.trim().to_string(),
            door,
            kind,
        })
    }
}

impl From<Event> for RawEvent {
    fn from(event: Event) -> Self {
        Self {
            timestamp: Some(event.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()),
            identity: Some(event.identity),
            door: Some(event.door.to_string()),
            kind: Some(event.kind.to_string()),
        }
    }
}

/// Accept `"door": 3` as well as `"door": "3"`
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// On-disk log document: a single top-level `events` collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

impl EventLog {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_raw_event_converts() {
        let raw = RawEvent::new("2025-01-10T08:00:00", "T001234", "1", "Entry");
        let event = Event::try_from(raw).unwrap();

        assert_eq!(event.identity, "T001234");
        assert_eq!(event.door, 1);
        assert_eq!(event.kind, EventKind::Entry);
        assert_eq!(event.hour(), 8);
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let raw = RawEvent {
            timestamp: Some("2025-01-10T08:00:00".to_string()),
            identity: Some("   ".to_string()),
            door: None,
            kind: Some("exit".to_string()),
        };

        let err = Event::try_from(raw).unwrap_err();
        assert!(err.0.contains("identity"));
        assert!(err.0.contains("door"));
    }

    #[test]
    fn test_non_integer_door_rejected() {
        let raw = RawEvent::new("2025-01-10T08:00:00", "T1", "north", "entry");
        let err = Event::try_from(raw).unwrap_err();
        assert!(err.0.contains("not an integer"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let raw = RawEvent::new("2025-01-10T08:00:00", "T1", "2", "visit");
        assert!(Event::try_from(raw).is_err());
    }

    #[test]
    fn test_event_serializes_with_stable_schema() {
        let event = Event::try_from(RawEvent::new("2025-01-10T08:05:00", "T2", "2", "exit")).unwrap();
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            json!({
                "timestamp": "2025-01-10T08:05:00",
                "identity": "T2",
                "door": 2,
                "kind": "exit"
            })
        );
    }

    #[test]
    fn test_raw_event_accepts_numeric_door() {
        let raw: RawEvent = serde_json::from_value(json!({
            "timestamp": "2025-01-10T08:00:00",
            "identity": "T1",
            "door": 4,
            "kind": "entry"
        }))
        .unwrap();

        assert_eq!(raw.door.as_deref(), Some("4"));
    }
}
