//! Bulk ingestion formats
//!
//! Every parser maps its input to `RawEvent`s without judging them;
//! validation (required fields, integer door, known kind) happens once
//! inside `EventStore::append_batch`, which skips and logs bad rows.
//!
//! Supported inputs:
//! - pipe-delimited text, one `timestamp|identity|door|kind` per line
//! - CSV with a header row naming `timestamp,identity,door,kind`
//! - JSON document `{"events": [...]}`

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::event_store::{EventStore, EventStoreError};
use crate::types::RawEvent;

/// Errors raised before any event reaches the store
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON events document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV input has no header row")]
    MissingHeader,

    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

/// Input format of a bulk file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestFormat {
    Delimited,
    Csv,
    Json,
}

impl IngestFormat {
    /// Pick a format from the file extension (`.csv`, `.json`, else delimited)
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("csv") => IngestFormat::Csv,
            Some("json") => IngestFormat::Json,
            _ => IngestFormat::Delimited,
        }
    }

    pub fn parse(self, text: &str) -> Result<Vec<RawEvent>, IngestError> {
        match self {
            IngestFormat::Delimited => Ok(parse_delimited(text)),
            IngestFormat::Csv => parse_csv(text),
            IngestFormat::Json => parse_json(text),
        }
    }
}

fn field(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parse `timestamp|identity|door|kind` lines
///
/// Blank lines and `#` comments are skipped. A line with the wrong number
/// of fields still yields a record so that it is reported as invalid.
pub fn parse_delimited(text: &str) -> Vec<RawEvent> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() != 4 {
                warn!(line, fields = parts.len(), "Delimited line does not have 4 fields");
                return RawEvent::default();
            }
            RawEvent {
                timestamp: field(parts.first().copied()),
                identity: field(parts.get(1).copied()),
                door: field(parts.get(2).copied()),
                kind: field(parts.get(3).copied()),
            }
        })
        .collect()
}

/// Parse CSV with a header row; columns may appear in any order
///
/// Quoted fields may contain commas. Rows the reader cannot decode still
/// yield an empty record so that they are reported as invalid.
pub fn parse_csv(text: &str) -> Result<Vec<RawEvent>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_lowercase())
        .collect();
    if header.iter().all(|h| h.is_empty()) {
        return Err(IngestError::MissingHeader);
    }

    let column = |name: &str| header.iter().position(|h| h == name);
    let (ts_col, id_col, door_col, kind_col) = (
        column("timestamp"),
        column("identity"),
        column("door"),
        column("kind"),
    );

    let mut events = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(index, error = %e, "Unreadable CSV row");
                events.push(RawEvent::default());
                continue;
            }
        };
        if record.iter().all(str::is_empty) {
            continue;
        }

        let cell = |col: Option<usize>| field(col.and_then(|c| record.get(c)));
        events.push(RawEvent {
            timestamp: cell(ts_col),
            identity: cell(id_col),
            door: cell(door_col),
            kind: cell(kind_col),
        });
    }

    Ok(events)
}

#[derive(Debug, Deserialize)]
struct EventsDocument {
    #[serde(default)]
    events: Vec<RawEvent>,
}

/// Parse a `{"events": [...]}` JSON document
pub fn parse_json(text: &str) -> Result<Vec<RawEvent>, IngestError> {
    let doc: EventsDocument = serde_json::from_str(text)?;
    Ok(doc.events)
}

/// Read a bulk file, parse it by extension, and append it as one batch
///
/// Returns the number of events appended.
pub fn ingest_file<P: AsRef<Path>>(store: &EventStore, path: P) -> Result<usize, IngestError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let format = IngestFormat::from_path(path);
    let events = format.parse(&text)?;
    let submitted = events.len();
    let appended = store.append_batch(events)?;

    info!(
        path = %path.display(),
        format = ?format,
        submitted,
        appended,
        "Bulk file ingested"
    );
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::{EventStoreConfig, LogTarget};
    use crate::types::{Event, EventKind};
    use tempfile::TempDir;

    #[test]
    fn test_parse_delimited() {
        let text = "# badge export\n\
                    2025-01-10T08:00:00|T001|1|entrada\n\
                    \n\
                    2025-01-10T08:05:00 | T002 | 2 | ENTRY\n\
                    broken|line\n";

        let events = parse_delimited(text);

        assert_eq!(events.len(), 3);
        assert_eq!(events[1].identity.as_deref(), Some("T002"));
        assert_eq!(events[1].door.as_deref(), Some("2"));
        assert_eq!(events[2], RawEvent::default());

        let converted = Event::try_from(events[1].clone()).unwrap();
        assert_eq!(converted.kind, EventKind::Entry);
        // Unknown kind words are left for the store to reject
        assert!(Event::try_from(events[0].clone()).is_err());
    }

    #[test]
    fn test_parse_csv_any_column_order() {
        let text = "kind,door,identity,timestamp\n\
                    entry,1,T001,2025-01-10T08:00:00\n\
                    exit,,T002,2025-01-10T08:05:00\n";

        let events = parse_csv(text).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].identity.as_deref(), Some("T001"));
        assert_eq!(events[0].kind.as_deref(), Some("entry"));
        assert_eq!(events[1].door, None);
    }

    #[test]
    fn test_parse_csv_quoted_fields() {
        let text = "timestamp,identity,door,kind\n\
                    \"2025-01-10T08:00:00\",\"T001\",\"1\",\"entry\"\n\
                    2025-01-10T08:05:00,\"Doe, Jane\",2,entry\n";

        let events = parse_csv(text).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], RawEvent::new("2025-01-10T08:00:00", "T001", "1", "entry"));
        assert_eq!(events[1].identity.as_deref(), Some("Doe, Jane"));
        assert_eq!(events[1].door.as_deref(), Some("2"));
        assert_eq!(events[1].kind.as_deref(), Some("entry"));
        assert!(events.iter().all(|e| Event::try_from(e.clone()).is_ok()));
    }

    #[test]
    fn test_parse_csv_short_row_is_kept_as_invalid() {
        let text = "timestamp,identity,door,kind\n2025-01-10T08:00:00,T001\n";

        let events = parse_csv(text).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].missing_fields(), vec!["door", "kind"]);
    }

    #[test]
    fn test_parse_csv_requires_header() {
        assert!(matches!(parse_csv("   \n"), Err(IngestError::MissingHeader)));
        assert!(matches!(parse_csv(""), Err(IngestError::MissingHeader)));
    }

    #[test]
    fn test_parse_json() {
        let text = r#"{"events": [
            {"timestamp": "2025-01-10T08:00:00", "identity": "T001", "door": 1, "kind": "entry"},
            {"identity": "T002"}
        ]}"#;

        let events = parse_json(text).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].door.as_deref(), Some("1"));
        assert_eq!(events[1].missing_fields(), vec!["timestamp", "door", "kind"]);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(IngestFormat::from_path(Path::new("a/b.CSV")), IngestFormat::Csv);
        assert_eq!(IngestFormat::from_path(Path::new("events.json")), IngestFormat::Json);
        assert_eq!(IngestFormat::from_path(Path::new("events.txt")), IngestFormat::Delimited);
        assert_eq!(IngestFormat::from_path(Path::new("events")), IngestFormat::Delimited);
    }

    #[test]
    fn test_ingest_file_appends_valid_rows() {
        let temp_dir = TempDir::new().unwrap();
        let store = EventStore::open(EventStoreConfig::new(temp_dir.path().join("data"))).unwrap();
        let csv_path = temp_dir.path().join("swipes.csv");
        fs::write(
            &csv_path,
            "timestamp,identity,door,kind\n\
             2025-01-10T08:00:00,T001,1,entry\n\
             2025-01-10T08:05:00,T002,two,entry\n\
             2025-01-10T09:00:00,T001,1,exit\n",
        )
        .unwrap();

        let appended = ingest_file(&store, &csv_path).unwrap();

        assert_eq!(appended, 2);
        assert_eq!(store.count(LogTarget::Active), 2);
    }

    #[test]
    fn test_ingest_quoted_csv() {
        let temp_dir = TempDir::new().unwrap();
        let store = EventStore::open(EventStoreConfig::new(temp_dir.path().join("data"))).unwrap();
        let csv_path = temp_dir.path().join("export.csv");
        fs::write(
            &csv_path,
            "\"timestamp\",\"identity\",\"door\",\"kind\"\n\
             \"2025-01-10T08:00:00\",\"T001\",\"1\",\"entry\"\n\
             2025-01-10T08:05:00,\"Doe, Jane\",2,entry\n",
        )
        .unwrap();

        assert_eq!(ingest_file(&store, &csv_path).unwrap(), 2);
        let events = store.load(LogTarget::Active).unwrap();
        assert_eq!(events[1].identity, "Doe, Jane");
    }

    #[test]
    fn test_ingest_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = EventStore::open(EventStoreConfig::new(temp_dir.path())).unwrap();

        let err = ingest_file(&store, temp_dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));
    }
}
