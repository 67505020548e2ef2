//! Event Store - append-only badge event log
//!
//! The EventStore owns the active log file and its snapshot/backup
//! siblings. All mutating operations are serialized by a single write
//! lock; the PAUSED state gate is checked both before and after taking
//! the lock so that writers never queue behind a snapshot cycle.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::types::{Event, EventLog, InvalidEvent, RawEvent};
use crate::utils::{atomic_write_with, cleanup_temp_files};

/// Configuration for the EventStore
#[derive(Debug, Clone)]
pub struct EventStoreConfig {
    /// Directory holding the active log and its siblings
    pub data_dir: PathBuf,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl EventStoreConfig {
    /// Create config with custom data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the actively written log
    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join("events.json")
    }

    /// Path of the consumer-facing snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("events_snapshot.json")
    }

    /// Path of the recovery copy taken at each snapshot
    pub fn backup_path(&self) -> PathBuf {
        self.data_dir.join("events_backup.json")
    }

    /// Path for a given file variant
    pub fn path_for(&self, target: LogTarget) -> PathBuf {
        match target {
            LogTarget::Active => self.events_path(),
            LogTarget::Snapshot => self.snapshot_path(),
            LogTarget::Backup => self.backup_path(),
        }
    }
}

/// Which copy of the log an operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogTarget {
    /// The log receiving appends
    Active,
    /// The stable copy read by consumers
    Snapshot,
    /// Pre-snapshot recovery copy
    Backup,
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::Active => write!(f, "active"),
            LogTarget::Snapshot => write!(f, "snapshot"),
            LogTarget::Backup => write!(f, "backup"),
        }
    }
}

impl std::str::FromStr for LogTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(LogTarget::Active),
            "snapshot" => Ok(LogTarget::Snapshot),
            "backup" => Ok(LogTarget::Backup),
            other => Err(format!("unknown log target '{}'", other)),
        }
    }
}

/// Whether appends are currently admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreState {
    Accepting,
    Paused,
}

impl fmt::Display for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreState::Accepting => write!(f, "ACCEPTING"),
            StoreState::Paused => write!(f, "PAUSED"),
        }
    }
}

/// Result type for EventStore operations
pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Errors that can occur in EventStore operations
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// Missing required field or un-coercible value
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Append attempted while the store is PAUSED
    #[error("write rejected: store is paused")]
    WriteRejected,

    /// Reading or writing one of the log files failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A log file exists but is not a valid `events` document
    #[error("log document {} is corrupted: {source}", path.display())]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<InvalidEvent> for EventStoreError {
    fn from(e: InvalidEvent) -> Self {
        EventStoreError::InvalidEvent(e.0)
    }
}

impl EventStoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        EventStoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The EventStore manages the append-only badge event log
///
/// Construct one per data directory and share it (e.g. behind an `Arc`)
/// between writer threads and the snapshot publisher.
pub struct EventStore {
    config: EventStoreConfig,
    /// Serializes every mutation of the log files
    write_lock: Mutex<()>,
    /// Set only while `write_lock` is held
    paused: AtomicBool,
}

impl EventStore {
    /// Open (or initialize) the store in the configured data directory
    ///
    /// Creates the directory and an empty active log if either is absent,
    /// and removes temp files left by an interrupted rewrite.
    pub fn open(config: EventStoreConfig) -> EventStoreResult<Self> {
        let data_dir = config.data_dir().to_path_buf();
        fs::create_dir_all(&data_dir).map_err(|e| EventStoreError::io(&data_dir, e))?;

        match cleanup_temp_files(&data_dir) {
            Ok(0) => {}
            Ok(n) => warn!(count = n, dir = %data_dir.display(), "Removed leftover temp files"),
            Err(e) => warn!(error = %e, "Failed to clean temp files"),
        }

        let store = Self {
            config,
            write_lock: Mutex::new(()),
            paused: AtomicBool::new(false),
        };

        let events_path = store.config.events_path();
        if !events_path.exists() {
            store.write_document(&events_path, &EventLog::default())?;
            info!(path = %events_path.display(), "Initialized empty event log");
        }

        Ok(store)
    }

    /// Get the configuration
    pub fn config(&self) -> &EventStoreConfig {
        &self.config
    }

    /// Current store state (advisory; may change immediately after)
    pub fn state(&self) -> StoreState {
        if self.paused.load(Ordering::SeqCst) {
            StoreState::Paused
        } else {
            StoreState::Accepting
        }
    }

    /// Append a single event
    ///
    /// Fails with `InvalidEvent` before any I/O, and with `WriteRejected`
    /// without waiting on the write lock when the store is paused.
    pub fn append(&self, event: impl Into<RawEvent>) -> EventStoreResult<()> {
        let event = Event::try_from(event.into()).map_err(|e| {
            warn!(reason = %e, "Rejected invalid event");
            EventStoreError::from(e)
        })?;

        self.ensure_accepting()?;
        let _guard = self.write_lock.lock();
        self.ensure_accepting()?;

        let path = self.config.events_path();
        let result = self.read_document(&path).and_then(|mut log| {
            log.events.push(event_value(&event, &path)?);
            self.write_document(&path, &log)
        });

        match result {
            Ok(()) => {
                info!(
                    identity = %event.identity,
                    kind = %event.kind,
                    door = event.door,
                    "Event appended"
                );
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to append event");
                Err(e)
            }
        }
    }

    /// Append a batch of events in one read-modify-write of the log
    ///
    /// Invalid entries are skipped and logged; valid ones are committed
    /// together. Returns the number of events appended. A paused store
    /// rejects the whole batch.
    pub fn append_batch<I, E>(&self, events: I) -> EventStoreResult<usize>
    where
        I: IntoIterator<Item = E>,
        E: Into<RawEvent>,
    {
        let mut submitted = 0usize;
        let mut valid = Vec::new();
        for (index, raw) in events.into_iter().enumerate() {
            submitted += 1;
            match Event::try_from(raw.into()) {
                Ok(event) => valid.push(event),
                Err(e) => warn!(index, reason = %e, "Skipping invalid event in batch"),
            }
        }

        self.ensure_accepting()?;

        if valid.is_empty() {
            info!(submitted, "Batch contained no valid events");
            return Ok(0);
        }

        let _guard = self.write_lock.lock();
        self.ensure_accepting()?;

        let path = self.config.events_path();
        let result = self.read_document(&path).and_then(|mut log| {
            for event in &valid {
                log.events.push(event_value(event, &path)?);
            }
            self.write_document(&path, &log)
        });

        match result {
            Ok(()) => {
                info!(appended = valid.len(), submitted, "Batch appended");
                Ok(valid.len())
            }
            Err(e) => {
                error!(error = %e, "Failed to append batch");
                Err(e)
            }
        }
    }

    /// Number of records in a file variant
    ///
    /// Never fails: a missing or unreadable file counts as 0.
    pub fn count(&self, target: LogTarget) -> usize {
        let path = self.config.path_for(target);
        if !path.exists() {
            return 0;
        }
        match self.read_document(&path) {
            Ok(log) => log.len(),
            Err(e) => {
                warn!(variant = %target, error = %e, "Could not count events");
                0
            }
        }
    }

    /// Load the valid events of a file variant in log order
    ///
    /// A missing file yields an empty list. Records that do not validate
    /// are skipped with a warning.
    pub fn load(&self, target: LogTarget) -> EventStoreResult<Vec<Event>> {
        let path = self.config.path_for(target);
        let log = self.read_document(&path)?;
        let mut events = Vec::with_capacity(log.len());

        for (index, value) in log.events.into_iter().enumerate() {
            let parsed = serde_json::from_value::<RawEvent>(value)
                .map_err(|e| InvalidEvent(e.to_string()))
                .and_then(Event::try_from);
            match parsed {
                Ok(event) => events.push(event),
                Err(e) => warn!(variant = %target, index, reason = %e, "Skipping unreadable record"),
            }
        }

        Ok(events)
    }

    /// Load the consumer-facing snapshot
    pub fn load_snapshot(&self) -> EventStoreResult<Vec<Event>> {
        self.load(LogTarget::Snapshot)
    }

    /// Reinitialize a file variant to an empty document
    pub fn reset(&self, target: LogTarget) -> EventStoreResult<()> {
        let _guard = self.write_lock.lock();
        let path = self.config.path_for(target);

        match self.write_document(&path, &EventLog::default()) {
            Ok(()) => {
                info!(variant = %target, "Log reset");
                Ok(())
            }
            Err(e) => {
                error!(variant = %target, error = %e, "Failed to reset log");
                Err(e)
            }
        }
    }

    /// Stop admitting appends until [`EventStore::resume`]
    pub fn pause(&self) {
        let _guard = self.write_lock.lock();
        self.set_state(StoreState::Paused);
        info!("Writes paused");
    }

    /// Re-admit appends
    pub fn resume(&self) {
        let _guard = self.write_lock.lock();
        self.set_state(StoreState::Accepting);
        info!("Writes resumed");
    }

    pub(crate) fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock()
    }

    /// Callers must hold the write lock
    pub(crate) fn set_state(&self, state: StoreState) {
        self.paused.store(state == StoreState::Paused, Ordering::SeqCst);
        debug!(state = %state, "Store state changed");
    }

    fn ensure_accepting(&self) -> EventStoreResult<()> {
        if self.paused.load(Ordering::SeqCst) {
            warn!("Store paused; write rejected");
            return Err(EventStoreError::WriteRejected);
        }
        Ok(())
    }

    pub(crate) fn read_document(&self, path: &Path) -> EventStoreResult<EventLog> {
        if !path.exists() {
            return Ok(EventLog::default());
        }

        let content = fs::read_to_string(path).map_err(|e| EventStoreError::io(path, e))?;
        if content.trim().is_empty() {
            return Ok(EventLog::default());
        }

        serde_json::from_str(&content).map_err(|source| EventStoreError::Corrupted {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn write_document(&self, path: &Path, log: &EventLog) -> EventStoreResult<()> {
        atomic_write_with(path, |file| {
            serde_json::to_writer_pretty(&mut *file, log).map_err(io::Error::other)?;
            writeln!(file)
        })
        .map_err(|e| EventStoreError::io(path, e))
    }
}

fn event_value(event: &Event, path: &Path) -> EventStoreResult<serde_json::Value> {
    serde_json::to_value(event).map_err(|source| EventStoreError::Corrupted {
        path: path.to_path_buf(),
        source,
    })
}
