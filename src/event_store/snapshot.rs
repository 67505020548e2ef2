//! Snapshot publishing for safe downstream consumption
//!
//! A snapshot cycle holds the store's write lock for its whole duration:
//!
//! ```text
//! lock ─► PAUSED ─► copy active → backup ─► copy active → snapshot ─► prior state ─► unlock
//! ```
//!
//! Appends arriving while PAUSED fail with `WriteRejected` instead of
//! queueing. The PAUSED window is owned by a guard whose `Drop` restores
//! the state found at entry, so a failed copy never leaves an accepting
//! store paused, and an operator `pause()` outlives the snapshot.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::types::EventLog;
use crate::utils::atomic_copy;

use super::store::{EventStore, EventStoreError, EventStoreResult, LogTarget, StoreState};

/// Outcome of a successful snapshot cycle
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    /// Records in the published snapshot
    pub events: usize,
    /// Bytes copied into the snapshot
    pub bytes: u64,
    /// Whether a backup copy was written
    pub backup_written: bool,
    /// True when there was no active log and an empty snapshot was written
    pub initialized_empty: bool,
    /// Time writes were rejected
    #[serde(with = "duration_millis")]
    pub paused_for: Duration,
}

/// Holds the store PAUSED; restores the prior state when dropped
struct PauseGuard<'a> {
    store: &'a EventStore,
    prior: StoreState,
    since: Instant,
}

impl<'a> PauseGuard<'a> {
    /// The caller must hold the store's write lock
    fn engage(store: &'a EventStore) -> Self {
        let prior = store.state();
        store.set_state(StoreState::Paused);
        info!(prior = %prior, "Snapshot: writes paused");
        Self {
            store,
            prior,
            since: Instant::now(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.since.elapsed()
    }
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.store.set_state(self.prior);
        info!(
            state = %self.prior,
            paused_ms = self.since.elapsed().as_millis() as u64,
            "Snapshot: prior state restored"
        );
    }
}

impl EventStore {
    /// Freeze the active log into the snapshot file
    ///
    /// Copies the active log to the backup and snapshot locations inside a
    /// single PAUSED window. If the active log is missing, an empty snapshot
    /// is written instead. Success or failure, the store returns to the
    /// state it was in before the call: an accepting store accepts again,
    /// a store paused with [`EventStore::pause`] stays paused.
    pub fn publish_snapshot(&self) -> EventStoreResult<SnapshotReport> {
        let _lock = self.lock_writes();
        let config = self.config().clone();
        let active = config.events_path();

        let pause = PauseGuard::engage(self);

        let copied = if active.exists() {
            atomic_copy(&active, config.backup_path())
                .map_err(|e| EventStoreError::io(&config.backup_path(), e))
                .and_then(|_| {
                    info!(path = %config.backup_path().display(), "Snapshot: backup written");
                    atomic_copy(&active, config.snapshot_path())
                        .map_err(|e| EventStoreError::io(&config.snapshot_path(), e))
                })
                .map(|bytes| (bytes, true, false))
        } else {
            warn!("Snapshot: active log missing, writing empty snapshot");
            self.write_document(&config.snapshot_path(), &EventLog::default())
                .map(|_| (0, false, true))
        };

        let paused_for = pause.elapsed();
        drop(pause);

        let (bytes, backup_written, initialized_empty) = match copied {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Snapshot failed");
                return Err(e);
            }
        };

        // Still under the write lock, so nothing can touch the snapshot yet
        let events = self.count(LogTarget::Snapshot);
        info!(events, bytes, "Snapshot published");

        Ok(SnapshotReport {
            events,
            bytes,
            backup_written,
            initialized_empty,
            paused_for,
        })
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
