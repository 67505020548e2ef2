//! Event Store status for observability
//!
//! `status()` is a point-in-time read that does not take the write lock:
//! individual fields may reflect different moments while a writer or a
//! snapshot cycle is in flight.

use std::fs;

use serde::Serialize;

use super::store::{EventStore, LogTarget, StoreState};

/// Point-in-time view of the store
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub state: StoreState,
    pub active_events: usize,
    pub snapshot_events: usize,
    pub backup_events: usize,
    pub active_exists: bool,
    pub snapshot_exists: bool,
    pub backup_exists: bool,
    /// Size of the active log in bytes
    pub active_log_size: u64,
    /// Size of the snapshot in bytes
    pub snapshot_size: u64,
}

impl StoreStatus {
    /// Format size in human-readable format
    pub fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.2} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.2} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.2} KB", bytes as f64 / KB as f64)
        } else {
            format!("{} B", bytes)
        }
    }

    /// Multi-line human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "state:     {}\n\
             active:    {} events ({})\n\
             snapshot:  {} events ({})\n\
             backup:    {} events",
            self.state,
            self.active_events,
            Self::format_size(self.active_log_size),
            self.snapshot_events,
            Self::format_size(self.snapshot_size),
            self.backup_events,
        )
    }
}

impl EventStore {
    /// Store state plus event counts across all variants
    pub fn status(&self) -> StoreStatus {
        let config = self.config();
        let size_of = |target| {
            fs::metadata(config.path_for(target))
                .map(|m| m.len())
                .unwrap_or(0)
        };

        StoreStatus {
            state: self.state(),
            active_events: self.count(LogTarget::Active),
            snapshot_events: self.count(LogTarget::Snapshot),
            backup_events: self.count(LogTarget::Backup),
            active_exists: config.events_path().exists(),
            snapshot_exists: config.snapshot_path().exists(),
            backup_exists: config.backup_path().exists(),
            active_log_size: size_of(LogTarget::Active),
            snapshot_size: size_of(LogTarget::Snapshot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::EventStoreConfig;
    use crate::types::RawEvent;
    use tempfile::TempDir;

    #[test]
    fn test_status_tracks_all_variants() {
        let temp_dir = TempDir::new().unwrap();
        let store = EventStore::open(EventStoreConfig::new(temp_dir.path())).unwrap();

        let status = store.status();
        assert_eq!(status.state, StoreState::Accepting);
        assert!(status.active_exists);
        assert!(!status.snapshot_exists);
        assert_eq!(status.snapshot_events, 0);

        store
            .append(RawEvent::new("2025-01-10T08:00:00", "T1", "1", "entry"))
            .unwrap();
        store.publish_snapshot().unwrap();

        let status = store.status();
        assert_eq!(status.active_events, 1);
        assert_eq!(status.snapshot_events, 1);
        assert_eq!(status.backup_events, 1);
        assert!(status.snapshot_size > 0);
        assert!(status.summary().contains("ACCEPTING"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(StoreStatus::format_size(512), "512 B");
        assert_eq!(StoreStatus::format_size(2048), "2.00 KB");
        assert_eq!(StoreStatus::format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
