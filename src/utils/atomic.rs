//! Atomic file operations
//!
//! Every rewrite of a log variant goes through a temporary sibling file:
//!
//! 1. Write to `<name>.tmp`
//! 2. Call sync_all() to flush to disk
//! 3. Rename temp file to final path (atomic on most filesystems)
//!
//! A reader of the final path sees either the old or the new document,
//! never a partial one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with whatever `write_fn` produces
///
/// ```ignore
/// atomic_write_with("data/events.json", |file| {
///     serde_json::to_writer_pretty(&mut *file, &log).map_err(io::Error::other)
/// })?;
/// ```
///
/// On failure the temp file is removed and `path` keeps its old content.
pub fn atomic_write_with<P, F>(path: P, write_fn: F) -> io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let result = (|| {
        let mut file = File::create(&temp_path)?;
        write_fn(&mut file)?;
        file.flush()?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Byte-for-byte copy of `from` to `to`, published atomically
///
/// Returns the number of bytes copied.
pub fn atomic_copy<P1, P2>(from: P1, to: P2) -> io::Result<u64>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let to = to.as_ref();
    let temp_path = temp_path_for(to);

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }

    let result = (|| {
        let bytes = fs::copy(from.as_ref(), &temp_path)?;
        File::open(&temp_path)?.sync_all()?;
        fs::rename(&temp_path, to)?;
        Ok(bytes)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Remove `*.tmp` siblings left in `dir` by an interrupted rewrite
///
/// Returns how many were removed. A missing directory counts as clean.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_file() && path.extension().map(|e| e == "tmp").unwrap_or(false) {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rewrite_replaces_log_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.json");
        fs::write(&path, "{\"events\": []}").unwrap();

        atomic_write_with(&path, |file| {
            write!(file, "{{\"events\": [{{\"identity\": \"T1\"}}]}}")
        })
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("T1"));
        assert!(!temp_dir.path().join("events.json.tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("subdir").join("nested").join("events.json");

        atomic_write_with(&path, |file| file.write_all(b"{}")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_failed_write_keeps_old_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.json");
        fs::write(&path, "old").unwrap();

        let result = atomic_write_with(&path, |file| {
            file.write_all(b"{\"events\": [")?;
            Err(io::Error::other("serializer failed"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
        assert!(!temp_dir.path().join("events.json.tmp").exists());
    }

    #[test]
    fn test_atomic_copy_is_byte_for_byte() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("events.json");
        let to = temp_dir.path().join("events_snapshot.json");
        fs::write(&from, "{\n  \"events\": []\n}").unwrap();

        let bytes = atomic_copy(&from, &to).unwrap();

        assert_eq!(bytes, fs::metadata(&from).unwrap().len());
        assert_eq!(fs::read(&from).unwrap(), fs::read(&to).unwrap());
    }

    #[test]
    fn test_atomic_copy_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = atomic_copy(temp_dir.path().join("nope.json"), temp_dir.path().join("out.json"));
        assert!(result.is_err());
        assert!(!temp_dir.path().join("out.json").exists());
    }

    #[test]
    fn test_interrupted_rewrites_are_swept() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("events.json.tmp"), "{\"events\": [").unwrap();
        fs::write(dir.join("events_snapshot.json.tmp"), "").unwrap();
        fs::write(dir.join("events.json"), "{\"events\": []}").unwrap();

        assert_eq!(cleanup_temp_files(dir).unwrap(), 2);
        assert_eq!(cleanup_temp_files(dir).unwrap(), 0);
        assert!(dir.join("events.json").exists());
        assert_eq!(cleanup_temp_files(dir.join("missing")).unwrap(), 0);
    }
}
