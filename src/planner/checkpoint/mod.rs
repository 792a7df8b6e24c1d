//! Snapshot persistence so a session survives restarts.
//!
//! The store writes `{config, readings}` to a single JSON file after each
//! command and reads it back at startup.
//!
//! # Design Decisions
//!
//! - **JSON format**: Human-readable, version field for migrations
//! - **Atomic writes**: Write to `.tmp`, then `fs::rename` to prevent corruption
//! - **Missing file is not an error**: `load` returns `Ok(None)`

mod types;

pub use types::*;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::PersistenceError;
use crate::planner::session::SessionSnapshot;

/// Reads and writes session snapshots at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Save a snapshot atomically.
    ///
    /// 1. Writes to `<path>.tmp`
    /// 2. Renames over `<path>` (atomic on the same filesystem)
    pub fn save(&self, session: &SessionSnapshot, saved_at_ms: i64) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = SnapshotFile {
            metadata: SnapshotMetadata {
                version: SNAPSHOT_VERSION,
                saved_at_ms,
            },
            session: session.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, &json)?;
        fs::rename(&tmp_path, &self.path)?;

        info!(
            readings = session.readings.len(),
            saved_at_ms,
            "Snapshot saved to {}",
            self.path.display()
        );
        Ok(())
    }

    /// Load the stored snapshot.
    ///
    /// Returns `Ok(None)` if no snapshot exists.
    /// Returns `Err` on I/O errors, malformed JSON or an unknown version.
    pub fn load(&self) -> Result<Option<SessionSnapshot>, PersistenceError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file: SnapshotFile = serde_json::from_str(&json)?;
        if file.metadata.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: file.metadata.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        info!(
            readings = file.session.readings.len(),
            saved_at_ms = file.metadata.saved_at_ms,
            "Loaded snapshot from {}",
            self.path.display()
        );
        Ok(Some(file.session))
    }

    /// Remove the stored snapshot, if any.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cleared snapshot {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Reading, TimingConfig};

    fn make_snapshot() -> SessionSnapshot {
        SessionSnapshot {
            config: TimingConfig::new(250_000, 6, 3),
            readings: vec![Reading::new(1_000, 900), Reading::new(2_000, 850)],
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state/session.json"));

        store.save(&make_snapshot(), 1_700_000_000_000).expect("save");
        let loaded = store.load().expect("load").expect("should exist");

        assert_eq!(loaded, make_snapshot());
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn test_load_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("none.json"));
        assert!(store.load().unwrap().is_none());
        // Clearing a missing file is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_load_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, PersistenceError::Json(_)));
    }

    #[test]
    fn test_load_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("v9.json"));
        let file = SnapshotFile {
            metadata: SnapshotMetadata {
                version: 9,
                saved_at_ms: 0,
            },
            session: make_snapshot(),
        };
        fs::write(store.path(), serde_json::to_string(&file).unwrap()).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::UnsupportedVersion {
                found: 9,
                expected: 1
            }
        ));
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("session.json"));
        store.save(&make_snapshot(), 0).unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
