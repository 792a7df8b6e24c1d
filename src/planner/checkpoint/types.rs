//! On-disk snapshot envelope.
//!
//! Only the config and recent readings are persisted. Rates, phase and the
//! prediction are rebuilt by the planner after loading.

use serde::{Deserialize, Serialize};

use crate::planner::session::SessionSnapshot;

/// Current schema version of the snapshot file.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Snapshot metadata for versioning and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Schema version for forward compatibility
    pub version: u32,
    /// When the snapshot was written (ms since epoch)
    pub saved_at_ms: i64,
}

/// Complete snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub metadata: SnapshotMetadata,
    pub session: SessionSnapshot,
}
