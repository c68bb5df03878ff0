//! Result types returned by fileset operations.

use serde::{Serialize, Serializer};

use crate::error::FilesetError;
use crate::ingest::IngestIssue;
use crate::record::{FileRecord, RecordKey};
use crate::walker::TreeScope;

/// A record together with the index version it was read at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionedRecord {
    #[serde(flatten)]
    pub record: FileRecord,
    pub version: u64,
}

impl VersionedRecord {
    pub fn key(&self) -> RecordKey {
        self.record.key()
    }
}

/// The materialised result of a query, in no particular order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    pub records: Vec<VersionedRecord>,
}

impl Selection {
    pub fn new(records: Vec<VersionedRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionedRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<VersionedRecord> {
        self.records
    }
}

/// A record the update could not apply.
#[derive(Debug, Serialize)]
pub struct UpdateFailure {
    pub key: RecordKey,
    #[serde(serialize_with = "serialize_display")]
    pub error: FilesetError,
}

/// Outcome of a batch update: every record is either updated or failed.
#[derive(Debug, Default, Serialize)]
pub struct UpdateReport {
    pub updated: Vec<VersionedRecord>,
    pub failed: Vec<UpdateFailure>,
}

impl UpdateReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Index status information.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    /// Current state of the index.
    pub state: String,
    /// Managed root path.
    pub root: String,
    /// Part of the root covered by the current snapshot.
    pub scope: TreeScope,
    /// Number of records in the index.
    pub indexed_records: usize,
    /// Directories visited by the last build.
    pub scanned_dirs: usize,
    /// Sidecars read by the last build.
    pub scanned_sidecars: usize,
    /// Unix timestamp when the last build started.
    pub started_at: Option<u64>,
    /// Unix timestamp when the last build finished.
    pub finished_at: Option<u64>,
    /// Number of sidecars or directories skipped by the last build.
    pub errors: usize,
    /// Skipped sidecars or directories from the last build.
    pub issues: Vec<IngestIssue>,
    /// Last error message if state is "error".
    pub last_error: Option<String>,
}

fn serialize_display<S: Serializer>(
    value: &FilesetError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
