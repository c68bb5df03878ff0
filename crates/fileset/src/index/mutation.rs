//! Create and update: sidecar first, then the index.

use super::fileset::FileSet;
use crate::error::{FilesetError, Result};
use crate::record::{FileRecord, RecordChanges, RecordKey};
use crate::sidecar::{sidecar_path, write_sidecar};
use crate::timestamp::SidecarTimestamp;
use crate::types::{Selection, UpdateFailure, UpdateReport, VersionedRecord};

impl FileSet {
    /// Creates (or replaces) the record for a file and writes its sidecar.
    ///
    /// Lifecycle fields are reset: `created` is now, the record is neither
    /// removed, hidden nor processed, and `changed_by` is the owner. A
    /// non-empty `origin` is added to the origin set.
    pub fn create(&self, record: FileRecord, origin: &str) -> Result<VersionedRecord> {
        let mut record = record;
        if record.owner.trim().is_empty() {
            return Err(FilesetError::Config("owner is required".to_string()));
        }
        if record.filename.is_empty() {
            return Err(FilesetError::InvalidInput("filename is required".to_string()));
        }

        let key = record.key();
        let path = sidecar_path(self.root(), &key)?;

        record.created = SidecarTimestamp::now_local();
        record.removed = SidecarTimestamp::removed_sentinel();
        record.hidden = false;
        record.processed = false;
        record.changed_by = record.owner.clone();
        if !origin.is_empty() {
            record.origin.push(origin.to_string());
        }
        record.derive_type();
        record.normalize_sets();

        self.key_locks.with_key(&key, self.lock_timeout, || {
            write_sidecar(&path, &record)?;
            let version = self.next_version();
            let replaced = self.write_data()?.upsert(record.clone(), version);
            log::debug!("fileset create key={key} version={version} replaced={replaced}");
            Ok(VersionedRecord {
                record: record.clone(),
                version,
            })
        })
    }

    /// Applies `changes` to every record of `selection` on behalf of
    /// `acting_user`.
    ///
    /// Each record is updated only if its index version still matches the
    /// one it was selected at. Records that changed, disappeared or could
    /// not be persisted are reported in `failed`; the rest of the batch
    /// still applies.
    pub fn update(
        &self,
        changes: &RecordChanges,
        acting_user: &str,
        selection: &Selection,
    ) -> Result<UpdateReport> {
        if acting_user.trim().is_empty() {
            return Err(FilesetError::Config("user is required".to_string()));
        }

        let mut report = UpdateReport::default();
        for selected in selection.iter() {
            let key = selected.key();
            match self.update_record(&key, selected.version, changes, acting_user) {
                Ok(updated) => report.updated.push(updated),
                Err(error) => {
                    log::warn!("fileset update skipped key={key} error={error}");
                    report.failed.push(UpdateFailure { key, error });
                }
            }
        }

        log::info!(
            "fileset update root={} user={} selected={} updated={} failed={}",
            self.root().display(),
            acting_user,
            selection.len(),
            report.updated.len(),
            report.failed.len(),
        );
        Ok(report)
    }

    fn update_record(
        &self,
        key: &RecordKey,
        expected_version: u64,
        changes: &RecordChanges,
        acting_user: &str,
    ) -> Result<VersionedRecord> {
        let path = sidecar_path(self.root(), key)?;

        self.key_locks.with_key(key, self.lock_timeout, || {
            let current = self.read_data()?.get(key);
            let Some(current) = current else {
                return Err(FilesetError::Conflict(format!("{key} is no longer indexed")));
            };
            if current.version != expected_version {
                return Err(FilesetError::Conflict(format!(
                    "{key} changed since it was selected (version {expected_version}, now {})",
                    current.version
                )));
            }

            let mut record = current.record;
            changes.apply_to(&mut record);
            record.changed_by = acting_user.to_string();

            write_sidecar(&path, &record)?;
            let version = self.next_version();
            self.write_data()?.upsert(record.clone(), version);
            Ok(VersionedRecord { record, version })
        })
    }
}
