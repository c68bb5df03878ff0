//! Versioned record storage for one index snapshot.

use std::path::PathBuf;

use fnv::FnvHashMap;
use rayon::prelude::*;

use crate::record::{FileRecord, RecordKey};
use crate::types::VersionedRecord;
use crate::walker::TreeScope;

#[derive(Debug, Clone)]
pub(crate) struct IndexEntry {
    pub record: FileRecord,
    pub version: u64,
}

/// Records of one snapshot plus the tree they were ingested from.
#[derive(Debug, Default)]
pub(crate) struct IndexData {
    entries: FnvHashMap<RecordKey, IndexEntry>,
    tree: Vec<PathBuf>,
    scope: TreeScope,
}

impl IndexData {
    pub fn new(tree: Vec<PathBuf>, scope: TreeScope) -> Self {
        Self {
            entries: FnvHashMap::default(),
            tree,
            scope,
        }
    }

    /// Inserts or replaces the record with the same key.
    ///
    /// Returns true when an existing record was replaced.
    pub fn upsert(&mut self, record: FileRecord, version: u64) -> bool {
        self.entries
            .insert(record.key(), IndexEntry { record, version })
            .is_some()
    }

    pub fn get(&self, key: &RecordKey) -> Option<VersionedRecord> {
        self.entries.get(key).map(|entry| VersionedRecord {
            record: entry.record.clone(),
            version: entry.version,
        })
    }

    /// Evaluates `predicate` over every record in parallel.
    pub fn select<F>(&self, predicate: F) -> Vec<VersionedRecord>
    where
        F: Fn(&FileRecord) -> bool + Sync,
    {
        self.entries
            .par_iter()
            .filter(|(_, entry)| predicate(&entry.record))
            .map(|(_, entry)| VersionedRecord {
                record: entry.record.clone(),
                version: entry.version,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn tree(&self) -> &[PathBuf] {
        &self.tree
    }

    pub fn scope(&self) -> &TreeScope {
        &self.scope
    }
}
