//! FileSet - the record index of one managed root.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::build::{unix_now_secs, IndexBuildProgress, IndexBuildState};
use super::data::IndexData;
use crate::config::FilesetConfig;
use crate::error::{canonicalize_existing_path, lock_timeout_error, FilesetError, Result};
use crate::ingest::{ingest_tree, IngestIssue, IngestReport};
use crate::locks::KeyLocks;
use crate::query::{FilterRequest, RecordMatcher};
use crate::record::RecordKey;
use crate::types::{IndexStatus, Selection, VersionedRecord};
use crate::walker::{list_data_files, walk_tree, TreeScope};

/// In-memory index of the sidecar records under one root.
///
/// Queries share a read lock over the current snapshot; a rebuild swaps the
/// whole snapshot under the write lock; create and update serialize per
/// record key. Every lock wait is bounded by the configured timeout.
#[derive(Debug)]
pub struct FileSet {
    root: PathBuf,
    pub(super) lock_timeout: Duration,
    data: RwLock<IndexData>,
    pub(super) key_locks: KeyLocks,
    versions: AtomicU64,
    build_state: AtomicU8,
    build_progress: IndexBuildProgress,
    build_last_error: Mutex<Option<String>>,
    build_issues: Mutex<Vec<IngestIssue>>,
}

impl FileSet {
    /// Opens the root described by `config` and builds its index.
    pub fn open(config: &FilesetConfig) -> Result<Self> {
        if !config.root.exists() {
            return Err(FilesetError::PathNotFound(config.root.clone()));
        }
        let root = canonicalize_existing_path(config.root.clone());

        let fileset = Self {
            root,
            lock_timeout: config.lock_timeout(),
            data: RwLock::new(IndexData::default()),
            key_locks: KeyLocks::new(),
            versions: AtomicU64::new(0),
            build_state: AtomicU8::new(IndexBuildState::Idle as u8),
            build_progress: IndexBuildProgress::default(),
            build_last_error: Mutex::new(None),
            build_issues: Mutex::new(Vec::new()),
        };
        fileset.rebuild(&config.scope)?;
        Ok(fileset)
    }

    /// Opens the root with a tree limited to the request's `base_path` and
    /// `recursive` settings.
    pub fn open_for(config: &FilesetConfig, request: &FilterRequest) -> Result<Self> {
        Self::open(&config.clone().with_scope(request.scope()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks `scope`, ingests its sidecars and installs the result as the
    /// new snapshot.
    ///
    /// The write lock is held for the whole build. If the walk fails the
    /// previous snapshot stays in place and the build state becomes `error`.
    pub fn rebuild(&self, scope: &TreeScope) -> Result<IngestReport> {
        let build_started = Instant::now();
        let mut data = self.write_data()?;

        IndexBuildState::Building.store(&self.build_state);
        self.build_progress.reset_for_build(unix_now_secs());

        let tree = match walk_tree(&self.root, scope) {
            Ok(tree) => tree,
            Err(error) => {
                IndexBuildState::Error.store(&self.build_state);
                *self.build_last_error.lock() = Some(error.to_string());
                log::warn!(
                    "fileset index build failed root={} error={}",
                    self.root.display(),
                    error
                );
                return Err(error);
            }
        };

        let walk_ms = build_started.elapsed().as_millis();
        let outcome = ingest_tree(&self.root, &tree);

        let mut snapshot = IndexData::new(tree, scope.clone());
        for record in outcome.records {
            snapshot.upsert(record, self.next_version());
        }
        let indexed_records = snapshot.len();
        *data = snapshot;
        drop(data);

        let report = outcome.report;
        self.build_progress.finish(&report, unix_now_secs());
        *self.build_issues.lock() = report.issues.clone();
        *self.build_last_error.lock() = None;
        IndexBuildState::Ready.store(&self.build_state);

        log::info!(
            "fileset index build root={} base_path={} recursive={} dirs={} sidecars={} records={} replaced={} issues={} walk_ms={} total_ms={}",
            self.root.display(),
            scope.base_path.join("/"),
            scope.recursive,
            report.directories,
            report.sidecars,
            indexed_records,
            report.replaced,
            report.issues.len(),
            walk_ms,
            build_started.elapsed().as_millis(),
        );

        Ok(report)
    }

    /// Returns every indexed record matching `request`.
    pub fn query(&self, request: &FilterRequest) -> Result<Selection> {
        let matcher = RecordMatcher::compile(request)?;
        let data = self.read_data()?;
        let records = data.select(|record| matcher.matches(record));
        log::debug!(
            "fileset query root={} user={} action={} matched={}",
            self.root.display(),
            request.user,
            request.action.as_str(),
            records.len()
        );
        Ok(Selection::new(records))
    }

    pub fn get(&self, key: &RecordKey) -> Result<Option<VersionedRecord>> {
        Ok(self.read_data()?.get(key))
    }

    pub fn record_count(&self) -> Result<usize> {
        Ok(self.read_data()?.len())
    }

    /// Directories of the current snapshot, in walk order.
    pub fn tree(&self) -> Result<Vec<PathBuf>> {
        Ok(self.read_data()?.tree().to_vec())
    }

    /// Names of the data files directly inside `base_path`.
    pub fn list_files(&self, base_path: &[String]) -> Result<Vec<String>> {
        list_data_files(&self.root, base_path)
    }

    pub fn build_state(&self) -> IndexBuildState {
        IndexBuildState::load(&self.build_state)
    }

    pub fn status(&self) -> Result<IndexStatus> {
        let (indexed_records, scope) = {
            let data = self.read_data()?;
            (data.len(), data.scope().clone())
        };
        let progress = self.build_progress.snapshot();

        Ok(IndexStatus {
            state: self.build_state().as_str().to_string(),
            root: self.root.to_string_lossy().to_string(),
            scope,
            indexed_records,
            scanned_dirs: progress.scanned_dirs,
            scanned_sidecars: progress.scanned_sidecars,
            started_at: progress.started_at,
            finished_at: progress.finished_at,
            errors: progress.errors,
            issues: self.build_issues.lock().clone(),
            last_error: self.build_last_error.lock().clone(),
        })
    }

    pub(super) fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(super) fn read_data(&self) -> Result<RwLockReadGuard<'_, IndexData>> {
        self.data
            .try_read_for(self.lock_timeout)
            .ok_or_else(|| lock_timeout_error("index read lock", self.lock_timeout))
    }

    pub(super) fn write_data(&self) -> Result<RwLockWriteGuard<'_, IndexData>> {
        self.data
            .try_write_for(self.lock_timeout)
            .ok_or_else(|| lock_timeout_error("index write lock", self.lock_timeout))
    }
}
