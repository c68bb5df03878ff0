//! Metadata ingestion: turns the sidecars of a directory tree into records.

use std::fs;
use std::path::{Path, PathBuf};

use fnv::FnvHashMap;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::record::{FileRecord, RecordKey};
use crate::sidecar::{payload_name, read_sidecar};
use crate::walker::relative_segments;

/// A directory or sidecar that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestIssue {
    pub path: PathBuf,
    pub message: String,
}

impl IngestIssue {
    fn new(path: &Path, message: impl ToString) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Counters for one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub directories: usize,
    pub sidecars: usize,
    pub records: usize,
    pub replaced: usize,
    pub issues: Vec<IngestIssue>,
}

#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub records: Vec<FileRecord>,
    pub report: IngestReport,
}

struct DirectoryLoad {
    sidecars: usize,
    records: Vec<FileRecord>,
    issues: Vec<IngestIssue>,
}

/// Loads every sidecar found directly inside the directories of `tree`.
///
/// Directories are read in parallel; their results are applied in tree
/// order and, within a directory, in sidecar-name order. A later record with
/// an already-seen key replaces the earlier one.
pub fn ingest_tree(root: &Path, tree: &[PathBuf]) -> IngestOutcome {
    let loads: Vec<DirectoryLoad> = tree
        .par_iter()
        .map(|dir| load_directory(root, dir))
        .collect();

    let mut records: Vec<FileRecord> = Vec::new();
    let mut positions: FnvHashMap<RecordKey, usize> = FnvHashMap::default();
    let mut report = IngestReport {
        directories: tree.len(),
        ..IngestReport::default()
    };

    for load in loads {
        report.sidecars += load.sidecars;
        for issue in &load.issues {
            log::warn!(
                "skipping sidecar path={} error={}",
                issue.path.display(),
                issue.message
            );
        }
        report.issues.extend(load.issues);

        for record in load.records {
            let key = record.key();
            match positions.get(&key) {
                Some(&position) => {
                    log::debug!("replacing duplicate record key={key}");
                    records[position] = record;
                    report.replaced += 1;
                }
                None => {
                    positions.insert(key, records.len());
                    records.push(record);
                }
            }
        }
    }

    report.records = records.len();
    IngestOutcome { records, report }
}

fn load_directory(root: &Path, dir: &Path) -> DirectoryLoad {
    let mut load = DirectoryLoad {
        sidecars: 0,
        records: Vec::new(),
        issues: Vec::new(),
    };

    let sidecars = match sidecar_files(dir) {
        Ok(sidecars) => sidecars,
        Err(error) => {
            load.issues.push(IngestIssue::new(dir, error));
            return load;
        }
    };

    let segments = relative_segments(root, dir);
    for (name, path) in sidecars {
        load.sidecars += 1;
        let loaded = match read_sidecar(&path) {
            Ok(loaded) => loaded,
            Err(error) => {
                load.issues.push(IngestIssue::new(&path, error));
                continue;
            }
        };
        for mut record in loaded {
            if record.filename.is_empty() {
                if let Some(payload) = payload_name(&name) {
                    record.filename = payload.to_string();
                }
            }
            if record.path.is_empty() {
                record.path = segments.clone();
            }
            load.records.push(record);
        }
    }
    load
}

fn sidecar_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut sidecars = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if payload_name(&name).is_some() {
            sidecars.push((name, entry.path()));
        }
    }
    sidecars.sort_by(|left, right| left.0.cmp(&right.0));
    Ok(sidecars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::{walk_tree, TreeScope};
    use tempfile::TempDir;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn ingest(root: &Path) -> IngestOutcome {
        let tree = walk_tree(root, &TreeScope::default()).unwrap();
        ingest_tree(root, &tree)
    }

    #[test]
    fn loads_records_with_defaults() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a")).unwrap();
        fs::write(
            temp.path().join("a/.x.csv.json"),
            r#"[{"filename": "x.csv", "path": ["a"], "owner": "ann"}]"#,
        )
        .unwrap();

        let outcome = ingest(temp.path());
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.file_type, "");
        assert_eq!(record.effective_type(), "spreadsheet");
        assert!(!record.is_removed());
        assert_eq!(outcome.report.sidecars, 1);
        assert_eq!(outcome.report.directories, 2);
    }

    #[test]
    fn fills_missing_filename_and_path() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a/b")).unwrap();
        fs::write(temp.path().join("a/b/.y.txt.json"), r#"[{"owner": "ann"}]"#).unwrap();

        let outcome = ingest(temp.path());
        let record = &outcome.records[0];
        assert_eq!(record.filename, "y.txt");
        assert_eq!(record.path, strings(&["a", "b"]));
    }

    #[test]
    fn malformed_sidecar_is_reported_and_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".bad.csv.json"), "{not json").unwrap();
        fs::write(
            temp.path().join(".good.csv.json"),
            r#"[{"filename": "good.csv"}]"#,
        )
        .unwrap();

        let outcome = ingest(temp.path());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].filename, "good.csv");
        assert_eq!(outcome.report.issues.len(), 1);
        assert!(outcome.report.issues[0].path.ends_with(".bad.csv.json"));
    }

    #[test]
    fn duplicate_keys_keep_last() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(".x.csv.json"),
            r#"[{"filename": "x.csv", "tags": ["old"]}, {"filename": "x.csv", "tags": ["new"]}]"#,
        )
        .unwrap();

        let outcome = ingest(temp.path());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].tags, strings(&["new"]));
        assert_eq!(outcome.report.replaced, 1);
    }

    #[test]
    fn ignores_payloads_and_plain_hidden_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("x.csv"), "a,b\n").unwrap();
        fs::write(temp.path().join(".profile"), "").unwrap();

        let outcome = ingest(temp.path());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.report.sidecars, 0);
        assert!(outcome.report.issues.is_empty());
    }
}
