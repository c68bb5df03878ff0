//! Sidecar metadata files.
//!
//! A payload `report.csv` is described by the hidden file `.report.csv.json`
//! in the same directory. The sidecar holds a JSON array of records; the
//! writer always emits a one-element array.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{persistence_error, sidecar_error, FilesetError, Result};
use crate::record::{FileRecord, RecordKey};
use crate::walker::{resolve_segments, validate_segment};

const SIDECAR_PREFIX: char = '.';
const SIDECAR_SUFFIX: &str = ".json";

/// Sidecar file name for a payload file name.
pub fn sidecar_name(filename: &str) -> String {
    format!("{SIDECAR_PREFIX}{filename}{SIDECAR_SUFFIX}")
}

/// Payload file name for a sidecar file name, if it follows the convention.
pub fn payload_name(name: &str) -> Option<&str> {
    name.strip_prefix(SIDECAR_PREFIX)?
        .strip_suffix(SIDECAR_SUFFIX)
        .filter(|payload| !payload.is_empty())
}

pub fn is_sidecar_name(name: &str) -> bool {
    payload_name(name).is_some()
}

/// Location of the sidecar for a record key under the managed root.
pub fn sidecar_path(root: &Path, key: &RecordKey) -> Result<PathBuf> {
    validate_segment(&key.filename)?;
    let dir = resolve_segments(root, &key.path)?;
    Ok(dir.join(sidecar_name(&key.filename)))
}

/// Reads every record held by a sidecar file.
pub fn read_sidecar(path: &Path) -> Result<Vec<FileRecord>> {
    let bytes = fs::read(path).map_err(|error| sidecar_error(path, error))?;
    serde_json::from_slice::<Vec<FileRecord>>(&bytes).map_err(|error| sidecar_error(path, error))
}

/// Writes a record as a one-element sidecar array.
///
/// The file is written to a temporary sibling and renamed into place so
/// readers never observe a partial sidecar.
pub fn write_sidecar(path: &Path, record: &FileRecord) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        FilesetError::InvalidInput(format!("sidecar has no parent: {}", path.display()))
    })?;
    fs::create_dir_all(parent).map_err(|error| persistence_error(path, error))?;

    let payload = serde_json::to_vec_pretty(std::slice::from_ref(record))
        .map_err(|error| FilesetError::Serialization(error.to_string()))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|error| persistence_error(path, error))?;
    temp.write_all(&payload)
        .map_err(|error| persistence_error(path, error))?;
    temp.as_file()
        .sync_all()
        .map_err(|error| persistence_error(path, error))?;
    temp.persist(path)
        .map_err(|error| persistence_error(path, error.error))?;
    Ok(())
}
