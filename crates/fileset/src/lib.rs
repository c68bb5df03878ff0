//! Sidecar metadata indexing and access-controlled file queries.
//!
//! This crate provides the core of the census file service:
//! - Directory tree walking for a managed root
//! - Sidecar (`.<file>.json`) ingestion with schema-flexible records
//! - An in-memory record index with a composable filter predicate tree
//! - Create/update mutations that keep sidecars and the index in sync
//! - A registry of open filesets with scoped leases and idle eviction

pub mod config;
pub mod error;
pub mod file_type;
pub mod index;
pub mod ingest;
pub mod locks;
pub mod query;
pub mod record;
pub mod registry;
pub mod sidecar;
pub mod timestamp;
pub mod types;
pub mod walker;

// Re-export main types
pub use config::FilesetConfig;
pub use error::{FilesetError, Result};
pub use index::{FileSet, IndexBuildState};
pub use ingest::{IngestIssue, IngestReport};
pub use query::{FilterRequest, RecordMatcher, Status, Visibility};
pub use record::{Action, FileRecord, RecordChanges, RecordKey};
pub use registry::{FileSetLease, FileSetRegistry};
pub use timestamp::{SidecarTimestamp, TimeBound};
pub use types::{IndexStatus, Selection, UpdateFailure, UpdateReport, VersionedRecord};
pub use walker::TreeScope;
