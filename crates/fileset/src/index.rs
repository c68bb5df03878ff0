//! Record index module.
//!
//! One `FileSet` owns the in-memory index of a managed root:
//! - `build` - Build state and progress tracking
//! - `data` - Versioned record storage keyed by `RecordKey`
//! - `fileset` - Opening, rebuilding, querying and status
//! - `mutation` - Create and update, keeping sidecars and index in sync

mod build;
mod data;
mod fileset;
mod mutation;

// Re-export main types
pub use build::{unix_now_secs, IndexBuildProgress, IndexBuildState, ProgressSnapshot};
pub use fileset::FileSet;
