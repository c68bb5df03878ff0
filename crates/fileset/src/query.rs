//! Filter requests, their compilation into predicate trees, and matching.
//!
//! This module provides:
//! - The `FilterRequest` payload (filename, type, path, origin, tag, date,
//!   visibility, status and access constraints)
//! - Predicate tree types (AND, OR, record tests)
//! - Optimization (flattening, reordering by cost)
//! - Matching against `FileRecord`

mod evaluate;
mod expression;
mod matcher;
mod optimizer;
mod request;

pub use evaluate::evaluate_predicate;
pub use expression::{Predicate, RecordTest};
pub use matcher::RecordMatcher;
pub use request::{FilterRequest, Status, Visibility};
