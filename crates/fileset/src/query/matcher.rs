//! Record matcher compiled from a filter request.

use crate::error::{FilesetError, Result};
use crate::record::FileRecord;
use crate::timestamp::TimeBound;

use super::evaluate::evaluate_predicate;
use super::expression::{Predicate, RecordTest};
use super::optimizer::optimize_predicate;
use super::request::{FilterRequest, Status, Visibility};

/// A compiled filter request.
#[derive(Debug, Clone)]
pub struct RecordMatcher {
    predicate: Predicate,
}

impl RecordMatcher {
    /// Compiles a filter request into a matcher.
    ///
    /// The compilation pipeline:
    /// 1. Validate the caller identity
    /// 2. Build the AND of one OR group per non-empty category, plus the
    ///    access test
    /// 3. Optimize the tree (flatten nested AND/OR, reorder by cost)
    pub fn compile(request: &FilterRequest) -> Result<Self> {
        request.validate_identity()?;

        let mut parts = Vec::new();

        if !request.filenames.is_empty() {
            parts.push(Predicate::any_of(
                request.filenames.iter().cloned(),
                RecordTest::FilenameEquals,
            ));
        }
        if let Some(pattern) = request.glob_pattern() {
            let pattern = glob::Pattern::new(pattern).map_err(|error| {
                FilesetError::InvalidInput(format!("invalid pattern {pattern:?}: {error}"))
            })?;
            parts.push(Predicate::Test(RecordTest::FilenameGlob(pattern)));
        }
        if !request.file_type.is_empty() {
            parts.push(Predicate::any_of(
                request.file_type.iter().cloned(),
                RecordTest::TypeEquals,
            ));
        }
        if !request.base_path.is_empty() {
            parts.push(Predicate::Test(RecordTest::PathPrefix(
                request.base_path.join("/"),
            )));
        }
        if !request.origin.is_empty() {
            parts.push(Predicate::any_of(
                request.origin.iter().cloned(),
                RecordTest::HasOrigin,
            ));
        }
        if !request.tags.is_empty() {
            parts.push(Predicate::any_of(
                request.tags.iter().cloned(),
                RecordTest::HasTag,
            ));
        }

        match request.created_after {
            TimeBound::NegInfinity => {}
            TimeBound::Infinity => parts.push(Predicate::never()),
            TimeBound::At(bound) => parts.push(Predicate::Test(RecordTest::CreatedAfter(bound))),
        }
        match request.created_before {
            TimeBound::Infinity => {}
            TimeBound::NegInfinity => parts.push(Predicate::never()),
            TimeBound::At(bound) => parts.push(Predicate::Test(RecordTest::CreatedBefore(bound))),
        }

        if !request.visibility.is_empty() {
            parts.push(Predicate::any_of(
                request.visibility.iter().copied(),
                |visibility| RecordTest::Hidden(visibility == Visibility::Hidden),
            ));
        }
        if !request.status.is_empty() {
            parts.push(Predicate::any_of(request.status.iter().copied(), |status| {
                RecordTest::Processed(status == Status::Processed)
            }));
        }

        parts.push(access_predicate(request));

        Ok(Self {
            predicate: optimize_predicate(Predicate::And(parts)),
        })
    }

    /// Returns the optimized predicate tree.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        evaluate_predicate(&self.predicate, record)
    }
}

/// Explicit user grant, any group grant, or ownership.
fn access_predicate(request: &FilterRequest) -> Predicate {
    let action = request.action;
    let mut alternatives = vec![
        Predicate::Test(RecordTest::Owner(request.user.clone())),
        Predicate::Test(RecordTest::UserGrant {
            action,
            user: request.user.clone(),
        }),
    ];
    alternatives.extend(
        request
            .groups
            .iter()
            .filter(|group| !group.is_empty())
            .map(|group| {
                Predicate::Test(RecordTest::GroupGrant {
                    action,
                    group: group.clone(),
                })
            }),
    );
    Predicate::Or(alternatives)
}
