//! Predicate tree types.

use crate::record::Action;
use crate::timestamp::SidecarTimestamp;

/// A compiled filter (tree node).
///
/// An empty `And` is true and an empty `Or` is false.
#[derive(Debug, Clone)]
pub enum Predicate {
    Test(RecordTest),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn always() -> Self {
        Self::And(Vec::new())
    }

    pub fn never() -> Self {
        Self::Or(Vec::new())
    }

    /// OR of one test per value.
    pub fn any_of<T>(values: impl IntoIterator<Item = T>, test: impl Fn(T) -> RecordTest) -> Self {
        Self::Or(values.into_iter().map(|value| Self::Test(test(value))).collect())
    }
}

/// A single test against one record field (leaf node).
#[derive(Debug, Clone)]
pub enum RecordTest {
    FilenameEquals(String),
    FilenameGlob(glob::Pattern),
    TypeEquals(String),
    /// Joined `path` starts with the given string.
    PathPrefix(String),
    HasOrigin(String),
    HasTag(String),
    /// `created` strictly after the bound.
    CreatedAfter(SidecarTimestamp),
    /// `created` strictly before the bound.
    CreatedBefore(SidecarTimestamp),
    Hidden(bool),
    Processed(bool),
    UserGrant { action: Action, user: String },
    GroupGrant { action: Action, group: String },
    Owner(String),
}
