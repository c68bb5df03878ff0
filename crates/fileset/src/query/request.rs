//! Filter request payload.

use serde::{Deserialize, Serialize};

use crate::error::{FilesetError, Result};
use crate::record::{null_as_default, Action};
use crate::timestamp::TimeBound;
use crate::walker::TreeScope;

use super::matcher::RecordMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Hidden,
    Unhidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Processed,
    Unprocessed,
}

/// Selection criteria for a query or an update.
///
/// Every list is an OR over its values and an empty list places no
/// restriction. Categories combine with AND. The access test for
/// `action` on behalf of `user` and `groups` always applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub filenames: Vec<String>,
    /// Shell glob matched against the filename.
    pub pattern: Option<String>,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub file_type: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub base_path: Vec<String>,
    pub recursive: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub origin: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub created_after: TimeBound,
    pub created_before: TimeBound,
    #[serde(deserialize_with = "null_as_default")]
    pub visibility: Vec<Visibility>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: Vec<Status>,
    pub action: Action,
    #[serde(deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(deserialize_with = "null_as_default")]
    pub groups: Vec<String>,
}

impl Default for FilterRequest {
    fn default() -> Self {
        Self {
            filenames: Vec::new(),
            pattern: None,
            file_type: Vec::new(),
            base_path: Vec::new(),
            recursive: true,
            origin: Vec::new(),
            tags: Vec::new(),
            created_after: TimeBound::NegInfinity,
            created_before: TimeBound::Infinity,
            visibility: Vec::new(),
            status: Vec::new(),
            action: Action::default(),
            user: String::new(),
            groups: Vec::new(),
        }
    }
}

impl FilterRequest {
    pub fn new(user: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            user: user.into(),
            groups,
            ..Self::default()
        }
    }

    /// Both the user and at least one group must be supplied.
    pub fn validate_identity(&self) -> Result<()> {
        if self.user.trim().is_empty() {
            return Err(FilesetError::Config("user is required".to_string()));
        }
        if self.groups.iter().all(|group| group.trim().is_empty()) {
            return Err(FilesetError::Config("groups are required".to_string()));
        }
        Ok(())
    }

    /// The glob pattern, treating an empty string as absent.
    pub fn glob_pattern(&self) -> Option<&str> {
        self.pattern.as_deref().filter(|pattern| !pattern.is_empty())
    }

    /// Tree scope covering the request's base path.
    pub fn scope(&self) -> TreeScope {
        TreeScope::new(self.base_path.clone(), self.recursive)
    }

    pub fn compile(&self) -> Result<RecordMatcher> {
        RecordMatcher::compile(self)
    }
}
