//! File metadata records, their natural key and the access-control test.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::file_type::file_type_for_name;
use crate::timestamp::SidecarTimestamp;

/// Permission class evaluated by the ACL test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    #[default]
    Change,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Change => "change",
        }
    }
}

/// Natural key of a record: its path segments plus filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub path: Vec<String>,
    pub filename: String,
}

impl RecordKey {
    pub fn new(path: Vec<String>, filename: impl Into<String>) -> Self {
        Self {
            path,
            filename: filename.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.path {
            write!(f, "{segment}/")?;
        }
        f.write_str(&self.filename)
    }
}

/// One managed file's metadata, as stored in its sidecar.
///
/// Every field is optional on the wire: a sidecar that omits a field loads
/// with that field's empty default. `removed` defaults to the far-future
/// sentinel, `created` to the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub file_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub path: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub origin: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "created_or_epoch")]
    pub created: SidecarTimestamp,
    #[serde(deserialize_with = "removed_or_sentinel")]
    pub removed: SidecarTimestamp,
    #[serde(deserialize_with = "null_as_default")]
    pub hidden: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub processed: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub owner: String,
    #[serde(deserialize_with = "null_as_default")]
    pub changed_by: String,
    #[serde(deserialize_with = "null_as_default")]
    pub read_user: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub read_group: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub change_user: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub change_group: Vec<String>,
}

impl Default for FileRecord {
    fn default() -> Self {
        Self {
            filename: String::new(),
            file_type: String::new(),
            path: Vec::new(),
            origin: Vec::new(),
            tags: Vec::new(),
            created: SidecarTimestamp::epoch(),
            removed: SidecarTimestamp::removed_sentinel(),
            hidden: false,
            processed: false,
            owner: String::new(),
            changed_by: String::new(),
            read_user: Vec::new(),
            read_group: Vec::new(),
            change_user: Vec::new(),
            change_group: Vec::new(),
        }
    }
}

impl FileRecord {
    pub fn new(path: Vec<String>, filename: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            path,
            owner: owner.into(),
            ..Self::default()
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.path.clone(), self.filename.clone())
    }

    /// Path segments joined with `/`, as compared by the base path filter.
    pub fn joined_path(&self) -> String {
        self.path.join("/")
    }

    pub fn is_removed(&self) -> bool {
        self.removed < SidecarTimestamp::removed_sentinel()
    }

    /// Returns the (user, group) grant lists for the given action.
    pub fn grants(&self, action: Action) -> (&[String], &[String]) {
        match action {
            Action::Read => (&self.read_user, &self.read_group),
            Action::Change => (&self.change_user, &self.change_group),
        }
    }

    /// Access test: explicit user grant, any group grant, or ownership.
    ///
    /// Empty grant lists deny; ownership applies to every action.
    pub fn acl_allows(&self, action: Action, user: &str, groups: &[String]) -> bool {
        if self.owner == user {
            return true;
        }
        let (users, granted_groups) = self.grants(action);
        users.iter().any(|candidate| candidate == user)
            || groups.iter().any(|group| granted_groups.contains(group))
    }

    /// Fills `type` from the filename when the record does not carry one.
    pub fn derive_type(&mut self) {
        if self.file_type.is_empty() {
            self.file_type = file_type_for_name(&self.filename);
        }
    }

    /// `type` as stored, or the one derived from the filename when the
    /// stored value is empty.
    pub fn effective_type(&self) -> Cow<'_, str> {
        if self.file_type.is_empty() {
            Cow::Owned(file_type_for_name(&self.filename))
        } else {
            Cow::Borrowed(&self.file_type)
        }
    }

    /// Removes duplicate values from the set-valued fields, keeping the
    /// first occurrence of each.
    pub fn normalize_sets(&mut self) {
        for values in [
            &mut self.origin,
            &mut self.tags,
            &mut self.read_user,
            &mut self.read_group,
            &mut self.change_user,
            &mut self.change_group,
        ] {
            dedup_in_order(values);
        }
    }
}

fn dedup_in_order(values: &mut Vec<String>) {
    let mut seen = fnv::FnvHashSet::default();
    values.retain(|value| seen.insert(value.clone()));
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn created_or_epoch<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<SidecarTimestamp, D::Error> {
    Ok(Option::<SidecarTimestamp>::deserialize(deserializer)?.unwrap_or_else(SidecarTimestamp::epoch))
}

fn removed_or_sentinel<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<SidecarTimestamp, D::Error> {
    Ok(Option::<SidecarTimestamp>::deserialize(deserializer)?
        .unwrap_or_else(SidecarTimestamp::removed_sentinel))
}

/// Partial update payload. Only fields that are present are merged.
///
/// `filename` and `path` form the natural key and cannot be changed;
/// `changed_by` is always set from the acting user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordChanges {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<SidecarTimestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<SidecarTimestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_user: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_group: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_user: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_group: Option<Vec<String>>,
}

impl RecordChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges the present fields into `record`. Replaced set fields are
    /// deduplicated; fields left out stay exactly as they were.
    pub fn apply_to(&self, record: &mut FileRecord) {
        fn merge<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        fn merge_set(target: &mut Vec<String>, value: &Option<Vec<String>>) {
            if let Some(values) = value {
                *target = values.clone();
                dedup_in_order(target);
            }
        }

        merge(&mut record.file_type, &self.file_type);
        merge_set(&mut record.origin, &self.origin);
        merge_set(&mut record.tags, &self.tags);
        merge(&mut record.created, &self.created);
        merge(&mut record.removed, &self.removed);
        merge(&mut record.hidden, &self.hidden);
        merge(&mut record.processed, &self.processed);
        merge(&mut record.owner, &self.owner);
        merge_set(&mut record.read_user, &self.read_user);
        merge_set(&mut record.read_group, &self.read_group);
        merge_set(&mut record.change_user, &self.change_user);
        merge_set(&mut record.change_group, &self.change_group);
    }
}
