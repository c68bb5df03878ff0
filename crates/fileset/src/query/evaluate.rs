//! Predicate evaluation against records.

use crate::record::FileRecord;

use super::expression::{Predicate, RecordTest};

pub fn evaluate_predicate(predicate: &Predicate, record: &FileRecord) -> bool {
    match predicate {
        Predicate::Test(test) => evaluate_record_test(test, record),
        Predicate::And(parts) => parts.iter().all(|part| evaluate_predicate(part, record)),
        Predicate::Or(parts) => parts.iter().any(|part| evaluate_predicate(part, record)),
    }
}

fn evaluate_record_test(test: &RecordTest, record: &FileRecord) -> bool {
    match test {
        RecordTest::FilenameEquals(name) => record.filename == *name,
        RecordTest::FilenameGlob(pattern) => pattern.matches(&record.filename),
        RecordTest::TypeEquals(file_type) => record.effective_type() == file_type.as_str(),
        RecordTest::PathPrefix(prefix) => record.joined_path().starts_with(prefix.as_str()),
        RecordTest::HasOrigin(origin) => record.origin.contains(origin),
        RecordTest::HasTag(tag) => record.tags.contains(tag),
        RecordTest::CreatedAfter(bound) => record.created > *bound,
        RecordTest::CreatedBefore(bound) => record.created < *bound,
        RecordTest::Hidden(hidden) => record.hidden == *hidden,
        RecordTest::Processed(processed) => record.processed == *processed,
        RecordTest::UserGrant { action, user } => record.grants(*action).0.contains(user),
        RecordTest::GroupGrant { action, group } => record.grants(*action).1.contains(group),
        RecordTest::Owner(user) => record.owner == *user,
    }
}
