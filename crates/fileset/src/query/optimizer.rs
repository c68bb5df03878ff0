//! Predicate optimization.
//!
//! Applies deterministic rewrites that make per-record evaluation cheaper:
//! - Flattens nested AND/OR groups
//! - Removes single-item AND/OR wrappers
//! - Reorders AND operands by cost (flag tests first, glob tests last)

use super::expression::{Predicate, RecordTest};

/// Optimizes a predicate tree. A new tree is returned.
pub fn optimize_predicate(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::And(parts) => optimize_and(parts),
        Predicate::Or(parts) => optimize_or(parts),
        Predicate::Test(_) => predicate,
    }
}

fn optimize_and(parts: Vec<Predicate>) -> Predicate {
    let mut flattened = Vec::new();

    for part in parts.into_iter().map(optimize_predicate) {
        match part {
            Predicate::And(nested) => flattened.extend(nested),
            other => flattened.push(other),
        }
    }

    if flattened.len() == 1 {
        if let Some(single) = flattened.pop() {
            return single;
        }
    }
    reorder_by_cost(&mut flattened);
    Predicate::And(flattened)
}

fn optimize_or(parts: Vec<Predicate>) -> Predicate {
    let mut flattened = Vec::new();

    for part in parts.into_iter().map(optimize_predicate) {
        match part {
            Predicate::Or(nested) => flattened.extend(nested),
            other => flattened.push(other),
        }
    }

    if flattened.len() == 1 {
        if let Some(single) = flattened.pop() {
            return single;
        }
    }
    Predicate::Or(flattened)
}

/// Evaluation cost of a predicate (lower runs first):
/// - 0: flag tests (`hidden`, `processed`)
/// - 1: scalar equality and timestamp comparisons
/// - 2: path prefix
/// - 3: set membership (origin, tags, grants)
/// - 4: glob matching
///
/// A group costs as much as its most expensive member.
fn cost(predicate: &Predicate) -> u8 {
    match predicate {
        Predicate::Test(test) => match test {
            RecordTest::Hidden(_) | RecordTest::Processed(_) => 0,
            RecordTest::FilenameEquals(_)
            | RecordTest::TypeEquals(_)
            | RecordTest::Owner(_)
            | RecordTest::CreatedAfter(_)
            | RecordTest::CreatedBefore(_) => 1,
            RecordTest::PathPrefix(_) => 2,
            RecordTest::HasOrigin(_)
            | RecordTest::HasTag(_)
            | RecordTest::UserGrant { .. }
            | RecordTest::GroupGrant { .. } => 3,
            RecordTest::FilenameGlob(_) => 4,
        },
        Predicate::And(parts) | Predicate::Or(parts) => parts.iter().map(cost).max().unwrap_or(0),
    }
}

fn reorder_by_cost(parts: &mut Vec<Predicate>) {
    if parts.len() <= 1 {
        return;
    }

    let mut keyed: Vec<_> = parts.drain(..).map(|part| (cost(&part), part)).collect();
    keyed.sort_by_key(|(cost, _)| *cost);
    parts.extend(keyed.into_iter().map(|(_, part)| part));
}
