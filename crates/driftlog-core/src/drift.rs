//! Drift detection between the change log and the declared change-sets.
//!
//! The log and the declarations are walked in lockstep. Each log entry must
//! be matched by the declared change-set at the cursor, compared by content
//! fingerprint. Two relaxations exist, both limited to tagged change-sets:
//!
//! - a tagged change-set that does not match the entry at the cursor is
//!   treated as skipped by an earlier run's tag filter and deferred;
//! - a later entry that matches a deferred change-set records its late
//!   application.
//!
//! Untagged change-sets can never be deferred, so editing, reordering or
//! removing one is always reported.
//!
//! One consequence of deferral: a tagged change-set that was applied late
//! may be declared ahead of untagged change-sets logged before it, so a log
//! of `[A, B, T]` verifies against declarations `[A, T, B]`. Moving an
//! already-applied tagged change-set earlier is therefore not reported.

use crate::changelog::ChangeLogEntry;
use crate::definition::ChangeSetDefinition;
use crate::error::MigrateError;
use tracing::debug;

/// Declared change-sets that have no log entry yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSet {
    /// Declaration indices, ascending.
    pub positions: Vec<usize>,
    /// Number of log entries matched to declarations.
    pub verified: usize,
}

impl PendingSet {
    /// Number of pending change-sets.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Verify `applied` against `declared` and return what is still pending.
///
/// `applied` must be sorted by revision. Revisions must be gapless from 0.
pub fn validate(
    declared: &[ChangeSetDefinition],
    applied: &[ChangeLogEntry],
) -> Result<PendingSet, MigrateError> {
    let mut cursor = 0usize;
    let mut deferred: Vec<usize> = Vec::new();

    for (expected_revision, entry) in applied.iter().enumerate() {
        if entry.revision != expected_revision as u64 {
            return Err(MigrateError::LogCorrupted {
                message: format!(
                    "expected revision {expected_revision}, found {}",
                    entry.revision
                ),
            });
        }

        if let Some(slot) = deferred
            .iter()
            .position(|&idx| entry.hash.matches(&declared[idx].statements))
        {
            let position = deferred.remove(slot);
            debug!(revision = entry.revision, position, "late application of skipped change-set");
            continue;
        }

        let mut first_skipped = None;
        loop {
            let Some(candidate) = declared.get(cursor) else {
                // A tagged candidate we skipped is the most likely edit.
                return Err(match first_skipped {
                    Some(position) => MigrateError::Altered {
                        revision: entry.revision,
                        position,
                        version: entry.version.clone(),
                        declared_version: declared[position].version.clone(),
                    },
                    None => MigrateError::Removed {
                        revision: entry.revision,
                        version: entry.version.clone(),
                    },
                });
            };
            let position = cursor;
            cursor += 1;

            if entry.hash.matches(&candidate.statements) {
                break;
            }
            if !candidate.is_tagged() {
                // An edited tagged change-set shifts the walk by one entry.
                // Blame it when this candidate lines up with the next entry.
                let lines_up = applied
                    .get(expected_revision + 1)
                    .is_some_and(|next| next.hash.matches(&candidate.statements));
                let blamed = match first_skipped {
                    Some(skipped) if lines_up => skipped,
                    _ => position,
                };
                return Err(MigrateError::Altered {
                    revision: entry.revision,
                    position: blamed,
                    version: entry.version.clone(),
                    declared_version: declared[blamed].version.clone(),
                });
            }
            debug!(position, version = %candidate.version, "deferring tagged change-set");
            first_skipped.get_or_insert(position);
            deferred.push(position);
        }
    }

    let mut positions = deferred;
    positions.extend(cursor..declared.len());

    Ok(PendingSet {
        positions,
        verified: applied.len(),
    })
}
