//! Migration engine - applies pending change-sets and extends the log.
//!
//! A run is strictly sequential:
//!
//! ```text
//! load log → validate drift → for each pending change-set:
//!     tag filter → execute statements → fingerprint → append entry
//! ```
//!
//! Nothing executes if drift validation fails. An entry is appended only
//! after every statement of its change-set succeeded, so a failed or
//! cancelled run leaves a log that matches what was actually applied.

use crate::bucket::BucketAllocator;
use crate::changelog::{ChangeLogEntry, ChangeLogStore};
use crate::config::MigrationConfig;
use crate::database::Database;
use crate::definition::ChangeSetDefinition;
use crate::drift;
use crate::error::MigrateError;
use crate::loader::{Loader, ScriptSource, Variables};
use crate::tags;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A change-set applied during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChangeSet {
    /// Declaration index.
    pub position: usize,
    /// Revision assigned to it.
    pub revision: u64,
    /// Bucket it was logged in.
    pub bucket: u64,
    /// Declared version.
    pub version: String,
}

/// A pending change-set left out by the tag filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChangeSet {
    /// Declaration index.
    pub position: usize,
    /// Declared version.
    pub version: String,
    /// Tags that did not match the request.
    pub tags: BTreeSet<String>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Log entries verified against the declarations.
    pub verified: usize,
    /// Change-sets applied, in order.
    pub applied: Vec<AppliedChangeSet>,
    /// Pending change-sets not eligible for this run.
    pub skipped: Vec<SkippedChangeSet>,
}

impl RunReport {
    /// Number of change-sets applied.
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// Check if the run changed nothing.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// What a run would do, without doing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    /// Log entries verified against the declarations.
    pub verified: usize,
    /// Next revision that would be assigned.
    pub next_revision: u64,
    /// Declaration indices that would be applied, in order.
    pub to_apply: Vec<usize>,
    /// Declaration indices the tag filter would skip.
    pub to_skip: Vec<usize>,
}

/// Orchestrates drift detection, tag filtering, execution and logging.
pub struct MigrationEngine {
    database: Arc<dyn Database>,
    store: Arc<dyn ChangeLogStore>,
    loader: Option<Arc<dyn Loader>>,
    allocator: BucketAllocator,
    config: MigrationConfig,
    cancelled: Arc<AtomicBool>,
}

impl MigrationEngine {
    /// Create a new engine.
    pub fn new(
        database: Arc<dyn Database>,
        store: Arc<dyn ChangeLogStore>,
        config: MigrationConfig,
    ) -> Result<Self, MigrateError> {
        config.validate()?;
        let allocator = BucketAllocator::new(config.bucket_size)?;

        Ok(Self {
            database,
            store,
            loader: None,
            allocator,
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Set the loader used by the `execute*` entry points.
    pub fn with_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Share a cancellation flag. Setting it stops the run before the next
    /// change-set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Handle to this engine's cancellation flag.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// The run configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Load `source` and apply untagged pending change-sets.
    pub fn execute(&self, source: &ScriptSource) -> Result<RunReport, MigrateError> {
        self.execute_with_variables(source, &BTreeSet::new(), &Variables::new())
    }

    /// Load `source` and apply pending change-sets eligible for `tags`.
    pub fn execute_with_tags(
        &self,
        source: &ScriptSource,
        tags: &BTreeSet<String>,
    ) -> Result<RunReport, MigrateError> {
        self.execute_with_variables(source, tags, &Variables::new())
    }

    /// Load `source` with `variables` and apply pending change-sets eligible
    /// for `tags`.
    pub fn execute_with_variables(
        &self,
        source: &ScriptSource,
        tags: &BTreeSet<String>,
        variables: &Variables,
    ) -> Result<RunReport, MigrateError> {
        let declared = self.load(source, variables)?;
        info!(
            script = %source.name(),
            change_sets = declared.len(),
            "loaded migration script"
        );
        self.run(&declared, tags)
    }

    /// Load `source` through the configured loader.
    pub fn load(
        &self,
        source: &ScriptSource,
        variables: &Variables,
    ) -> Result<Vec<ChangeSetDefinition>, MigrateError> {
        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| MigrateError::load(source.name(), "no script loader configured"))?;
        loader.load(source, variables)
    }

    /// Verify the log against `declared` without executing anything.
    pub fn verify(&self, declared: &[ChangeSetDefinition]) -> Result<usize, MigrateError> {
        let applied = self.store.load_all()?;
        let pending = drift::validate(declared, &applied)?;
        Ok(pending.verified)
    }

    /// Compute what [`run`](Self::run) would apply and skip.
    pub fn plan(
        &self,
        declared: &[ChangeSetDefinition],
        requested_tags: &BTreeSet<String>,
    ) -> Result<RunPlan, MigrateError> {
        let applied = self.store.load_all()?;
        let pending = drift::validate(declared, &applied)?;

        let (to_apply, to_skip): (Vec<usize>, Vec<usize>) = pending
            .positions
            .iter()
            .copied()
            .partition(|&position| tags::eligible(&declared[position].tags, requested_tags));

        Ok(RunPlan {
            verified: pending.verified,
            next_revision: next_revision(&applied),
            to_apply,
            to_skip,
        })
    }

    /// Apply every pending change-set in `declared` eligible for
    /// `requested_tags`.
    pub fn run(
        &self,
        declared: &[ChangeSetDefinition],
        requested_tags: &BTreeSet<String>,
    ) -> Result<RunReport, MigrateError> {
        let applied = self.store.load_all()?;
        let pending = drift::validate(declared, &applied)?;

        info!(
            declared = declared.len(),
            verified = pending.verified,
            pending = pending.len(),
            "starting migration run"
        );

        let mut revision = next_revision(&applied);
        let mut report = RunReport {
            verified: pending.verified,
            ..Default::default()
        };

        for &position in &pending.positions {
            let change = &declared[position];

            if !tags::eligible(&change.tags, requested_tags) {
                debug!(
                    position,
                    version = %change.version,
                    tags = ?change.tags,
                    "skipping change-set not selected by tags"
                );
                report.skipped.push(SkippedChangeSet {
                    position,
                    version: change.version.clone(),
                    tags: change.tags.clone(),
                });
                continue;
            }

            if self.cancelled.load(Ordering::SeqCst) {
                warn!(
                    applied = report.applied.len(),
                    "migration run cancelled"
                );
                return Err(MigrateError::Cancelled {
                    applied: report.applied.len(),
                });
            }

            self.apply(position, change)?;

            let bucket = self.allocator.bucket_of(revision);
            let hash = change.fingerprint(self.config.hash_algorithm);
            let entry = ChangeLogEntry::for_change_set(revision, bucket, change, hash);
            self.store.append(&entry)?;

            info!(
                position,
                revision,
                bucket,
                version = %change.version,
                "applied change-set"
            );
            report.applied.push(AppliedChangeSet {
                position,
                revision,
                bucket,
                version: change.version.clone(),
            });
            revision += 1;
        }

        info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "migration run complete"
        );
        Ok(report)
    }

    /// Execute every statement of one change-set, in order.
    fn apply(&self, position: usize, change: &ChangeSetDefinition) -> Result<(), MigrateError> {
        for (statement_index, statement) in change.statements.iter().enumerate() {
            debug!(position, statement_index, "executing statement");
            self.database
                .execute(statement)
                .map_err(|source| MigrateError::Execution {
                    position,
                    version: change.version.clone(),
                    statement_index,
                    source,
                })?;
        }
        Ok(())
    }
}

fn next_revision(applied: &[ChangeLogEntry]) -> u64 {
    applied.last().map_or(0, |entry| entry.revision + 1)
}
