//! driftlog core - change-set engine for transaction-free stores.
//!
//! Applies an ordered list of declared change-sets exactly once, records each
//! application in a durable, bucketed change log, and refuses to run when a
//! change-set that was already applied has since been edited, reordered or
//! removed.
//!
//! # Example
//!
//! ```ignore
//! use driftlog_core::{MigrationConfig, MigrationEngine, SledChangeLog};
//!
//! let db = sled::open("./driftlog_data")?;
//! let store = Arc::new(SledChangeLog::open(&db, 100)?);
//! let engine = MigrationEngine::new(database, store, MigrationConfig::default())?
//!     .with_loader(loader);
//!
//! let report = engine.execute(&ScriptSource::File("migrations/main.json".into()))?;
//! println!("applied {} change-set(s)", report.applied_count());
//! ```

pub mod bucket;
pub mod changelog;
pub mod config;
pub mod database;
pub mod definition;
pub mod drift;
pub mod engine;
pub mod error;
pub mod hash;
pub mod loader;
pub mod tags;

pub use bucket::{BucketAllocator, DEFAULT_BUCKET_SIZE};
pub use changelog::{ChangeLogEntry, ChangeLogStore, LogKey, MemoryChangeLog, SledChangeLog};
pub use config::{ChangeLogConfig, MigrationConfig};
pub use database::{Database, DatabaseError, RecordingDatabase};
pub use definition::ChangeSetDefinition;
pub use drift::PendingSet;
pub use engine::{AppliedChangeSet, MigrationEngine, RunPlan, RunReport, SkippedChangeSet};
pub use error::MigrateError;
pub use hash::{fingerprint, Fingerprint, HashAlgorithm};
pub use loader::{Loader, ScriptSource, StaticLoader, Variables};
