//! Subcommand implementations.

use crate::config::{CliConfig, ScriptArgs};
use crate::writer::ScriptWriter;
use comfy_table::{Cell, Table};
use driftlog_core::{
    ChangeLogEntry, ChangeLogStore, Database, MigrateError, MigrationEngine, RecordingDatabase,
    ScriptSource, SledChangeLog,
};
use driftlog_script::JsonScriptLoader;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Open change log plus the database handle that keeps it alive.
struct OpenLog {
    _db: sled::Db,
    store: Arc<SledChangeLog>,
}

fn open_log(config: &CliConfig) -> Result<OpenLog, MigrateError> {
    let db = config.change_log.open_db()?;
    let store = SledChangeLog::open(&db, config.migration.bucket_size)?
        .flush_on_append(config.change_log.flush_on_append);
    Ok(OpenLog {
        _db: db,
        store: Arc::new(store),
    })
}

fn engine(
    config: &CliConfig,
    log: &OpenLog,
    database: Arc<dyn Database>,
) -> Result<MigrationEngine, MigrateError> {
    Ok(MigrationEngine::new(
        database,
        Arc::clone(&log.store) as Arc<dyn ChangeLogStore>,
        config.migration.clone(),
    )?
    .with_loader(Arc::new(JsonScriptLoader::new())))
}

/// `status`: list applied change-sets.
pub fn status(config: &CliConfig) -> Result<(), MigrateError> {
    let log = open_log(config)?;
    let entries = log.store.load_all()?;

    if entries.is_empty() {
        println!("No change-sets applied.");
        return Ok(());
    }

    println!("{}", format_log_as_table(&entries));
    Ok(())
}

/// `verify`: check the log against the script.
pub fn verify(config: &CliConfig, args: &ScriptArgs) -> Result<(), MigrateError> {
    let log = open_log(config)?;
    let engine = engine(config, &log, Arc::new(RecordingDatabase::new()))?;
    let declared = engine.load(&ScriptSource::File(args.script.clone()), &args.variables())?;

    let verified = engine.verify(&declared)?;
    println!(
        "OK: {verified} applied change-set(s) match {}.",
        args.script.display()
    );
    Ok(())
}

/// `pending`: show what `apply` would do.
pub fn pending(config: &CliConfig, args: &ScriptArgs) -> Result<(), MigrateError> {
    let log = open_log(config)?;
    let engine = engine(config, &log, Arc::new(RecordingDatabase::new()))?;
    let declared = engine.load(&ScriptSource::File(args.script.clone()), &args.variables())?;

    let plan = engine.plan(&declared, &args.tag_set())?;

    if plan.to_apply.is_empty() && plan.to_skip.is_empty() {
        println!("Nothing to apply.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["action", "position", "version", "revision", "tags"]);
    for (offset, &position) in plan.to_apply.iter().enumerate() {
        let change = &declared[position];
        table.add_row(vec![
            Cell::new("apply"),
            Cell::new(position),
            Cell::new(&change.version),
            Cell::new(plan.next_revision + offset as u64),
            Cell::new(join(change.tags.iter())),
        ]);
    }
    for &position in &plan.to_skip {
        let change = &declared[position];
        table.add_row(vec![
            Cell::new("skip"),
            Cell::new(position),
            Cell::new(&change.version),
            Cell::new("-"),
            Cell::new(join(change.tags.iter())),
        ]);
    }
    println!(
        "{}\n{} to apply, {} skipped by tags.",
        table,
        plan.to_apply.len(),
        plan.to_skip.len()
    );
    Ok(())
}

/// `apply`: run the engine, writing statements to `out`.
///
/// Entries are logged once written, before anything downstream runs them.
pub fn apply(
    config: &CliConfig,
    args: &ScriptArgs,
    out: Option<&PathBuf>,
) -> Result<(), MigrateError> {
    let sink: Box<dyn io::Write + Send> = match out {
        Some(path) => Box::new(File::create(path).map_err(|e| {
            MigrateError::InvalidConfig(format!("cannot create {}: {e}", path.display()))
        })?),
        None => Box::new(io::stdout()),
    };

    let log = open_log(config)?;
    let engine = engine(config, &log, Arc::new(ScriptWriter::new(sink)))?;

    let report = engine.execute_with_variables(
        &ScriptSource::File(args.script.clone()),
        &args.tag_set(),
        &args.variables(),
    )?;

    for applied in &report.applied {
        eprintln!(
            "applied #{} version {} at revision {} (bucket {})",
            applied.position, applied.version, applied.revision, applied.bucket
        );
    }
    for skipped in &report.skipped {
        eprintln!(
            "skipped #{} version {} (tags: {})",
            skipped.position,
            skipped.version,
            join(skipped.tags.iter())
        );
    }
    eprintln!("{} change-set(s) applied.", report.applied_count());
    Ok(())
}

/// Format log entries as a table with a count footer.
fn format_log_as_table(entries: &[ChangeLogEntry]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["revision", "bucket", "applied", "hash", "version", "tags"]);

    for entry in entries {
        let applied = chrono::DateTime::from_timestamp_micros(entry.applied_at as i64)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(entry.revision),
            Cell::new(entry.bucket),
            Cell::new(applied),
            Cell::new(entry.hash.short()),
            Cell::new(&entry.version),
            Cell::new(join(entry.tags.iter())),
        ]);
    }

    format!("{}\n{} change-set(s) applied.", table, entries.len())
}

fn join<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(String::as_str).collect::<Vec<_>>().join(",")
}
