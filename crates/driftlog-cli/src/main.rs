//! driftlog - apply schema change-sets exactly once and detect drift.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod commands;
mod config;
mod writer;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Args, Command};
use driftlog_core::MigrateError;

fn main() {
    // Statements go to stdout, so logs stay on stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "driftlog=info,driftlog_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        if let Some(hint) = hint(&e) {
            eprintln!("{hint}");
        }
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), MigrateError> {
    let config = args.to_config();
    config.migration.validate()?;

    tracing::debug!(
        log_path = %config.change_log.path.display(),
        bucket_size = config.migration.bucket_size,
        "configuration loaded"
    );

    match &args.command {
        Command::Status => commands::status(&config),
        Command::Verify(script) => commands::verify(&config, script),
        Command::Pending(script) => commands::pending(&config, script),
        Command::Apply { script, out } => commands::apply(&config, script, out.as_ref()),
    }
}

/// Extra guidance for errors an operator has to act on.
fn hint(error: &MigrateError) -> Option<&'static str> {
    match error {
        MigrateError::Altered { .. } | MigrateError::Removed { .. } => Some(
            "Applied change-sets must not be edited or removed. Restore the original \
             change-set and add a new one instead.",
        ),
        MigrateError::StoreRace { .. } => {
            Some("Another runner applied a change-set concurrently. Re-run to continue.")
        }
        MigrateError::Execution { .. } => Some(
            "Change-sets before the failing one were recorded. Fix the statement and re-run.",
        ),
        MigrateError::StoreMismatch { .. } => {
            Some("Pass the --bucket-size the change log was created with.")
        }
        _ => None,
    }
}
