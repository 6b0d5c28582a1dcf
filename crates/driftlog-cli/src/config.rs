//! Command-line arguments and run configuration.

use clap::{Args as ClapArgs, Parser, Subcommand};
use driftlog_core::{ChangeLogConfig, MigrationConfig, Variables, DEFAULT_BUCKET_SIZE};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Default change log location.
pub const DEFAULT_LOG_PATH: &str = "./driftlog_data";

/// driftlog - apply change-sets once and detect drift.
#[derive(Parser, Debug)]
#[command(name = "driftlog")]
#[command(version, about = "Schema change-set runner with drift detection", long_about = None)]
pub struct Args {
    /// Path to the change log database.
    #[arg(short = 'l', long, default_value = DEFAULT_LOG_PATH)]
    pub log_path: PathBuf,

    /// Revisions per log bucket. Must match the value the log was created with.
    #[arg(long, default_value_t = DEFAULT_BUCKET_SIZE)]
    pub bucket_size: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List applied change-sets.
    Status,
    /// Check applied change-sets against a script without running anything.
    Verify(ScriptArgs),
    /// Show which change-sets a run would apply or skip.
    Pending(ScriptArgs),
    /// Apply pending change-sets, writing their statements to the output.
    ///
    /// Statements are written out, not executed. Each change-set is recorded
    /// in the change log as soon as its statements are written, so pipe the
    /// output straight into the database shell. If that shell fails, the log
    /// still lists the change-set as applied.
    Apply {
        #[command(flatten)]
        script: ScriptArgs,

        /// Output file for statements (stdout if omitted).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Script selection shared by the script-reading subcommands.
#[derive(ClapArgs, Debug, Clone)]
pub struct ScriptArgs {
    /// Migration script.
    pub script: PathBuf,

    /// Tag to include (repeatable).
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Script variable as key=value (repeatable).
    #[arg(long = "var", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

impl ScriptArgs {
    /// Requested tags as a set.
    pub fn tag_set(&self) -> BTreeSet<String> {
        self.tags.iter().cloned().collect()
    }

    /// Variables as a map. Later duplicates win.
    pub fn variables(&self) -> Variables {
        self.vars.iter().cloned().collect()
    }
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub change_log: ChangeLogConfig,
    pub migration: MigrationConfig,
}

impl Args {
    /// Convert command-line arguments to configuration.
    pub fn to_config(&self) -> CliConfig {
        CliConfig {
            change_log: ChangeLogConfig::new(&self.log_path),
            migration: MigrationConfig::default().with_bucket_size(self.bucket_size),
        }
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("ks=app").unwrap(),
            ("ks".to_string(), "app".to_string())
        );
        assert_eq!(
            parse_var("opts=a=b").unwrap(),
            ("opts".to_string(), "a=b".to_string())
        );
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn test_apply_help_warns_entries_are_logged_on_write() {
        use clap::CommandFactory;

        let command = Args::command();
        let apply = command
            .find_subcommand("apply")
            .expect("apply subcommand");
        let help = apply.get_long_about().expect("long help").to_string();

        assert!(help.contains("recorded in the change log as soon as its statements are written"));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "driftlog",
            "--bucket-size",
            "50",
            "apply",
            "main.json",
            "--tag",
            "dev",
            "--var",
            "ks=app",
        ])
        .unwrap();

        let config = args.to_config();
        assert_eq!(config.migration.bucket_size, 50);
        assert_eq!(config.change_log.path, PathBuf::from(DEFAULT_LOG_PATH));

        match args.command {
            Command::Apply { script, out } => {
                assert_eq!(script.script, PathBuf::from("main.json"));
                assert!(script.tag_set().contains("dev"));
                assert_eq!(script.variables().get("ks").map(String::as_str), Some("app"));
                assert!(out.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
