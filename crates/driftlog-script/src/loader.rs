//! Flattening of script include graphs into one change-set sequence.

use crate::error::ScriptError;
use crate::format::ScriptFile;
use driftlog_core::{ChangeSetDefinition, Loader, MigrateError, ScriptSource, Variables};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads JSON migration scripts.
///
/// Includes are expanded depth-first, before the including file's own
/// change-sets. A file reached twice through different includes contributes
/// its change-sets once, at its first position.
#[derive(Debug, Clone, Default)]
pub struct JsonScriptLoader {
    base_dir: Option<PathBuf>,
}

/// Traversal state for one load.
#[derive(Default)]
struct LoadState {
    stack: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
    changes: Vec<ChangeSetDefinition>,
}

impl JsonScriptLoader {
    /// Create a loader resolving inline-script includes against the working
    /// directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve includes of inline scripts against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Load `source`, returning script-level errors.
    pub fn load_script(
        &self,
        source: &ScriptSource,
        variables: &Variables,
    ) -> Result<Vec<ChangeSetDefinition>, ScriptError> {
        let mut state = LoadState::default();
        match source {
            ScriptSource::File(path) => self.load_file(path, variables, &mut state)?,
            ScriptSource::Inline { name, text } => {
                let base = self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
                self.load_text(name, text, &base, variables, &mut state)?;
            }
        }
        Ok(state.changes)
    }

    fn load_file(
        &self,
        path: &Path,
        variables: &Variables,
        state: &mut LoadState,
    ) -> Result<(), ScriptError> {
        let io_err = |source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        };
        let canonical = path.canonicalize().map_err(io_err)?;

        if state.stack.contains(&canonical) {
            let mut chain: Vec<String> = state
                .stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            chain.push(canonical.display().to_string());
            return Err(ScriptError::IncludeCycle { chain });
        }
        if !state.seen.insert(canonical.clone()) {
            debug!(script = %path.display(), "script already included, skipping");
            return Ok(());
        }

        let text = fs::read_to_string(&canonical).map_err(io_err)?;
        let base = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        state.stack.push(canonical);
        self.load_text(&path.display().to_string(), &text, &base, variables, state)?;
        state.stack.pop();
        Ok(())
    }

    fn load_text(
        &self,
        name: &str,
        text: &str,
        base: &Path,
        variables: &Variables,
        state: &mut LoadState,
    ) -> Result<(), ScriptError> {
        let script: ScriptFile = serde_json::from_str(text).map_err(|source| ScriptError::Parse {
            script: name.to_string(),
            source,
        })?;

        for include in &script.include {
            self.load_file(&base.join(include), variables, state)?;
        }

        let count = script.changesets.len();
        for (index, raw) in script.changesets.into_iter().enumerate() {
            state
                .changes
                .push(raw.into_definition(name, index, variables)?);
        }
        debug!(script = name, change_sets = count, "loaded script");
        Ok(())
    }
}

impl Loader for JsonScriptLoader {
    fn load(
        &self,
        source: &ScriptSource,
        variables: &Variables,
    ) -> Result<Vec<ChangeSetDefinition>, MigrateError> {
        Ok(self.load_script(source, variables)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    fn versions(changes: &[ChangeSetDefinition]) -> Vec<&str> {
        changes.iter().map(|c| c.version.as_str()).collect()
    }

    #[test]
    fn test_load_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(
            dir.path(),
            "main.json",
            r#"{"changesets": [
                {"version": "1", "statements": ["CREATE TABLE a (id int PRIMARY KEY)"]},
                {"version": "2", "tags": ["dev"], "statements": ["INSERT INTO a (id) VALUES (1)"]}
            ]}"#,
        );

        let changes = JsonScriptLoader::new()
            .load_script(&ScriptSource::File(main), &Variables::new())
            .unwrap();

        assert_eq!(versions(&changes), vec!["1", "2"]);
        assert!(changes[1].tags.contains("dev"));
    }

    #[test]
    fn test_includes_flatten_depth_first() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "schema/base.json",
            r#"{"changesets": [{"version": "base", "statements": ["b"]}]}"#,
        );
        write(
            dir.path(),
            "schema/users.json",
            r#"{"include": ["base.json"],
                "changesets": [{"version": "users", "statements": ["u"]}]}"#,
        );
        write(
            dir.path(),
            "schema/orders.json",
            r#"{"include": ["base.json"],
                "changesets": [{"version": "orders", "statements": ["o"]}]}"#,
        );
        let main = write(
            dir.path(),
            "main.json",
            r#"{"include": ["schema/users.json", "schema/orders.json"],
                "changesets": [{"version": "main", "statements": ["m"]}]}"#,
        );

        let changes = JsonScriptLoader::new()
            .load_script(&ScriptSource::File(main), &Variables::new())
            .unwrap();

        assert_eq!(versions(&changes), vec!["base", "users", "orders", "main"]);
    }

    #[test]
    fn test_include_cycle_detected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", r#"{"include": ["b.json"]}"#);
        let b = write(dir.path(), "b.json", r#"{"include": ["a.json"]}"#);

        let result = JsonScriptLoader::new().load_script(&ScriptSource::File(b), &Variables::new());

        assert!(matches!(result, Err(ScriptError::IncludeCycle { .. })));
    }

    #[test]
    fn test_missing_include_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.json", r#"{"include": ["nope.json"]}"#);

        let result = JsonScriptLoader::new().load_script(&ScriptSource::File(main), &Variables::new());

        assert!(matches!(result, Err(ScriptError::Io { .. })));
    }

    #[test]
    fn test_inline_source_with_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "base.json",
            r#"{"changesets": [{"version": "base", "statements": ["CREATE KEYSPACE ${ks}"]}]}"#,
        );
        let mut vars = Variables::new();
        vars.insert("ks".to_string(), "app".to_string());

        let changes = JsonScriptLoader::new()
            .with_base_dir(dir.path())
            .load_script(
                &ScriptSource::inline("inline", r#"{"include": ["base.json"]}"#),
                &vars,
            )
            .unwrap();

        assert_eq!(changes[0].statements, vec!["CREATE KEYSPACE app"]);
    }

    #[test]
    fn test_errors_convert_to_load_errors() {
        let loader = JsonScriptLoader::new();
        let err = Loader::load(
            &loader,
            &ScriptSource::inline("broken", "{not json"),
            &Variables::new(),
        )
        .unwrap_err();

        match err {
            MigrateError::Load { script, .. } => assert_eq!(script, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_variable_names_change_set() {
        let result = JsonScriptLoader::new().load_script(
            &ScriptSource::inline(
                "main",
                r#"{"changesets": [
                    {"version": "1", "statements": ["a"]},
                    {"version": "2", "statements": ["CREATE TABLE ${ks}.t (id int PRIMARY KEY)"]}
                ]}"#,
            ),
            &Variables::new(),
        );

        assert!(matches!(
            result,
            Err(ScriptError::UnknownVariable { index: 1, ref name, .. }) if name == "ks"
        ));
    }
}
