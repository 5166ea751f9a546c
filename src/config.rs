//! Purpose: Resolve the database path and the schema registry from flags and environment.
//! Exports: `DB_ENV`, `resolve_db_path`, `resolve_db_path_from`, `load_registry`.
//! Role: Keep CLI and embedding callers on one set of resolution rules.
//! Invariants: An explicit flag always wins over `TABEX_DB`.
//! Invariants: Schema-file entries replace built-in entries for the same table.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};
use crate::core::schema::SchemaRegistry;
use crate::schemas;

pub const DB_ENV: &str = "TABEX_DB";

pub fn resolve_db_path(flag: Option<&Path>) -> Result<PathBuf, Error> {
    resolve_db_path_from(flag, std::env::var_os(DB_ENV))
}

pub fn resolve_db_path_from(flag: Option<&Path>, env: Option<OsString>) -> Result<PathBuf, Error> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    match env {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message("no database given")
            .with_hint(format!("Pass --db <PATH> or set {DB_ENV}."))),
    }
}

pub fn load_registry(schema_file: Option<&Path>, include_builtin: bool) -> Result<SchemaRegistry, Error> {
    let mut registry = if include_builtin {
        schemas::builtin()
    } else {
        SchemaRegistry::new()
    };
    if let Some(path) = schema_file {
        let overlay = SchemaRegistry::load(path)?;
        tracing::debug!(path = %path.display(), schemas = overlay.len(), "schema file loaded");
        registry.merge(overlay);
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::{load_registry, resolve_db_path_from};
    use crate::core::error::ErrorKind;
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    #[test]
    fn flag_wins_over_env() {
        let path = resolve_db_path_from(Some(Path::new("a.json")), Some(OsString::from("b.json")))
            .expect("path");
        assert_eq!(path, PathBuf::from("a.json"));
    }

    #[test]
    fn env_is_fallback() {
        let path = resolve_db_path_from(None, Some(OsString::from("b.json"))).expect("path");
        assert_eq!(path, PathBuf::from("b.json"));
    }

    #[test]
    fn missing_db_is_usage_error_with_hint() {
        for env in [None, Some(OsString::new())] {
            let err = resolve_db_path_from(None, env).expect_err("missing");
            assert_eq!(err.kind(), ErrorKind::Usage);
            assert!(err.hint().is_some_and(|hint| hint.contains("TABEX_DB")));
        }
    }

    #[test]
    fn schema_file_overrides_builtin() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("schemas.json");
        std::fs::write(
            &path,
            r#"{"GenisysZones": [{"name": "Zone", "type": "text", "required": false}],
                "Extra": [{"name": "Id", "type": "integer"}]}"#,
        )
        .expect("write");

        let registry = load_registry(Some(&path), true).expect("registry");
        let zones = registry.schema_for("GenisysZones").expect("zones");
        assert_eq!(zones.fields().len(), 1);
        assert!(registry.has_schema("Extra"));
        assert!(registry.has_schema("Phys_Dimmers"));

        let only_file = load_registry(Some(&path), false).expect("registry");
        assert_eq!(only_file.len(), 2);
    }

    #[test]
    fn missing_schema_file_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_registry(Some(&temp.path().join("nope.json")), true).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.path().is_some());
    }
}
