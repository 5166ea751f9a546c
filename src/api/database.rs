//! Purpose: Define the `Database` handle and one-shot convenience operations.
//! Exports: `Database`, `TableInfo`, `quick_export`, `list_tables`, `database_summary`.
//! Role: Stable boundary for embedding; mirrors what the CLI does per command.
//! Invariants: The raw store is released on `close`, on drop, and on every `with_open` exit path.
//! Invariants: Table metadata memoization lives and dies with one handle.
#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};

use super::{TableReport, ValidationReport};
use crate::core::catalog::{Catalog, ColumnDef};
use crate::core::error::Error;
use crate::core::export::{ExportOptions, ExportResult, export_tables};
use crate::core::pattern;
use crate::core::schema::SchemaRegistry;
use crate::core::snapshot::SnapshotStore;
use crate::core::store::RawStore;
use crate::core::summary::{Summary, summarize};
use crate::core::transpose::{Record, transpose};
use crate::core::validate::{TableValidation, validate_records};
use crate::schemas;

pub type ApiResult<T> = Result<T, Error>;

/// Table metadata as exposed to callers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub column_count: usize,
    pub row_count: usize,
    pub has_schema: bool,
}

impl TableInfo {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }
}

/// An open database. Holds the raw store for its whole lifetime.
pub struct Database {
    label: String,
    catalog: Catalog,
    registry: SchemaRegistry,
    closed: bool,
}

impl Database {
    /// Opens a snapshot container with the built-in schema set.
    pub fn open(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let store = SnapshotStore::open(path)?;
        Ok(Self::from_store(path.display().to_string(), store))
    }

    pub fn from_store(label: impl Into<String>, store: impl RawStore + 'static) -> Self {
        Self {
            label: label.into(),
            catalog: Catalog::new(Box::new(store)),
            registry: schemas::builtin(),
            closed: false,
        }
    }

    /// Opens `path`, runs `f`, and closes the handle whether `f` succeeded or not.
    pub fn with_open<T, F>(path: impl AsRef<Path>, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Database) -> ApiResult<T>,
    {
        let database = Self::open(path)?;
        let result = f(&database);
        let closed = database.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                tracing::warn!(error = %close_err, "close failed after an earlier error");
                Err(err)
            }
        }
    }

    pub fn with_schemas(mut self, registry: SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn list_tables(&self) -> ApiResult<Vec<String>> {
        Ok(self.catalog.list_tables()?.to_vec())
    }

    pub fn table_exists(&self, name: &str) -> ApiResult<bool> {
        self.catalog.table_exists(name)
    }

    /// Resolves names and `*` patterns against the table list; empty selects all.
    pub fn select_tables<S: AsRef<str>>(&self, patterns: &[S]) -> ApiResult<Vec<String>> {
        pattern::resolve(patterns, self.catalog.list_tables()?)
    }

    /// Patterns that select no table at all.
    pub fn unmatched_patterns<S: AsRef<str>>(&self, patterns: &[S]) -> ApiResult<Vec<String>> {
        Ok(pattern::unmatched(patterns, self.catalog.list_tables()?))
    }

    pub fn suggest(&self, name: &str) -> Vec<String> {
        self.catalog.suggest(name)
    }

    pub fn table_info(&self, name: &str) -> ApiResult<TableInfo> {
        let descriptor = self.catalog.table_info(name)?;
        Ok(TableInfo {
            column_count: descriptor.column_count(),
            has_schema: self.registry.has_schema(name),
            name: descriptor.name,
            columns: descriptor.columns,
            row_count: descriptor.row_count,
        })
    }

    /// Row-major records of one table. With `validate`, rows that pass are
    /// coerced to their schema types and rows that fail are kept as read.
    pub fn get_table(&self, name: &str, validate: bool) -> ApiResult<Vec<Record>> {
        if validate {
            return Ok(self.validate_table(name)?.records);
        }
        self.read_records(name)
    }

    pub fn validate_table(&self, name: &str) -> ApiResult<TableValidation> {
        let records = self.read_records(name)?;
        Ok(validate_records(
            name,
            self.registry.validator_for(name),
            records,
        ))
    }

    /// Validates every selected table. Tables that cannot be read are
    /// reported with an error status instead of aborting the run.
    pub fn validate_tables<S: AsRef<str>>(&self, patterns: &[S]) -> ApiResult<ValidationReport> {
        let mut report = ValidationReport::new(&self.label);
        for name in self.select_tables(patterns)? {
            let entry = match self.validate_table(&name) {
                Ok(result) => TableReport::from_validation(&result),
                Err(err) => {
                    tracing::warn!(table = %name, error = %err, "table could not be validated");
                    TableReport::errored(&name, self.registry.has_schema(&name), &err)
                }
            };
            report.push(entry);
        }
        Ok(report)
    }

    pub fn summary(&self) -> ApiResult<Summary> {
        summarize(&self.label, &self.catalog, &self.registry)
    }

    pub fn export(
        &self,
        destination: impl AsRef<Path>,
        options: &ExportOptions,
    ) -> ApiResult<ExportResult> {
        export_tables(
            &self.catalog,
            &self.registry,
            destination.as_ref(),
            options,
        )
    }

    /// Releases the raw store. Dropping the handle does the same, but only
    /// `close` reports a failure to release.
    pub fn close(mut self) -> ApiResult<()> {
        self.closed = true;
        self.catalog.close()
    }

    fn read_records(&self, name: &str) -> ApiResult<Vec<Record>> {
        let raw = self.catalog.read_table(name)?;
        transpose(raw).map_err(|err| err.with_table(name))
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.catalog.close() {
            tracing::debug!(database = %self.label, error = %err, "close on drop failed");
        }
    }
}

/// Opens `path`, exports with `options`, and closes.
pub fn quick_export(
    path: impl AsRef<Path>,
    destination: impl Into<PathBuf>,
    options: &ExportOptions,
) -> ApiResult<ExportResult> {
    let destination = destination.into();
    Database::with_open(path, |database| database.export(&destination, options))
}

pub fn list_tables(path: impl AsRef<Path>) -> ApiResult<Vec<String>> {
    Database::with_open(path, Database::list_tables)
}

pub fn database_summary(path: impl AsRef<Path>) -> ApiResult<Summary> {
    Database::with_open(path, Database::summary)
}

#[cfg(test)]
mod tests {
    use super::{Database, TableInfo};
    use crate::api::ValidationStatus;
    use crate::core::cell::{Cell, ColumnType};
    use crate::core::error::{Error, ErrorKind};
    use crate::core::schema::{FieldDef, FieldType, Schema, SchemaRegistry};
    use crate::core::store::{MemoryStore, RawColumn, RawStore, RawTable};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn zones() -> RawTable {
        RawTable::new(vec![
            RawColumn::new("Zone_ID", ColumnType::Int32, vec![Cell::Int(1), Cell::Null]),
            RawColumn::new(
                "Zone",
                ColumnType::Text,
                vec![Cell::from("Hall"), Cell::from("Foyer")],
            ),
        ])
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new().with_schema(
            "Zones",
            Schema::new(vec![
                FieldDef::required("Zone_ID", FieldType::Integer),
                FieldDef::required("Zone", FieldType::Text),
            ]),
        )
    }

    fn database() -> Database {
        let store = MemoryStore::new()
            .with_table("Zones", zones())
            .with_table("Notes", RawTable::default());
        Database::from_store("memory", store).with_schemas(registry())
    }

    struct TrackedStore {
        inner: MemoryStore,
        closed: Arc<AtomicBool>,
    }

    impl RawStore for TrackedStore {
        fn table_names(&mut self) -> Result<Vec<String>, Error> {
            self.inner.table_names()
        }

        fn read_table(&mut self, name: &str) -> Result<RawTable, Error> {
            self.inner.read_table(name)
        }

        fn close(&mut self) -> Result<(), Error> {
            self.closed.store(true, Ordering::SeqCst);
            self.inner.close()
        }
    }

    #[test]
    fn table_info_reports_schema_presence() {
        let db = database();
        let info = db.table_info("Zones").expect("info");
        assert_eq!(
            info,
            TableInfo {
                name: "Zones".to_string(),
                columns: info.columns.clone(),
                column_count: 2,
                row_count: 2,
                has_schema: true,
            }
        );
        assert_eq!(info.column_names(), ["Zone_ID", "Zone"]);
        assert!(!db.table_info("Notes").expect("notes").has_schema);
    }

    #[test]
    fn unknown_table_is_not_found() {
        let db = database();
        match db.get_table("zone", false) {
            Ok(_) => panic!("expected not found"),
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::NotFound);
                assert_eq!(err.table(), Some("zone"));
                assert!(err.hint().is_some_and(|hint| hint.contains("Zones")));
            }
        }
    }

    #[test]
    fn get_table_keeps_failed_rows_when_validating() {
        let db = database();
        let records = db.get_table("Zones", true).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("Zone_ID"), Some(&Cell::Null));
    }

    #[test]
    fn validate_tables_reports_each_status() {
        let db = database();
        let report = db.validate_tables::<&str>(&[]).expect("report");
        assert_eq!(report.tables.len(), 2);
        assert_eq!(report.tables[0].status, ValidationStatus::Failed);
        assert_eq!(report.tables[1].status, ValidationStatus::NoSchema);
        assert!(!report.is_clean());
    }

    #[test]
    fn close_and_drop_release_the_store() {
        let closed = Arc::new(AtomicBool::new(false));
        let store = TrackedStore {
            inner: MemoryStore::new().with_table("Zones", zones()),
            closed: Arc::clone(&closed),
        };
        let db = Database::from_store("tracked", store);
        db.close().expect("close");
        assert!(closed.load(Ordering::SeqCst));

        let closed = Arc::new(AtomicBool::new(false));
        let store = TrackedStore {
            inner: MemoryStore::new(),
            closed: Arc::clone(&closed),
        };
        drop(Database::from_store("tracked", store));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn with_open_reports_missing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = Database::with_open(temp.path().join("missing.json"), |db| db.list_tables())
            .expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
