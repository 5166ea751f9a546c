//! Purpose: Run multi-table exports from the catalog to JSON, YAML, or CSV artifacts.
//! Exports: `ExportFormat`, `ExportOptions`, `ExportResult`, `CancelToken`, `export_tables`, `artifact_path`.
//! Role: Orchestrates selection, transposition, optional validation, and writing per table.
//! Invariants: One table's failure is recorded and the export continues with the rest.
//! Invariants: Only an unwritable destination aborts the whole export.
//! Invariants: Cancellation is honored between tables, never inside one artifact.
mod writers;

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::catalog::Catalog;
use crate::core::error::{Error, ErrorKind};
use crate::core::pattern;
use crate::core::schema::SchemaRegistry;
use crate::core::transpose::transpose;
use crate::core::validate::validate_records;

pub use writers::TableData;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExportFormat {
    Json,
    Yaml,
    Csv,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => ".json",
            ExportFormat::Yaml => ".yaml",
            ExportFormat::Csv => ".csv",
        }
    }

    /// CSV has no nesting, so it cannot hold several tables in one artifact.
    pub fn supports_combined(self) -> bool {
        !matches!(self, ExportFormat::Csv)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unsupported export format `{other}`"))
                .with_hint("Use one of: json, yaml, csv.")),
        }
    }
}

/// Shared flag checked between tables. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The underlying flag, for wiring to signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub tables: Vec<String>,
    pub separate_files: bool,
    pub validate: bool,
    pub cancel: Option<CancelToken>,
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            tables: Vec::new(),
            separate_files: false,
            validate: false,
            cancel: None,
        }
    }

    pub fn with_tables<S: Into<String>>(mut self, tables: impl IntoIterator<Item = S>) -> Self {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_separate_files(mut self, separate_files: bool) -> Self {
        self.separate_files = separate_files;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
    }
}

#[derive(Debug)]
pub struct ExportResult {
    pub format: ExportFormat,
    pub tables_exported: usize,
    pub table_names: Vec<String>,
    pub output_paths: Vec<PathBuf>,
    pub errors: BTreeMap<String, Error>,
    /// Keys of `errors` in the order the tables failed.
    pub failed_tables: Vec<String>,
    /// Set when combined output was requested for a format that cannot hold it.
    pub forced_separate_files: bool,
    pub validation_failures: BTreeMap<String, usize>,
    pub cancelled: bool,
}

impl ExportResult {
    fn new(format: ExportFormat, forced_separate_files: bool) -> Self {
        Self {
            format,
            tables_exported: 0,
            table_names: Vec::new(),
            output_paths: Vec::new(),
            errors: BTreeMap::new(),
            failed_tables: Vec::new(),
            forced_separate_files,
            validation_failures: BTreeMap::new(),
            cancelled: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }

    /// Error of the earliest table that failed during the export.
    pub fn first_error(&self) -> Option<&Error> {
        self.failed_tables
            .first()
            .and_then(|table| self.errors.get(table))
    }

    fn record_error(&mut self, table: &str, err: Error) {
        tracing::warn!(table, error = %err, "table export failed");
        let err = match err.table() {
            Some(_) => err,
            None => err.with_table(table),
        };
        if self.errors.insert(table.to_string(), err).is_none() {
            self.failed_tables.push(table.to_string());
        }
    }
}

/// Per-table artifact name: `<parent>/<stem>_<table><ext>`.
pub fn artifact_path(destination: &Path, table: &str, format: ExportFormat) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{stem}_{table}{}", format.extension());
    match destination.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

pub fn export_tables(
    catalog: &Catalog,
    registry: &SchemaRegistry,
    destination: &Path,
    options: &ExportOptions,
) -> Result<ExportResult, Error> {
    let selected = pattern::resolve(&options.tables, catalog.list_tables()?)?;
    let forced = !options.separate_files && !options.format.supports_combined();
    if forced {
        tracing::info!(
            format = %options.format,
            "format has no combined form; writing one artifact per table"
        );
    }
    let separate = options.separate_files || forced;

    prepare_destination(destination)?;
    let mut result = ExportResult::new(options.format, forced);

    if separate {
        for name in &selected {
            if options.cancelled() {
                result.cancelled = true;
                break;
            }
            let table = match load_table(catalog, registry, name, options.validate, &mut result) {
                Ok(table) => table,
                Err(err) => {
                    result.record_error(name, err);
                    continue;
                }
            };
            let path = artifact_path(destination, name, options.format);
            match write_artifact(&path, |out| writers::write_table(options.format, out, &table)) {
                Ok(()) => {
                    result.tables_exported += 1;
                    result.table_names.push(name.clone());
                    result.output_paths.push(path);
                }
                Err(err) => result.record_error(name, err),
            }
        }
    } else {
        let mut tables = Vec::with_capacity(selected.len());
        for name in &selected {
            if options.cancelled() {
                result.cancelled = true;
                break;
            }
            match load_table(catalog, registry, name, options.validate, &mut result) {
                Ok(table) => tables.push(table),
                Err(err) => result.record_error(name, err),
            }
        }
        if result.cancelled {
            return Ok(result);
        }
        write_artifact(destination, |out| {
            writers::write_combined(options.format, out, &tables)
        })?;
        result.tables_exported = tables.len();
        result.table_names = tables.into_iter().map(|table| table.name).collect();
        result.output_paths.push(destination.to_path_buf());
    }

    tracing::info!(
        format = %options.format,
        exported = result.tables_exported,
        failed = result.errors.len(),
        cancelled = result.cancelled,
        "export finished"
    );
    Ok(result)
}

fn load_table(
    catalog: &Catalog,
    registry: &SchemaRegistry,
    name: &str,
    validate: bool,
    result: &mut ExportResult,
) -> Result<TableData, Error> {
    let raw = catalog.read_table(name)?;
    let columns = raw.column_names();
    let mut records = transpose(raw).map_err(|err| err.with_table(name))?;
    if validate {
        let checked = validate_records(name, registry.validator_for(name), records);
        if !checked.failures.is_empty() {
            result
                .validation_failures
                .insert(name.to_string(), checked.failures.len());
        }
        records = checked.records;
    }
    Ok(TableData {
        name: name.to_string(),
        columns,
        records,
    })
}

fn prepare_destination(destination: &Path) -> Result<(), Error> {
    if destination.file_name().is_none() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("export destination must name a file")
            .with_path(destination)
            .with_hint("Pass a file path such as out/data.json."));
    }
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Write)
                    .with_message("cannot create output directory")
                    .with_path(parent)
                    .with_source(err)
            })
        }
        _ => Ok(()),
    }
}

fn write_artifact<F>(path: &Path, write: F) -> Result<(), Error>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), Error>,
{
    let file = File::create(path).map_err(|err| {
        Error::new(ErrorKind::Write)
            .with_message("cannot open output file for writing")
            .with_path(path)
            .with_source(err)
    })?;
    let mut out = BufWriter::new(file);
    let written = write(&mut out).and_then(|()| {
        out.flush().map_err(|err| {
            Error::new(ErrorKind::Write)
                .with_message("failed to flush output file")
                .with_source(err)
        })
    });
    if let Err(err) = written {
        drop(out);
        // No truncated artifact is left behind.
        if let Err(remove_err) = fs::remove_file(path) {
            tracing::warn!(
                path = %path.display(),
                error = %remove_err,
                "failed to remove partial artifact"
            );
        }
        return Err(err.with_path(path));
    }
    Ok(())
}
