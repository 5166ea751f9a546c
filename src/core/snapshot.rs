// Snapshot container opening: tag/version checks, typed cell decoding, and shared locking.
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Deserialize;
use serde_json::Value;

use crate::core::cell::{Cell, ColumnType, parse_datetime};
use crate::core::error::{Error, ErrorKind};
use crate::core::format::check_header;
use crate::core::store::{RawColumn, RawStore, RawTable};

#[derive(Deserialize)]
struct SnapshotFile {
    snapshot: String,
    version: u32,
    #[serde(default)]
    tables: Vec<SnapshotTable>,
}

#[derive(Deserialize)]
struct SnapshotTable {
    name: String,
    #[serde(default)]
    columns: Vec<SnapshotColumn>,
}

#[derive(Deserialize)]
struct SnapshotColumn {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
    #[serde(default)]
    values: Vec<Value>,
}

/// Reads a column-major JSON dump of a legacy database. The whole container
/// is decoded at open time so a corrupt file fails before any table is served.
pub struct SnapshotStore {
    path: PathBuf,
    file: Option<File>,
    tables: Vec<(String, RawTable)>,
}

impl SnapshotStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(|err| open_error(err, &path))?;

        FileExt::try_lock_shared(&file).map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_message("database file is locked")
                .with_path(&path)
                .with_hint("Another process holds an exclusive lock; retry once it finishes.")
                .with_source(err)
        })?;

        let mut text = String::new();
        if let Err(err) = file.read_to_string(&mut text) {
            let _ = FileExt::unlock(&file);
            return Err(Error::new(ErrorKind::Load)
                .with_message("failed to read database file")
                .with_path(&path)
                .with_source(err));
        }

        let tables = match decode(&text, &path) {
            Ok(tables) => tables,
            Err(err) => {
                let _ = FileExt::unlock(&file);
                return Err(err);
            }
        };
        tracing::debug!(path = %path.display(), tables = tables.len(), "snapshot opened");

        Ok(Self {
            path,
            file: Some(file),
            tables,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.file.is_none() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("database is closed")
                .with_path(&self.path));
        }
        Ok(())
    }
}

impl RawStore for SnapshotStore {
    fn table_names(&mut self) -> Result<Vec<String>, Error> {
        self.ensure_open()?;
        Ok(self.tables.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_table(&mut self, name: &str) -> Result<RawTable, Error> {
        self.ensure_open()?;
        self.tables
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, table)| table.clone())
            .ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message("table not found")
                    .with_table(name)
                    .with_path(&self.path)
            })
    }

    fn close(&mut self) -> Result<(), Error> {
        if let Some(file) = self.file.take() {
            FileExt::unlock(&file).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to release database lock")
                    .with_path(&self.path)
                    .with_source(err)
            })?;
            tracing::debug!(path = %self.path.display(), "snapshot closed");
        }
        Ok(())
    }
}

impl Drop for SnapshotStore {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

fn decode(text: &str, path: &Path) -> Result<Vec<(String, RawTable)>, Error> {
    let snapshot: SnapshotFile = serde_json::from_str(text).map_err(|err| {
        Error::new(ErrorKind::Load)
            .with_message("database file is not a readable container")
            .with_path(path)
            .with_hint("Check that the file is a complete snapshot and not truncated.")
            .with_source(err)
    })?;
    check_header(&snapshot.snapshot, snapshot.version, path)?;

    let mut tables: Vec<(String, RawTable)> = Vec::with_capacity(snapshot.tables.len());
    for table in snapshot.tables {
        if tables.iter().any(|(existing, _)| *existing == table.name) {
            return Err(Error::new(ErrorKind::Load)
                .with_message("table listed twice in container")
                .with_table(table.name)
                .with_path(path));
        }
        let mut columns = Vec::with_capacity(table.columns.len());
        for column in table.columns {
            let column_type = column.column_type.parse::<ColumnType>().map_err(|message| {
                Error::new(ErrorKind::Load)
                    .with_message(message)
                    .with_table(&table.name)
                    .with_field(&column.name)
                    .with_path(path)
            })?;
            let mut values = Vec::with_capacity(column.values.len());
            for (row, value) in column.values.into_iter().enumerate() {
                let cell = decode_cell(value, column_type).map_err(|message| {
                    Error::new(ErrorKind::Load)
                        .with_message(message)
                        .with_table(&table.name)
                        .with_field(&column.name)
                        .with_row(row)
                        .with_path(path)
                })?;
                values.push(cell);
            }
            columns.push(RawColumn::new(column.name, column_type, values));
        }
        tables.push((table.name, RawTable::new(columns)));
    }
    Ok(tables)
}

fn decode_cell(value: Value, column_type: ColumnType) -> Result<Cell, String> {
    if value.is_null() {
        return Ok(Cell::Null);
    }
    let mismatch = |value: &Value| format!("expected {column_type} value, found {value}");
    match column_type {
        ColumnType::Boolean => match &value {
            Value::Bool(flag) => Ok(Cell::Bool(*flag)),
            // The legacy engine stores yes/no as 0 and -1.
            Value::Number(number) => match number.as_i64() {
                Some(0) => Ok(Cell::Bool(false)),
                Some(1) | Some(-1) => Ok(Cell::Bool(true)),
                _ => Err(mismatch(&value)),
            },
            _ => Err(mismatch(&value)),
        },
        ColumnType::Int8 | ColumnType::Int16 | ColumnType::Int32 | ColumnType::Complex => value
            .as_i64()
            .map(Cell::Int)
            .ok_or_else(|| mismatch(&value)),
        ColumnType::Money | ColumnType::Float32 | ColumnType::Float64 | ColumnType::Numeric => {
            value
                .as_f64()
                .map(Cell::Float)
                .ok_or_else(|| mismatch(&value))
        }
        ColumnType::DateTime => value
            .as_str()
            .and_then(parse_datetime)
            .map(Cell::DateTime)
            .ok_or_else(|| mismatch(&value)),
        ColumnType::Binary | ColumnType::Ole => value
            .as_str()
            .and_then(decode_hex)
            .map(Cell::Bytes)
            .ok_or_else(|| mismatch(&value)),
        ColumnType::Text | ColumnType::Memo | ColumnType::Guid => match value {
            Value::String(text) => Ok(Cell::Text(text)),
            other => Err(mismatch(&other)),
        },
    }
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|idx| u8::from_str_radix(text.get(idx..idx + 2)?, 16).ok())
        .collect()
}

fn open_error(err: io::Error, path: &Path) -> Error {
    match err.kind() {
        io::ErrorKind::NotFound => Error::new(ErrorKind::NotFound)
            .with_message("database file not found")
            .with_path(path)
            .with_hint("Check the path, or set --db / TABEX_DB.")
            .with_source(err),
        _ => Error::new(ErrorKind::Io)
            .with_message("failed to open database file")
            .with_path(path)
            .with_source(err),
    }
}

fn lock_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::WouldBlock => ErrorKind::Busy,
        _ => ErrorKind::Io,
    }
}
