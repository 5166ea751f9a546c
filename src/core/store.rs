//! Purpose: Define the raw-store seam that yields column-major table data.
//! Exports: `RawStore`, `RawTable`, `RawColumn`, `MemoryStore`.
//! Role: Boundary to whatever reads the legacy container; everything above is format-agnostic.
//! Invariants: Stores are not assumed thread-safe; callers serialize access (see `Catalog`).
//! Invariants: `RawTable` column names are unique; duplicates are an integrity error.
use std::collections::HashSet;

use crate::core::cell::{Cell, ColumnType};
use crate::core::error::{Error, ErrorKind};

/// Source of raw tables. Implementations own whatever session or file handle
/// backs them; `close` releases it and must be safe to call once.
pub trait RawStore: Send {
    fn table_names(&mut self) -> Result<Vec<String>, Error>;

    fn read_table(&mut self, name: &str) -> Result<RawTable, Error>;

    fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub values: Vec<Cell>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, column_type: ColumnType, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            column_type,
            values,
        }
    }
}

/// Column-major table data in source column order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn new(columns: Vec<RawColumn>) -> Self {
        Self { columns }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// Row count shared by every column. Fails when columns disagree or a
    /// column name repeats.
    pub fn row_count(&self) -> Result<usize, Error> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::new(ErrorKind::Integrity)
                    .with_message("duplicate column name")
                    .with_field(&column.name));
            }
        }

        let Some(first) = self.columns.first() else {
            return Ok(0);
        };
        let expected = first.values.len();
        for column in &self.columns[1..] {
            if column.values.len() != expected {
                return Err(Error::new(ErrorKind::Integrity)
                    .with_message(format!(
                        "column length mismatch: `{}` has {} values, `{}` has {}",
                        first.name,
                        expected,
                        column.name,
                        column.values.len()
                    ))
                    .with_field(&column.name));
            }
        }
        Ok(expected)
    }
}

/// In-process store; tables keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Vec<(String, RawTable)>,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, table: RawTable) -> Self {
        self.insert(name, table);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, table: RawTable) {
        let name = name.into();
        match self.tables.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = table,
            None => self.tables.push((name, table)),
        }
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::new(ErrorKind::Usage).with_message("store is closed"));
        }
        Ok(())
    }
}

impl RawStore for MemoryStore {
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
            })
    }

    fn close(&mut self) -> Result<(), Error> {
        self.closed = true;
        Ok(())
    }
}
