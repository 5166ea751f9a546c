//! Purpose: Turn column-major table data into row-major records.
//! Exports: `Record`, `transpose`.
//! Role: Shared intermediate form consumed by validation and every exporter.
//! Invariants: Output length equals the table's row count; each record has every column.
//! Invariants: Field order inside a record follows source column order.
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::core::cell::Cell;
use crate::core::error::Error;
use crate::core::store::RawTable;

/// One row. Column names are shared by every record of a table.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Cell>,
}

impl Record {
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Cell)>) -> Self {
        let (columns, values): (Vec<String>, Vec<Cell>) = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.position(column).map(|idx| &self.values[idx])
    }

    /// Replaces the value of an existing column; returns false when the
    /// column is not part of the record.
    pub fn set(&mut self, column: &str, value: Cell) -> bool {
        match self.position(column) {
            Some(idx) => {
                self.values[idx] = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.len());
        for (column, value) in self.iter() {
            map.insert(column.to_string(), value.to_json());
        }
        Value::Object(map)
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Consumes the table so cell values move instead of being cloned; the
/// output vector is sized to the row count up front.
pub fn transpose(table: RawTable) -> Result<Vec<Record>, Error> {
    let row_count = table.row_count()?;
    let columns: Arc<[String]> = table.column_names().into();
    let mut cursors: Vec<_> = table
        .columns
        .into_iter()
        .map(|column| column.values.into_iter())
        .collect();

    let mut records = Vec::with_capacity(row_count);
    for _ in 0..row_count {
        let values = cursors
            .iter_mut()
            .map(|cursor| cursor.next().unwrap_or(Cell::Null))
            .collect();
        records.push(Record {
            columns: Arc::clone(&columns),
            values,
        });
    }
    Ok(records)
}
