//! Purpose: Scalar cell values and declared column types for legacy tables.
//! Exports: `Cell`, `ColumnType`, `format_datetime`, `parse_datetime`.
//! Role: Shared value model between raw stores, validation, and every exporter.
//! Invariants: Datetimes render as ISO-8601 `YYYY-MM-DDTHH:MM:SS[.f...]`, fraction trimmed of trailing zeros.
//! Invariants: Finite floats always render with a decimal point; non-finite ones as null (empty text).
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

/// Declared type of a column as recorded by the legacy container.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ColumnType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Money,
    Float32,
    Float64,
    DateTime,
    Binary,
    Text,
    Ole,
    Memo,
    Guid,
    Numeric,
    Complex,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Int8 => "int8",
            ColumnType::Int16 => "int16",
            ColumnType::Int32 => "int32",
            ColumnType::Money => "money",
            ColumnType::Float32 => "float32",
            ColumnType::Float64 => "float64",
            ColumnType::DateTime => "datetime",
            ColumnType::Binary => "binary",
            ColumnType::Text => "text",
            ColumnType::Ole => "ole",
            ColumnType::Memo => "memo",
            ColumnType::Guid => "guid",
            ColumnType::Numeric => "numeric",
            ColumnType::Complex => "complex",
        }
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let ty = match input.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => ColumnType::Boolean,
            "int8" | "byte" => ColumnType::Int8,
            "int16" | "integer" => ColumnType::Int16,
            "int32" | "long" => ColumnType::Int32,
            "money" | "currency" => ColumnType::Money,
            "float32" | "single" => ColumnType::Float32,
            "float64" | "double" => ColumnType::Float64,
            "datetime" | "date" => ColumnType::DateTime,
            "binary" => ColumnType::Binary,
            "text" => ColumnType::Text,
            "ole" => ColumnType::Ole,
            "memo" => ColumnType::Memo,
            "guid" => ColumnType::Guid,
            "numeric" | "decimal" => ColumnType::Numeric,
            "complex" => ColumnType::Complex,
            other => return Err(format!("unknown column type `{other}`")),
        };
        Ok(ty)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cell of a table.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(PrimitiveDateTime),
    Bytes(Vec<u8>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Bool(_) => "boolean",
            Cell::Int(_) => "integer",
            Cell::Float(_) => "float",
            Cell::Text(_) => "text",
            Cell::DateTime(_) => "datetime",
            Cell::Bytes(_) => "bytes",
        }
    }

    /// Flat text form used by CSV and human-readable output. Null is empty.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Bool(value) => value.to_string(),
            Cell::Int(value) => value.to_string(),
            Cell::Float(value) => format_float(*value),
            Cell::Text(value) => value.clone(),
            Cell::DateTime(value) => format_datetime(*value),
            Cell::Bytes(value) => hex(value),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Null => serde_json::Value::Null,
            Cell::Bool(value) => serde_json::Value::Bool(*value),
            Cell::Int(value) => serde_json::Value::from(*value),
            Cell::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Cell::Text(_) | Cell::DateTime(_) | Cell::Bytes(_) => {
                serde_json::Value::String(self.to_text())
            }
        }
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Int(i64::from(value))
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<PrimitiveDateTime> for Cell {
    fn from(value: PrimitiveDateTime) -> Self {
        Cell::DateTime(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_unit(),
            Cell::Bool(value) => serializer.serialize_bool(*value),
            Cell::Int(value) => serializer.serialize_i64(*value),
            Cell::Float(value) if value.is_finite() => serializer.serialize_f64(*value),
            Cell::Float(_) => serializer.serialize_unit(),
            Cell::Text(value) => serializer.serialize_str(value),
            Cell::DateTime(_) | Cell::Bytes(_) => serializer.serialize_str(&self.to_text()),
        }
    }
}

pub fn format_datetime(value: PrimitiveDateTime) -> String {
    let whole = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let base = value.format(&whole).unwrap_or_else(|_| value.to_string());
    let nanos = value.nanosecond();
    if nanos == 0 {
        return base;
    }
    let fraction = format!("{nanos:09}");
    format!("{base}.{}", fraction.trim_end_matches('0'))
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS`, a space instead of `T`,
/// and an optional fractional second part.
pub fn parse_datetime(input: &str) -> Option<PrimitiveDateTime> {
    let input = input.trim();
    let date_only = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(input, &date_only) {
        return Some(PrimitiveDateTime::new(date, Time::MIDNIGHT));
    }

    let normalized = input.replacen(' ', "T", 1);
    let (whole, fraction) = match normalized.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (normalized.as_str(), None),
    };
    let with_time = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let mut parsed = PrimitiveDateTime::parse(whole, &with_time).ok()?;
    if let Some(fraction) = fraction {
        if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let padded = format!("{fraction:0<9}");
        let nanos: u32 = padded.parse().ok()?;
        parsed = parsed.replace_nanosecond(nanos).ok()?;
    }
    Some(parsed)
}

/// Non-finite values render empty, matching the null they become in JSON and YAML.
pub(crate) fn format_float(value: f64) -> String {
    serde_json::Number::from_f64(value)
        .map(|number| number.to_string())
        .unwrap_or_default()
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
