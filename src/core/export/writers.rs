// Format-specific serializers for record tables: JSON, YAML, and CSV.
// All three share the same record model, so scalar meaning is identical across formats.
use std::io::Write;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::core::cell::Cell;
use crate::core::error::{Error, ErrorKind};
use crate::core::export::ExportFormat;
use crate::core::transpose::Record;

/// A transposed (and optionally validated) table ready for serialization.
#[derive(Clone, Debug)]
pub struct TableData {
    pub name: String,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

struct Combined<'a>(&'a [TableData]);

impl Serialize for Combined<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for table in self.0 {
            map.serialize_entry(&table.name, &table.records)?;
        }
        map.end()
    }
}

pub(crate) fn write_table<W: Write>(
    format: ExportFormat,
    out: &mut W,
    table: &TableData,
) -> Result<(), Error> {
    let written = match format {
        ExportFormat::Json => write_json(out, &table.records),
        ExportFormat::Yaml => write_yaml(out, &table.records),
        ExportFormat::Csv => write_csv(out, table),
    };
    written.map_err(|err| err.with_table(&table.name))
}

pub(crate) fn write_combined<W: Write>(
    format: ExportFormat,
    out: &mut W,
    tables: &[TableData],
) -> Result<(), Error> {
    match format {
        ExportFormat::Json => write_json(out, &Combined(tables)),
        ExportFormat::Yaml => write_yaml(out, &Combined(tables)),
        ExportFormat::Csv => Err(Error::new(ErrorKind::Internal)
            .with_message("csv has no combined form; tables are always written separately")),
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<(), Error> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(|err| {
        Error::new(ErrorKind::Write)
            .with_message("failed to write json")
            .with_source(err)
    })?;
    out.write_all(b"\n").map_err(write_error)
}

fn write_yaml<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<(), Error> {
    serde_yaml::to_writer(&mut *out, value).map_err(|err| {
        Error::new(ErrorKind::Write)
            .with_message("failed to write yaml")
            .with_source(err)
    })
}

fn write_csv<W: Write>(out: &mut W, table: &TableData) -> Result<(), Error> {
    let mut writer = csv::Writer::from_writer(&mut *out);
    if !table.columns.is_empty() {
        writer.write_record(&table.columns).map_err(csv_error)?;
    }
    for record in &table.records {
        writer
            .write_record(record.values().iter().map(Cell::to_text))
            .map_err(csv_error)?;
    }
    writer.flush().map_err(write_error)
}

fn csv_error(err: csv::Error) -> Error {
    Error::new(ErrorKind::Write)
        .with_message("failed to write csv")
        .with_source(err)
}

fn write_error(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Write)
        .with_message("failed to write artifact")
        .with_source(err)
}
