//! Purpose: Shared JSON envelopes for table metadata, summaries, exports, and validation.
//! Exports: `table_info_json`, `summary_json`, `export_result_json`, `validation_report_json`, `records_json`.
//! Role: Keep machine-readable CLI payload shapes in one place.
//! Invariants: Stable key names/order; fields are additive-only.
//! Invariants: Per-table errors carry kind, message, and table context like top-level errors.

use serde_json::{Map, Value, json};
use tabex::api::{
    Error, ExportResult, Record, Summary, TableInfo, ValidationReport, ValidationStatus,
};

pub(crate) fn table_info_json(info: &TableInfo) -> Value {
    let columns = info
        .columns
        .iter()
        .map(|column| json!({"name": column.name, "type": column.column_type.as_str()}))
        .collect::<Vec<_>>();
    let mut map = Map::new();
    map.insert("name".to_string(), json!(info.name));
    map.insert("columns".to_string(), Value::Array(columns));
    map.insert("column_count".to_string(), json!(info.column_count));
    map.insert("row_count".to_string(), json!(info.row_count));
    map.insert("has_schema".to_string(), json!(info.has_schema));
    Value::Object(map)
}

pub(crate) fn summary_json(summary: &Summary) -> Value {
    json!({
        "file_path": summary.file_path,
        "total_tables": summary.total_tables,
        "tables_with_data": summary.tables_with_data,
        "tables_with_schema": summary.tables_with_schema,
        "total_rows": summary.total_rows,
        "model_coverage": summary.model_coverage,
        "unreadable_tables": summary.unreadable_tables,
    })
}

pub(crate) fn records_json(records: &[Record]) -> Value {
    Value::Array(records.iter().map(Record::to_json).collect())
}

pub(crate) fn table_error_json(err: &Error) -> Value {
    let mut map = Map::new();
    map.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    map.insert(
        "message".to_string(),
        json!(err.message().unwrap_or(err.kind().as_str())),
    );
    if let Some(field) = err.field() {
        map.insert("field".to_string(), json!(field));
    }
    if let Some(row) = err.row() {
        map.insert("row".to_string(), json!(row));
    }
    if let Some(path) = err.path() {
        map.insert("path".to_string(), json!(path.display().to_string()));
    }
    Value::Object(map)
}

pub(crate) fn export_status(result: &ExportResult) -> &'static str {
    if result.cancelled {
        "cancelled"
    } else if result.errors.is_empty() {
        "complete"
    } else {
        "partial"
    }
}

pub(crate) fn export_result_json(result: &ExportResult) -> Value {
    let errors = result
        .errors
        .iter()
        .map(|(table, err)| (table.clone(), table_error_json(err)))
        .collect::<Map<_, _>>();
    let paths = result
        .output_paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>();

    let mut map = Map::new();
    map.insert("status".to_string(), json!(export_status(result)));
    map.insert("format".to_string(), json!(result.format.as_str()));
    map.insert("tables_exported".to_string(), json!(result.tables_exported));
    map.insert("tables".to_string(), json!(result.table_names));
    map.insert("output_paths".to_string(), json!(paths));
    map.insert(
        "forced_separate_files".to_string(),
        json!(result.forced_separate_files),
    );
    if !result.validation_failures.is_empty() {
        map.insert(
            "validation_failures".to_string(),
            json!(result.validation_failures),
        );
    }
    map.insert("errors".to_string(), Value::Object(errors));
    map.insert("cancelled".to_string(), json!(result.cancelled));
    Value::Object(map)
}

pub(crate) fn validation_report_json(report: &ValidationReport, summary_only: bool) -> Value {
    let tables = report
        .tables
        .iter()
        .map(|table| {
            let mut value = serde_json::to_value(table).unwrap_or(Value::Null);
            if summary_only {
                if let Some(obj) = value.as_object_mut() {
                    obj.remove("issues");
                }
            }
            value
        })
        .collect::<Vec<_>>();
    json!({
        "database": report.database,
        "clean": report.is_clean(),
        "counts": {
            "passed": report.count(ValidationStatus::Passed),
            "failed": report.count(ValidationStatus::Failed),
            "no_schema": report.count(ValidationStatus::NoSchema),
            "error": report.count(ValidationStatus::Error),
        },
        "total_records": report.total_records(),
        "tables": tables,
    })
}
