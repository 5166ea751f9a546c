// Record validation against table schemas: field lookup, type coercion, and per-table rollups.
// A failing record never stops the table; failures are collected with their row index.
use crate::core::cell::{Cell, parse_datetime};
use crate::core::schema::{FieldType, Schema};
use crate::core::transpose::Record;

/// Validation capability looked up by table name.
pub trait Validator {
    fn validate(&self, record: Record) -> ValidationOutcome;

    fn has_schema(&self) -> bool;
}

/// Accepts every record untouched; used for tables without a schema.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(&self, record: Record) -> ValidationOutcome {
        ValidationOutcome::Unchecked(record)
    }

    fn has_schema(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldIssue {
    pub field: String,
    pub code: &'static str,
    pub reason: String,
}

impl FieldIssue {
    fn new(field: &str, code: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            code,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValidationOutcome {
    /// Schema applied; fields coerced to their declared types.
    Passed(Record),
    /// No schema registered; record returned unchanged.
    Unchecked(Record),
    /// Schema applied and at least one field failed. Carries the raw record.
    Failed { record: Record, issues: Vec<FieldIssue> },
}

impl ValidationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ValidationOutcome::Failed { .. })
    }

    pub fn into_record(self) -> Record {
        match self {
            ValidationOutcome::Passed(record)
            | ValidationOutcome::Unchecked(record)
            | ValidationOutcome::Failed { record, .. } => record,
        }
    }
}

impl Validator for Schema {
    fn validate(&self, record: Record) -> ValidationOutcome {
        let mut coerced = record.clone();
        let mut issues = Vec::new();

        for field in self.fields() {
            match record.get(&field.name) {
                None if field.required => {
                    issues.push(FieldIssue::new(&field.name, "missing", "required field is missing"));
                }
                Some(Cell::Null) if field.required => {
                    issues.push(FieldIssue::new(&field.name, "null", "required field is null"));
                }
                None | Some(Cell::Null) => {}
                Some(value) => match coerce(value, field.field_type) {
                    Ok(cell) => {
                        coerced.set(&field.name, cell);
                    }
                    Err(reason) => issues.push(FieldIssue::new(&field.name, "type", reason)),
                },
            }
        }

        if issues.is_empty() {
            ValidationOutcome::Passed(coerced)
        } else {
            ValidationOutcome::Failed { record, issues }
        }
    }

    fn has_schema(&self) -> bool {
        true
    }
}

pub fn coerce(value: &Cell, target: FieldType) -> Result<Cell, String> {
    let fail = || format!("cannot read {} value as {target}", value.type_name());
    match target {
        FieldType::Integer => match value {
            Cell::Int(number) => Ok(Cell::Int(*number)),
            Cell::Float(number)
                if number.fract() == 0.0 && number.abs() < i64::MAX as f64 =>
            {
                Ok(Cell::Int(*number as i64))
            }
            Cell::Bool(flag) => Ok(Cell::Int(i64::from(*flag))),
            Cell::Text(text) => text.trim().parse::<i64>().map(Cell::Int).map_err(|_| fail()),
            _ => Err(fail()),
        },
        FieldType::Float => match value {
            Cell::Int(number) => Ok(Cell::Float(*number as f64)),
            Cell::Float(number) => Ok(Cell::Float(*number)),
            Cell::Text(text) => text.trim().parse::<f64>().map(Cell::Float).map_err(|_| fail()),
            _ => Err(fail()),
        },
        FieldType::Boolean => match value {
            Cell::Bool(flag) => Ok(Cell::Bool(*flag)),
            Cell::Int(0) => Ok(Cell::Bool(false)),
            Cell::Int(1) => Ok(Cell::Bool(true)),
            Cell::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Cell::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Cell::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        FieldType::Text => match value {
            Cell::Text(text) => Ok(Cell::Text(text.clone())),
            _ => Err(fail()),
        },
        FieldType::DateTime => match value {
            Cell::DateTime(at) => Ok(Cell::DateTime(*at)),
            Cell::Text(text) => parse_datetime(text).map(Cell::DateTime).ok_or_else(fail),
            _ => Err(fail()),
        },
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RowFailure {
    pub row: usize,
    pub issues: Vec<FieldIssue>,
}

/// Result of running one table's records through its validator.
#[derive(Clone, Debug, PartialEq)]
pub struct TableValidation {
    pub table: String,
    pub has_schema: bool,
    pub records: Vec<Record>,
    pub passed: usize,
    pub failures: Vec<RowFailure>,
}

impl TableValidation {
    pub fn records_checked(&self) -> usize {
        self.records.len()
    }
}

/// Failed records are kept in raw form so the output never loses rows.
pub fn validate_records(
    table: &str,
    validator: &dyn Validator,
    records: Vec<Record>,
) -> TableValidation {
    let has_schema = validator.has_schema();
    let mut output = Vec::with_capacity(records.len());
    let mut passed = 0usize;
    let mut failures = Vec::new();

    for (row, record) in records.into_iter().enumerate() {
        match validator.validate(record) {
            ValidationOutcome::Passed(record) => {
                passed += 1;
                output.push(record);
            }
            ValidationOutcome::Unchecked(record) => output.push(record),
            ValidationOutcome::Failed { record, issues } => {
                failures.push(RowFailure { row, issues });
                output.push(record);
            }
        }
    }

    if !failures.is_empty() {
        tracing::warn!(
            table,
            failed = failures.len(),
            checked = output.len(),
            "records failed validation"
        );
        for failure in failures.iter().take(5) {
            for issue in &failure.issues {
                tracing::warn!(
                    table,
                    row = failure.row,
                    field = %issue.field,
                    reason = %issue.reason,
                    "validation issue"
                );
            }
        }
    }

    TableValidation {
        table: table.to_string(),
        has_schema,
        records: output,
        passed,
        failures,
    }
}
