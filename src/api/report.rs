//! Purpose: Provide a stable, serializable validation report model.
//! Exports: `ValidationReport`, `TableReport`, `ValidationStatus`, `ValidationIssue`.
//! Role: Shared contract for CLI diagnostics and API users running multi-table validation.
//! Invariants: One `TableReport` per selected table, in catalog order.
//! Invariants: Issue lists are capped per table; `issue_count` always holds the full total.
use serde::Serialize;

use crate::core::error::Error;
use crate::core::validate::TableValidation;

/// Issues kept per table; the rest are only counted.
pub const MAX_ISSUES_PER_TABLE: usize = 50;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Failed,
    NoSchema,
    Error,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStatus::Passed => "passed",
            ValidationStatus::Failed => "failed",
            ValidationStatus::NoSchema => "no_schema",
            ValidationStatus::Error => "error",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub row: usize,
    pub field: String,
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub status: ValidationStatus,
    pub has_schema: bool,
    pub records_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub issues: Vec<ValidationIssue>,
    pub issue_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableReport {
    pub fn from_validation(result: &TableValidation) -> Self {
        let status = if !result.has_schema {
            ValidationStatus::NoSchema
        } else if result.failures.is_empty() {
            ValidationStatus::Passed
        } else {
            ValidationStatus::Failed
        };
        let mut issues = Vec::new();
        let mut issue_count = 0usize;
        for failure in &result.failures {
            for issue in &failure.issues {
                issue_count += 1;
                if issues.len() < MAX_ISSUES_PER_TABLE {
                    issues.push(ValidationIssue {
                        row: failure.row,
                        field: issue.field.clone(),
                        code: issue.code.to_string(),
                        message: issue.reason.clone(),
                    });
                }
            }
        }
        Self {
            table: result.table.clone(),
            status,
            has_schema: result.has_schema,
            records_checked: result.records_checked(),
            passed: result.passed,
            failed: result.failures.len(),
            issues,
            issue_count,
            error: None,
        }
    }

    /// Table that could not be read; the error text stands in for its rows.
    pub fn errored(table: impl Into<String>, has_schema: bool, err: &Error) -> Self {
        Self {
            table: table.into(),
            status: ValidationStatus::Error,
            has_schema,
            records_checked: 0,
            passed: 0,
            failed: 0,
            issues: Vec::new(),
            issue_count: 0,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ValidationReport {
    pub database: String,
    pub tables: Vec<TableReport>,
}

impl ValidationReport {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: Vec::new(),
        }
    }

    pub fn push(&mut self, table: TableReport) {
        self.tables.push(table);
    }

    pub fn count(&self, status: ValidationStatus) -> usize {
        self.tables
            .iter()
            .filter(|table| table.status == status)
            .count()
    }

    /// True when no table failed validation or errored.
    pub fn is_clean(&self) -> bool {
        self.tables.iter().all(|table| {
            matches!(
                table.status,
                ValidationStatus::Passed | ValidationStatus::NoSchema
            )
        })
    }

    pub fn total_records(&self) -> usize {
        self.tables.iter().map(|table| table.records_checked).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{TableReport, ValidationReport, ValidationStatus, MAX_ISSUES_PER_TABLE};
    use crate::core::error::{Error, ErrorKind};
    use crate::core::validate::{FieldIssue, RowFailure, TableValidation};

    fn validation(has_schema: bool, failing_rows: usize) -> TableValidation {
        TableValidation {
            table: "Zones".to_string(),
            has_schema,
            records: Vec::new(),
            passed: 0,
            failures: (0..failing_rows)
                .map(|row| RowFailure {
                    row,
                    issues: vec![FieldIssue {
                        field: "Zone_ID".to_string(),
                        code: "null",
                        reason: "required field is null".to_string(),
                    }],
                })
                .collect(),
        }
    }

    #[test]
    fn status_reflects_schema_and_failures() {
        assert_eq!(
            TableReport::from_validation(&validation(false, 0)).status,
            ValidationStatus::NoSchema
        );
        assert_eq!(
            TableReport::from_validation(&validation(true, 0)).status,
            ValidationStatus::Passed
        );
        let failed = TableReport::from_validation(&validation(true, 2));
        assert_eq!(failed.status, ValidationStatus::Failed);
        assert_eq!(failed.failed, 2);
        assert_eq!(failed.issues[1].row, 1);
    }

    #[test]
    fn issue_list_is_capped_but_counted() {
        let report = TableReport::from_validation(&validation(true, MAX_ISSUES_PER_TABLE + 7));
        assert_eq!(report.issues.len(), MAX_ISSUES_PER_TABLE);
        assert_eq!(report.issue_count, MAX_ISSUES_PER_TABLE + 7);
    }

    #[test]
    fn errored_tables_make_report_unclean() {
        let mut report = ValidationReport::new("db");
        report.push(TableReport::from_validation(&validation(false, 0)));
        assert!(report.is_clean());

        let err = Error::new(ErrorKind::Integrity).with_message("column length mismatch");
        report.push(TableReport::errored("Broken", true, &err));
        assert!(!report.is_clean());
        assert_eq!(report.count(ValidationStatus::Error), 1);
        assert_eq!(report.count(ValidationStatus::NoSchema), 1);
        assert!(report.tables[1].error.as_deref().is_some_and(|text| text.contains("mismatch")));
    }
}
