//! Purpose: Define the stable public Rust API boundary for tabex.
//! Exports: The database handle, export and validation models, and errors.
//! Role: Public, additive-only surface used by the CLI and embedders.
//! Invariants: Callers never need to name engine modules for everyday use.
//! Invariants: Every handle-opening convenience function closes what it opens.

mod database;
mod report;

pub use crate::core::catalog::ColumnDef;
pub use crate::core::cell::{Cell, ColumnType};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::export::{
    CancelToken, ExportFormat, ExportOptions, ExportResult, artifact_path,
};
pub use crate::core::schema::{FieldDef, FieldType, Schema, SchemaRegistry};
pub use crate::core::store::{MemoryStore, RawColumn, RawStore, RawTable};
pub use crate::core::summary::Summary;
pub use crate::core::transpose::Record;
pub use crate::core::validate::TableValidation;
pub use database::{ApiResult, Database, TableInfo, database_summary, list_tables, quick_export};
pub use report::{
    MAX_ISSUES_PER_TABLE, TableReport, ValidationIssue, ValidationReport, ValidationStatus,
};
