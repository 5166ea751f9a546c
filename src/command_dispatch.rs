//! Purpose: Hold top-level CLI command dispatch for `tabex`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each database command runs inside `Context::with_database`.
//! Invariants: Partial export success and validation failures map to nonzero exit codes.

use super::*;

use std::sync::Arc;

use tabex::api::{
    CancelToken, Cell, ExportFormat, ExportOptions, ExportResult, Record, TableValidation,
    ValidationReport, ValidationStatus,
};
use super::table_info_json::{
    export_result_json, export_status, records_json, summary_json, table_error_json,
    table_info_json, validation_report_json,
};

pub(super) fn dispatch_command(command: Command, context: &Context) -> Result<RunOutcome, Error> {
    let color_mode = context.color_mode;
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "tabex", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output(color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Info { verbose, json } => context.with_database(|db| {
            let summary = db.summary()?;
            if wants_json(json) {
                let mut value = json!({ "summary": summary_json(&summary) });
                if verbose {
                    value["tables"] = Value::Array(table_rows_json(db, &db.list_tables()?));
                }
                emit_json(value, color_mode);
            } else {
                emit_summary_human(&summary);
                if verbose {
                    println!();
                    emit_table_info_human(db, &db.list_tables()?);
                }
            }
            Ok(RunOutcome::ok())
        }),
        Command::Tables {
            pattern,
            info,
            json,
        } => context.with_database(|db| {
            let names = match &pattern {
                Some(pattern) => {
                    let patterns = std::slice::from_ref(pattern);
                    emit_unmatched_notice(db, "tables", patterns, color_mode)?;
                    db.select_tables(patterns)?
                }
                None => db.list_tables()?,
            };
            if wants_json(json) {
                let tables = if info {
                    table_rows_json(db, &names)
                } else {
                    names.iter().map(|name| json!(name)).collect()
                };
                emit_json(json!({ "tables": tables }), color_mode);
            } else if info {
                emit_table_info_human(db, &names);
            } else {
                for name in &names {
                    println!("{name}");
                }
            }
            Ok(RunOutcome::ok())
        }),
        Command::Inspect {
            table,
            validate,
            limit,
            json,
        } => context.with_database(|db| {
            let info = db.table_info(&table)?;
            let (records, validation) = if validate {
                let result = db.validate_table(&table)?;
                let records = result.records.iter().take(limit).cloned().collect::<Vec<_>>();
                (records, Some(result))
            } else {
                let mut records = db.get_table(&table, false)?;
                records.truncate(limit);
                (records, None)
            };

            if wants_json(json) {
                let mut value = json!({
                    "table": table_info_json(&info),
                    "records": records_json(&records),
                });
                if let Some(result) = &validation {
                    value["validation"] = inspect_validation_json(result);
                }
                emit_json(value, color_mode);
            } else {
                emit_inspect_human(&info, &records, validation.as_ref());
            }

            let failed = validation
                .as_ref()
                .is_some_and(|result| !result.failures.is_empty());
            Ok(if failed {
                RunOutcome::with_code(to_exit_code(ErrorKind::Validation))
            } else {
                RunOutcome::ok()
            })
        }),
        Command::Export {
            output,
            format,
            table,
            separate,
            validate,
            json,
        } => {
            let format: ExportFormat = format.parse()?;
            let cancel = CancelToken::new();
            install_cancel_handler(&cancel)?;
            let options = ExportOptions::new(format)
                .with_tables(table.iter().cloned())
                .with_separate_files(separate)
                .with_validation(validate)
                .with_cancel(cancel);

            context.with_database(|db| {
                emit_unmatched_notice(db, "export", &options.tables, color_mode)?;
                let result = db.export(&output, &options)?;
                emit_export_notices(db, &result, color_mode);
                if wants_json(json) {
                    emit_json(json!({ "export": export_result_json(&result) }), color_mode);
                } else {
                    emit_export_human(&result, color_mode);
                }
                Ok(export_outcome(&result))
            })
        }
        Command::Validate {
            table,
            summary,
            json,
        } => context.with_database(|db| {
            emit_unmatched_notice(db, "validate", &table, color_mode)?;
            let report = db.validate_tables(&table)?;
            if wants_json(json) {
                emit_json(
                    json!({ "validation": validation_report_json(&report, summary) }),
                    color_mode,
                );
            } else {
                emit_validation_human(&report, summary, color_mode);
            }
            Ok(if report.is_clean() {
                RunOutcome::ok()
            } else {
                RunOutcome::with_code(to_exit_code(ErrorKind::Validation))
            })
        }),
    }
}

/// First SIGINT sets the token; a second one exits immediately.
fn install_cancel_handler(token: &CancelToken) -> Result<(), Error> {
    use signal_hook::consts::SIGINT;

    let flag = token.flag();
    let register = |result: io::Result<signal_hook::SigId>| {
        result.map(|_| ()).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to install interrupt handler")
                .with_source(err)
        })
    };
    register(signal_hook::flag::register_conditional_shutdown(
        SIGINT,
        EXIT_CANCELLED,
        Arc::clone(&flag),
    ))?;
    register(signal_hook::flag::register(SIGINT, flag))
}

fn export_outcome(result: &ExportResult) -> RunOutcome {
    if result.cancelled {
        return RunOutcome::with_code(EXIT_CANCELLED);
    }
    match result.first_error() {
        Some(err) => RunOutcome::with_code(to_exit_code(err.kind())),
        None => RunOutcome::ok(),
    }
}

fn emit_unmatched_notice(
    db: &Database,
    cmd: &str,
    patterns: &[String],
    color_mode: ColorMode,
) -> Result<(), Error> {
    db.select_tables(patterns)?;
    let unmatched = db.unmatched_patterns(patterns)?;
    if unmatched.is_empty() {
        return Ok(());
    }
    let message = format!("no tables match: {}", unmatched.join(", "));
    tracing::warn!(patterns = ?unmatched, "table patterns matched nothing");
    let notice = notice("unmatched_pattern", cmd, db, message).with_detail("patterns", unmatched);
    emit_notice(&notice, color_mode);
    Ok(())
}

fn emit_export_notices(db: &Database, result: &ExportResult, color_mode: ColorMode) {
    if result.forced_separate_files {
        let notice = notice(
            "forced_separate_files",
            "export",
            db,
            "csv has no combined form; wrote one file per table",
        )
        .with_detail("format", result.format.as_str());
        emit_notice(&notice, color_mode);
    }
    if result.cancelled {
        let notice = notice(
            "cancelled",
            "export",
            db,
            format!(
                "export interrupted after {} table(s)",
                result.tables_exported
            ),
        )
        .with_detail("tables_exported", result.tables_exported);
        emit_notice(&notice, color_mode);
    }
}

fn table_rows_json(db: &Database, names: &[String]) -> Vec<Value> {
    names
        .iter()
        .map(|name| match db.table_info(name) {
            Ok(info) => table_info_json(&info),
            Err(err) => json!({ "name": name, "error": table_error_json(&err) }),
        })
        .collect()
}

fn inspect_validation_json(result: &TableValidation) -> Value {
    let issues = result
        .failures
        .iter()
        .flat_map(|failure| {
            failure.issues.iter().map(move |issue| {
                json!({
                    "row": failure.row,
                    "field": issue.field,
                    "code": issue.code,
                    "message": issue.reason,
                })
            })
        })
        .collect::<Vec<_>>();
    json!({
        "has_schema": result.has_schema,
        "records_checked": result.records_checked(),
        "passed": result.passed,
        "failed": result.failures.len(),
        "issues": issues,
    })
}

fn emit_summary_human(summary: &tabex::api::Summary) {
    println!("Database: {}", summary.file_path);
    println!(
        "Tables:   {} ({} with data)",
        summary.total_tables, summary.tables_with_data
    );
    println!("Rows:     {}", summary.total_rows);
    println!(
        "Schemas:  {}/{} tables ({:.1}% coverage)",
        summary.tables_with_schema,
        summary.total_tables,
        summary.model_coverage * 100.0
    );
    if !summary.unreadable_tables.is_empty() {
        println!("Unreadable: {}", summary.unreadable_tables.join(", "));
    }
}

fn emit_table_info_human(db: &Database, names: &[String]) {
    let rows = names
        .iter()
        .map(|name| match db.table_info(name) {
            Ok(info) => vec![
                info.name,
                info.row_count.to_string(),
                info.column_count.to_string(),
                yes_no(info.has_schema),
            ],
            Err(err) => vec![
                name.clone(),
                "-".to_string(),
                "-".to_string(),
                format!("error: {}", error_message(&err)),
            ],
        })
        .collect::<Vec<_>>();
    emit_table(&["TABLE", "ROWS", "COLUMNS", "SCHEMA"], &rows);
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "yes" } else { "no" };
    text.to_string()
}

fn emit_inspect_human(
    info: &tabex::api::TableInfo,
    records: &[Record],
    validation: Option<&TableValidation>,
) {
    println!("Table:   {}", info.name);
    println!("Rows:    {}", info.row_count);
    println!("Schema:  {}", yes_no(info.has_schema));
    println!();
    let columns = info
        .columns
        .iter()
        .map(|column| vec![column.name.clone(), column.column_type.to_string()])
        .collect::<Vec<_>>();
    emit_table(&["COLUMN", "TYPE"], &columns);

    if !records.is_empty() {
        println!();
        let headers = info.column_names();
        let headers = headers.iter().map(String::as_str).collect::<Vec<_>>();
        let rows = records
            .iter()
            .map(|record| record.values().iter().map(Cell::to_text).collect())
            .collect::<Vec<Vec<String>>>();
        emit_table(&headers, &rows);
        if records.len() < info.row_count {
            println!("({} of {} rows)", records.len(), info.row_count);
        }
    }

    if let Some(result) = validation {
        println!();
        if !result.has_schema {
            println!("Validation: no schema for this table");
            return;
        }
        println!(
            "Validation: {} passed, {} failed of {}",
            result.passed,
            result.failures.len(),
            result.records_checked()
        );
        for failure in result.failures.iter().take(5) {
            for issue in &failure.issues {
                println!("  row {}: {}: {}", failure.row, issue.field, issue.reason);
            }
        }
    }
}

fn emit_export_human(result: &ExportResult, color_mode: ColorMode) {
    let use_color = color_mode.use_color(io::stdout().is_terminal());
    let status = export_status(result);
    let color = match status {
        "complete" => AnsiColor::Green,
        "partial" => AnsiColor::Yellow,
        _ => AnsiColor::Red,
    };
    println!(
        "{} exported {} table(s) as {}",
        colorize_label(&format!("{status}:"), use_color, color),
        result.tables_exported,
        result.format
    );
    for path in &result.output_paths {
        println!("  wrote {}", path.display());
    }
    for (table, count) in &result.validation_failures {
        println!("  {table}: {count} record(s) failed validation (kept as read)");
    }
    for (table, err) in &result.errors {
        println!(
            "  {} {table}: {}",
            colorize_label("failed", use_color, AnsiColor::Red),
            error_message(err)
        );
    }
}

fn emit_validation_human(report: &ValidationReport, summary_only: bool, color_mode: ColorMode) {
    let use_color = color_mode.use_color(io::stdout().is_terminal());
    let rows = report
        .tables
        .iter()
        .map(|table| {
            vec![
                table.table.clone(),
                table.status.as_str().to_string(),
                table.records_checked.to_string(),
                table.passed.to_string(),
                table.failed.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    emit_table(&["TABLE", "STATUS", "CHECKED", "PASSED", "FAILED"], &rows);

    if !summary_only {
        for table in &report.tables {
            if let Some(error) = &table.error {
                println!(
                    "\n{} {}: {error}",
                    colorize_label("error", use_color, AnsiColor::Red),
                    table.table
                );
                continue;
            }
            if table.status != ValidationStatus::Failed {
                continue;
            }
            println!("\n{}:", table.table);
            for issue in &table.issues {
                println!("  row {}: {}: {}", issue.row, issue.field, issue.message);
            }
            if table.issue_count > table.issues.len() {
                println!(
                    "  ... {} more issue(s)",
                    table.issue_count - table.issues.len()
                );
            }
        }
    }

    println!(
        "\n{} passed, {} failed, {} without schema, {} unreadable",
        report.count(ValidationStatus::Passed),
        report.count(ValidationStatus::Failed),
        report.count(ValidationStatus::NoSchema),
        report.count(ValidationStatus::Error)
    );
}
