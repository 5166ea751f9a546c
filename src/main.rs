//! Purpose: `tabex` CLI entry point: parse args, open the database, dispatch commands.
//! Role: Binary crate root; emits JSON on stdout when piped, tables on a terminal.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Every opened database is closed before the process exits.
//! Invariants: Logs and notices go to stderr; stdout carries only command output.
#![allow(clippy::result_large_err)]

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod color_json;
mod command_dispatch;
mod table_info_json;

use color_json::colorize_json;
use tabex::api::{Database, Error, ErrorKind, to_exit_code};
use tabex::config::{load_registry, resolve_db_path};
use tabex::notice::{Notice, notice_json};

/// Exit code used when an export stops on SIGINT.
const EXIT_CANCELLED: i32 = 130;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint(clap_error_hint(&err)),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    let context = Context {
        db: cli.db,
        schemas: cli.schemas,
        builtin_schemas: !cli.no_builtin_schemas,
        color_mode,
    };

    command_dispatch::dispatch_command(cli.command, &context)
        .map_err(add_load_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "tabex",
    version,
    about = "Inspect, validate, and export tables of legacy database snapshots",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Reads a column-major snapshot of a legacy desktop database.

Mental model:
  - `tables` / `inspect` look at what is inside
  - `validate` checks rows against per-table schemas
  - `export` writes tables as JSON, YAML, or CSV
"#,
    after_help = r#"EXAMPLES
  $ tabex --db lighting.json info
  $ tabex --db lighting.json tables --pattern 'Phys_*'
  $ tabex --db lighting.json inspect GenisysZones --limit 5
  $ tabex --db lighting.json export out/lighting.yaml --format yaml --table 'GeniSys*'
  $ TABEX_DB=lighting.json tabex validate --summary

LEARN MORE
  $ tabex <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Database snapshot to read (default: $TABEX_DB)",
        value_hint = ValueHint::FilePath
    )]
    db: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "JSON schema file; entries replace built-in schemas for the same table",
        value_hint = ValueHint::FilePath
    )]
    schemas: Option<PathBuf>,
    #[arg(long, global = true, help = "Do not load the built-in lighting-control schemas")]
    no_builtin_schemas: bool,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Global options shared by every database command.
struct Context {
    db: Option<PathBuf>,
    schemas: Option<PathBuf>,
    builtin_schemas: bool,
    color_mode: ColorMode,
}

impl Context {
    /// Opens the database, runs `f`, and closes it on every path.
    fn with_database<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&Database) -> Result<T, Error>,
    {
        let path = resolve_db_path(self.db.as_deref())?;
        let registry = load_registry(self.schemas.as_deref(), self.builtin_schemas)?;
        let database = Database::open(&path)?.with_schemas(registry);
        let result = f(&database);
        let closed = database.close();
        let value = result?;
        closed?;
        Ok(value)
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Summarize the database",
        long_about = r#"Show table counts, row totals, and schema coverage."#,
        after_help = r#"EXAMPLES
  $ tabex --db lighting.json info
  $ tabex --db lighting.json info --verbose"#
    )]
    Info {
        #[arg(short, long, help = "Also list every table with its row and column counts")]
        verbose: bool,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "List tables",
        after_help = r#"EXAMPLES
  $ tabex --db lighting.json tables
  $ tabex --db lighting.json tables --pattern 'GeniSys*' --info

NOTES
  - Patterns are case-sensitive; `*` matches any run of characters"#
    )]
    Tables {
        #[arg(short, long, help = "Only list tables matching this name or glob")]
        pattern: Option<String>,
        #[arg(short, long, help = "Include row count, column count, and schema presence")]
        info: bool,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Show a table's columns and first records",
        after_help = r#"EXAMPLES
  $ tabex --db lighting.json inspect GenisysZones
  $ tabex --db lighting.json inspect Phys_Dimmers --validate --limit 20"#
    )]
    Inspect {
        #[arg(help = "Table name (exact, case-sensitive)")]
        table: String,
        #[arg(long, help = "Validate records against the table's schema")]
        validate: bool,
        #[arg(short = 'n', long, default_value_t = 10, help = "Number of records to show")]
        limit: usize,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Export tables to JSON, YAML, or CSV",
        long_about = r#"Export selected tables to one combined file or one file per table.

Separate files are named <dir>/<stem>_<table><ext> from OUTPUT.
CSV cannot hold several tables in one file, so it is always written per table."#,
        after_help = r#"EXAMPLES
  $ tabex --db lighting.json export out/lighting.json
  $ tabex --db lighting.json export out/lighting.csv --format csv --table 'Phys_*'
  $ tabex --db lighting.json export out/db.yaml --format yaml --separate --validate

NOTES
  - Exits nonzero when any table failed; the others are still written
  - Ctrl-C stops between tables; already written files are kept"#
    )]
    Export {
        #[arg(help = "Output file (or base name for per-table files)", value_hint = ValueHint::FilePath)]
        output: PathBuf,
        #[arg(short, long, default_value = "json", help = "Output format: json|yaml|csv")]
        format: String,
        #[arg(short, long, help = "Table name or glob to export (repeatable; default: all)")]
        table: Vec<String>,
        #[arg(long, help = "Write one file per table")]
        separate: bool,
        #[arg(long, help = "Validate and coerce records before writing")]
        validate: bool,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "Validate tables against their schemas",
        after_help = r#"EXAMPLES
  $ tabex --db lighting.json validate
  $ tabex --db lighting.json validate --table Phys_Dimmers --table 'Area*'
  $ tabex --db lighting.json validate --summary --json

NOTES
  - Tables without a schema are reported as no_schema, not as failures
  - Exits nonzero when any table failed or could not be read"#
    )]
    Validate {
        #[arg(short, long, help = "Table name or glob to validate (repeatable; default: all)")]
        table: Vec<String>,
        #[arg(long, help = "Only print per-table counts, not individual issues")]
        summary: bool,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "Print version info",
        long_about = r#"Print version info (JSON when stdout is not a terminal)."#,
        after_help = r#"EXAMPLES
  $ tabex version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout."#,
        after_help = r#"EXAMPLES
  $ tabex completion bash > ~/.local/share/bash-completion/completions/tabex
  $ tabex completion zsh > ~/.zfunc/_tabex
  $ tabex completion fish > ~/.config/fish/completions/tabex.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn wants_json(json: bool) -> bool {
    json || !io::stdout().is_terminal()
}

fn add_load_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Load || err.hint().is_some() {
        return err;
    }
    err.with_hint("The file is not a readable tabex snapshot. Re-export it from the source database.")
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Busy => {
            err.with_hint("Database file is locked by another process. Retry once it finishes.")
        }
        ErrorKind::Write => {
            err.with_hint("Check that the output directory exists or can be created and is writable.")
        }
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_LOG=debug and share command/context if it persists.",
    )
}

fn emit_version_output(color_mode: ColorMode) {
    if io::stdout().is_terminal() {
        println!("tabex {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(
            json!({
                "name": "tabex",
                "version": env!("CARGO_PKG_VERSION"),
            }),
            color_mode,
        );
    }
}

fn emit_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", render_table(headers, rows));
}

/// Left-aligned columns separated by two spaces; newlines in cells are escaped.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let header_row: Vec<String> = headers.iter().map(|header| header.to_string()).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            (0..headers.len())
                .map(|idx| sanitize_table_cell(row.get(idx).map(String::as_str).unwrap_or("")))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header_row.iter().map(|cell| cell.chars().count()).collect();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    std::iter::once(&header_row)
        .chain(body.iter())
        .map(|row| format_table_line(row, &widths))
        .collect::<Vec<_>>()
        .join("\n")
}

fn sanitize_table_cell(value: &str) -> String {
    value.replace('\n', "\\n").replace('\r', "\\r")
}

fn format_table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        // The last column is not padded so lines carry no trailing spaces.
        if idx + 1 < widths.len() {
            let len = cell.chars().count();
            line.push_str(&" ".repeat(width.saturating_sub(len)));
        }
    }
    line
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let use_color = color_mode.use_color(is_tty);
    let json = if is_tty || use_color {
        colorize_json(&value, use_color)
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
    Green,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
        AnsiColor::Green => "32",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn notice_time_now() -> String {
    use time::format_description::well_known::Rfc3339;
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn notice(kind: &str, cmd: &str, database: &Database, message: impl Into<String>) -> Notice {
    Notice::new(kind, cmd, database.label(), message, notice_time_now())
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {}", notice.message);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Load => "database could not be loaded".to_string(),
        ErrorKind::Integrity => "table data is inconsistent".to_string(),
        ErrorKind::Validation => "validation failed".to_string(),
        ErrorKind::InvalidPattern => "invalid table pattern".to_string(),
        ErrorKind::Write => "output could not be written".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Busy => "database is busy".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(table) = err.table() {
        inner.insert("table".to_string(), json!(table));
    }
    if let Some(row) = err.row() {
        inner.insert("row".to_string(), json!(row));
    }
    if let Some(field) = err.field() {
        inner.insert("field".to_string(), json!(field));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    let label = |name: &str| colorize_label(name, use_color, AnsiColor::Yellow);

    if let Some(hint) = err.hint() {
        lines.push(format!("{} {hint}", label("hint:")));
    }
    if let Some(table) = err.table() {
        lines.push(format!("{} {table}", label("table:")));
    }
    if let Some(row) = err.row() {
        lines.push(format!("{} {row}", label("row:")));
    }
    if let Some(field) = err.field() {
        lines.push(format!("{} {field}", label("field:")));
    }
    if let Some(path) = err.path() {
        lines.push(format!("{} {}", label("path:"), path.display()));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("{} {cause}", label("caused by:")));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);
    let Some(usage) = usage else {
        return "Try `tabex --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|token| *token == "tabex") else {
        return "Try `tabex --help`.".to_string();
    };
    let parts: Vec<&str> = tokens
        .iter()
        .skip(pos + 1)
        .take_while(|token| !token.starts_with(['-', '<', '[']))
        .copied()
        .collect();

    if parts.is_empty() {
        "Try `tabex --help`.".to_string()
    } else {
        format!("Try `tabex {} --help`.", parts.join(" "))
    }
}
