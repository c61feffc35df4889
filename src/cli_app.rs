//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{ColoredString, Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use fulfillment_monitor::core::config::Config;
use fulfillment_monitor::core::errors::FmError;
use fulfillment_monitor::logger::jsonl::{JsonlConfig, JsonlWriter, LogEntry};
use fulfillment_monitor::report::aggregate::ProgressRow;
use fulfillment_monitor::report::assemble::{DisplayOptions, Report};
use fulfillment_monitor::report::engine::{ReportEngine, ReportQuery, export_json};
use fulfillment_monitor::report::format::{CellFormatter, format_duration};
use fulfillment_monitor::report::percent::Percent;
use fulfillment_monitor::store::sqlite::SqliteEventStore;

/// Fulfillment monitor: pick/pack progress reports over the warehouse scan log.
#[derive(Debug, Parser)]
#[command(
    name = "fmon",
    author,
    version,
    about = "Fulfillment Monitor - pick/pack progress reports",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (rows and errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Build a progress report for events assigned since a lower bound.
    Report(ReportArgs),
    /// Liveness check; never touches the event store.
    Health,
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ReportArgs {
    /// Lower time bound: YYYY-MM-DD (00:00 UTC) or RFC 3339.
    #[arg(long = "from", value_name = "DATE")]
    from: String,
    /// Mark the report as a sample (passed through to the output).
    #[arg(long)]
    sample: bool,
    /// Font size hint (px) for the renderer.
    #[arg(long, value_name = "PX")]
    font: Option<u32>,
    /// Render timestamps in UTC instead of the local time zone.
    #[arg(long)]
    utc: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include additional build metadata fields.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Report(args) => run_report(cli, args),
        Command::Health => emit_health(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Version(args) => emit_version(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// report
// ---------------------------------------------------------------------------

const REPORT_UNAVAILABLE: &str = "report unavailable: the fulfillment log could not be read";

fn run_report(cli: &Cli, args: &ReportArgs) -> Result<(), CliError> {
    let config =
        Config::load(cli.config.as_deref()).map_err(|e| CliError::Runtime(e.to_string()))?;
    let lower_bound =
        ReportQuery::parse_lower_bound(&args.from).map_err(|e| CliError::User(e.to_string()))?;
    let display = DisplayOptions {
        sample_mode: args.sample,
        font_size: config.display.effective_font_size(args.font),
    };
    let query = ReportQuery::new(lower_bound).with_display(display);

    let started = Instant::now();
    let outcome = SqliteEventStore::open_read_only(&config.paths.sqlite_db).and_then(|store| {
        let _cancel = CancelOnSignal::install(&store);
        let report = ReportEngine::new(&store).generate(&query)?;
        if cli.verbose {
            eprintln!(
                "[FMON-REPORT] {} rows from {}",
                report.row_count,
                store.path().display()
            );
        }
        Ok(report)
    });
    let elapsed = started.elapsed();

    let mut run_log = config
        .logging
        .enabled
        .then(|| JsonlWriter::open(JsonlConfig::from_config(&config)));

    let report = match outcome {
        Ok(report) => {
            if let Some(log) = run_log.as_mut() {
                let mut entry = LogEntry::generated(
                    lower_bound,
                    report.row_count,
                    report.fleet.average_elapsed_ms,
                );
                entry.duration_ms = Some(duration_ms(elapsed));
                entry.sample_mode = Some(args.sample);
                log.write_entry(&entry);
            }
            report
        }
        Err(e) => {
            if let Some(log) = run_log.as_mut() {
                let mut entry = LogEntry::failed(lower_bound, &e);
                entry.duration_ms = Some(duration_ms(elapsed));
                log.write_entry(&entry);
            }
            return Err(report_failure(cli, &e));
        }
    };

    if cli.verbose {
        eprintln!("[FMON-REPORT] finished in {} ms", elapsed.as_millis());
    }

    let cells = CellFormatter::new(config.display.placeholder.as_str());
    match output_mode(cli) {
        OutputMode::Json => {
            let payload = if args.utc {
                export_json(&report, &cells, &Utc)
            } else {
                export_json(&report, &cells, &Local)
            };
            write_json_line(&payload)
        }
        OutputMode::Human => {
            let table = if args.utc {
                render_table(&report, &cells, &Utc)
            } else {
                render_table(&report, &cells, &Local)
            };
            print_report_human(cli, &report, &table)
        }
    }
}

/// SIGINT/SIGTERM interrupt the in-flight store read for as long as this
/// guard lives; the report then fails as cancelled.
struct CancelOnSignal {
    #[cfg(unix)]
    signals: Option<signal_hook::iterator::Handle>,
}

impl CancelOnSignal {
    #[cfg(unix)]
    fn install(store: &SqliteEventStore) -> Self {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(signals) => signals,
            Err(e) => {
                eprintln!("[FMON-SIGNAL] failed to register SIGINT/SIGTERM: {e}");
                return Self { signals: None };
            }
        };
        let handle = signals.handle();
        let interrupt = store.interrupt_handle();
        std::thread::spawn(move || {
            if let Some(signal) = signals.forever().next() {
                eprintln!("[FMON-SIGNAL] signal {signal} received, cancelling report");
                interrupt.interrupt();
            }
        });
        Self {
            signals: Some(handle),
        }
    }

    #[cfg(not(unix))]
    fn install(_store: &SqliteEventStore) -> Self {
        Self {}
    }
}

impl Drop for CancelOnSignal {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(handle) = self.signals.take() {
            handle.close();
        }
    }
}

/// Map an engine failure to a CLI error. Data source details never reach
/// stdout; `-v` echoes them to stderr.
fn report_failure(cli: &Cli, err: &FmError) -> CliError {
    if cli.verbose {
        eprintln!("[FMON-REPORT] {err}");
    }
    if output_mode(cli) == OutputMode::Json {
        let payload = json!({
            "command": "report",
            "ok": false,
            "error_code": err.code(),
            "error": REPORT_UNAVAILABLE,
        });
        if let Err(e) = write_json_line(&payload) {
            return e;
        }
    }
    match err {
        FmError::Cancelled => CliError::Runtime("report cancelled".to_string()),
        e if e.is_data_source() => CliError::Runtime(format!("{REPORT_UNAVAILABLE} [{}]", e.code())),
        e => CliError::Internal(e.to_string()),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn duration_ms(elapsed: std::time::Duration) -> u64 {
    elapsed.as_millis().min(u128::from(u64::MAX)) as u64
}

const HEADERS: [&str; 11] = [
    "Request",
    "Order",
    "Document",
    "Assignee",
    "Items",
    "Scanned",
    "Requested",
    "Progress",
    "Started",
    "Last scan",
    "Elapsed",
];

/// Column index of the progress cell (colored after padding).
const PROGRESS_COLUMN: usize = 7;

/// Cell text for every row, in display order.
struct Table {
    cells: Vec<[String; HEADERS.len()]>,
    progress: Vec<Percent>,
    widths: [usize; HEADERS.len()],
}

fn render_table<Tz>(report: &Report, cells: &CellFormatter, tz: &Tz) -> Table
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let rows: Vec<[String; HEADERS.len()]> = report
        .rows
        .iter()
        .map(|row| row_cells(row, cells, tz))
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    Table {
        cells: rows,
        progress: report.rows.iter().map(|r| r.progress_percent).collect(),
        widths,
    }
}

fn row_cells<Tz>(row: &ProgressRow, cells: &CellFormatter, tz: &Tz) -> [String; HEADERS.len()]
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let local = |ts: &DateTime<Utc>| cells.timestamp(Some(&ts.with_timezone(tz)));
    #[allow(clippy::cast_precision_loss)]
    let elapsed = row.elapsed_ms as f64;
    [
        row.key.request_id.clone(),
        row.key.sales_order_id.clone(),
        format!("{} {}", row.key.document_type, row.key.document_number),
        row.assignee_name.clone(),
        row.distinct_item_count.to_string(),
        cells.integer(Some(row.total_quantity)),
        cells.integer(Some(row.total_quantity_requested)),
        cells.percent(row.progress_percent),
        local(&row.window_start),
        local(&row.window_end),
        format_duration(Some(elapsed)),
    ]
}

fn progress_color(text: &str, progress: Percent) -> ColoredString {
    match progress.value() {
        None => text.dimmed(),
        Some(p) if p >= 100.0 => text.green(),
        Some(p) if p >= 50.0 => text.yellow(),
        Some(_) => text.red(),
    }
}

fn print_report_human(cli: &Cli, report: &Report, table: &Table) -> Result<(), CliError> {
    let mut out = io::stdout().lock();

    if !cli.quiet {
        let mode = if report.display.sample_mode {
            " (sample)"
        } else {
            ""
        };
        writeln!(
            out,
            "{}{mode}",
            format!(
                "Fulfillment progress since {}",
                report.window_start.format("%d/%m/%Y %H:%M")
            )
            .bold()
        )?;
        writeln!(out)?;
    }

    let header: Vec<String> = HEADERS
        .iter()
        .zip(table.widths)
        .map(|(h, w)| format!("{h:<w$}"))
        .collect();
    writeln!(out, "{}", header.join("  ").bold())?;

    for (cells, progress) in table.cells.iter().zip(&table.progress) {
        let line: Vec<String> = cells
            .iter()
            .zip(table.widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                let padded = format!("{cell:<w$}");
                if i == PROGRESS_COLUMN {
                    progress_color(&padded, *progress).to_string()
                } else {
                    padded
                }
            })
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }

    if !cli.quiet {
        writeln!(out)?;
        writeln!(out, "Total: {} requests", report.row_count)?;
        writeln!(
            out,
            "Average completion: {}",
            report.fleet.average_elapsed_formatted
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// health / config / version
// ---------------------------------------------------------------------------

fn emit_health(cli: &Cli) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Human => println!("ok"),
        OutputMode::Json => write_json_line(&json!({ "ok": true }))?,
    }
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())
                .map_err(|e| CliError::Runtime(e.to_string()))?;
            let hash = config
                .stable_hash()
                .map_err(|e| CliError::Runtime(e.to_string()))?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("# hash: {hash}");
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "hash": hash,
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("fmon {version}");
            if args.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "binary": "fmon",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                }
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// output plumbing
// ---------------------------------------------------------------------------

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("FMON_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
