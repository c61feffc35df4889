#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, TimeZone, Utc};
use fulfillment_monitor::store::events::{DocumentType, FulfillmentEvent};
use fulfillment_monitor::store::sqlite::SqliteEventStore;

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_fmon") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "fmon.exe" } else { "fmon" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve fmon binary path for integration test"),
    }
}

/// Run the binary with `args`; the run log goes to `work_dir` so no test
/// touches the real home directory.
pub fn run_cli_case(case_name: &str, work_dir: &Path, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, work_dir, args, &[])
}

pub fn run_cli_case_with_env(
    case_name: &str,
    work_dir: &Path,
    args: &[&str],
    env: &[(&str, &str)],
) -> CmdResult {
    let root = std::env::temp_dir().join("fmon-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env_remove("FMON_OUTPUT_FORMAT")
        .env_remove("FMON_SQLITE_DB")
        .env("HOME", work_dir)
        .env("FMON_JSONL_LOG", work_dir.join("reports.jsonl"))
        .env("RUST_BACKTRACE", "1");
    for (key, value) in env {
        command.env(key, value);
    }
    let output = command.output().expect("execute fmon command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

pub fn ts(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

pub fn line(
    request: &str,
    item: &str,
    scanned: f64,
    requested: Option<f64>,
    assigned_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> FulfillmentEvent {
    FulfillmentEvent {
        request_id: request.to_string(),
        sales_order_id: format!("SO-{request}"),
        document_number: "5501".to_string(),
        document_type: DocumentType::Boleta,
        item_code: item.to_string(),
        quantity_scanned: scanned,
        quantity_requested: requested,
        assigned_at,
        updated_at,
        assignee_id: Some(7),
    }
}

/// Seed a database with two requests on 2 March and one stale request on
/// 1 March. Returns its path.
pub fn seed_store(dir: &Path) -> PathBuf {
    let path = dir.join("fulfillment.sqlite3");
    let store = SqliteEventStore::open(&path).expect("open seed store");
    store
        .upsert_assignee(7, "Ana", "Rojas")
        .expect("seed assignee");

    let events = [
        line("R-100", "EAN-1", 6.0, Some(3.0), ts(2, 9, 0), ts(2, 9, 20)),
        line("R-100", "EAN-2", 4.0, Some(2.0), ts(2, 9, 5), ts(2, 10, 0)),
        line("R-200", "EAN-1", 0.0, None, ts(2, 11, 0), ts(2, 11, 0)),
        line("R-050", "EAN-9", 2.0, Some(2.0), ts(1, 8, 0), ts(1, 9, 0)),
    ];
    for event in &events {
        store.record_event(event).expect("seed event");
    }
    path
}
