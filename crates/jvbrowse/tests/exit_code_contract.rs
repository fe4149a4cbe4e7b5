use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use serde_json::{Value, json};

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_PREFLIGHT_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("{prefix}-{nanos}"));
    std::fs::create_dir_all(&path).expect("temp dir should be creatable");
    path
}

fn jvbrowse(temp: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_jvbrowse"));
    command
        .arg("--home-dir")
        .arg(temp)
        .arg("--cwd")
        .arg(temp)
        .env("RUST_LOG", "off");
    command
}

fn envelope(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .rev()
        .find(|line| line.starts_with('{'))
        .expect("stdout should carry an envelope");
    serde_json::from_str(line).expect("envelope should be json")
}

fn write_race_store(path: &Path) {
    let connection = Connection::open(path).expect("store should open");
    connection
        .execute_batch(
            "CREATE TABLE N_RACE (Year, MonthDay, JyoCD, RaceNum, Hondai, Kyori, TrackCD);
             INSERT INTO N_RACE VALUES ('2025', '0906', '05', '11', 'セントウルS', '1200', '12');
             CREATE TABLE N_UMA_RACE (Year, MonthDay, JyoCD, RaceNum, Wakuban, Umaban, KettoNum, Bamei);
             INSERT INTO N_UMA_RACE VALUES ('2025', '0906', '05', '11', '1', '01', '2021100001', 'アルファ');",
        )
        .expect("race fixture should load");
}

fn write_settings(dir: &Path, settings: &Value) {
    let encoded = serde_json::to_string_pretty(settings).expect("settings should serialize");
    std::fs::write(dir.join("appsettings.json"), encoded).expect("settings should be writable");
}

#[test]
fn missing_required_args_exits_with_usage_code() {
    let status = Command::new(env!("CARGO_BIN_EXE_jvbrowse"))
        .arg("card")
        .status()
        .expect("command should execute");

    assert_eq!(status.code(), Some(EXIT_USAGE_ERROR));
}

#[test]
fn relative_home_dir_exits_with_runtime_code() {
    let status = Command::new(env!("CARGO_BIN_EXE_jvbrowse"))
        .args(["--home-dir", "relative", "state"])
        .env("RUST_LOG", "off")
        .status()
        .expect("command should execute");

    assert_eq!(status.code(), Some(EXIT_RUNTIME_FAILURE));
}

#[test]
fn unconfigured_acquisition_exits_with_preflight_code() {
    let temp = unique_temp_dir("jvbrowse-exit-preflight");
    let output = jvbrowse(&temp)
        .args(["acquire", "normal"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_PREFLIGHT_FAILURE));
    let envelope = envelope(&output);
    assert_eq!(envelope["ok"], false);
    assert_eq!(envelope["error"]["code"], "preflight_failed");
    assert_eq!(envelope["error"]["details"]["item"], "acquisition executable");
    assert!(!temp.join("LastUpdateState.json").exists());
    std::fs::remove_dir_all(temp).ok();
}

#[test]
fn malformed_race_date_exits_with_preflight_code() {
    let temp = unique_temp_dir("jvbrowse-exit-bad-date");
    let output = jvbrowse(&temp)
        .args(["card", "2025-13-40", "05", "11"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_PREFLIGHT_FAILURE));
    assert_eq!(envelope(&output)["error"]["code"], "race_key_invalid");
    std::fs::remove_dir_all(temp).ok();
}

#[test]
fn missing_database_exits_with_runtime_code() {
    let temp = unique_temp_dir("jvbrowse-exit-no-db");
    let output = jvbrowse(&temp)
        .arg("--db")
        .arg(temp.join("absent.db"))
        .args(["card", "20250906", "05", "11"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_RUNTIME_FAILURE));
    let envelope = envelope(&output);
    assert_eq!(envelope["command"], "card");
    assert_eq!(envelope["error"]["code"], "store_unavailable");
    std::fs::remove_dir_all(temp).ok();
}

#[test]
fn race_card_exits_zero_with_ok_envelope() {
    let temp = unique_temp_dir("jvbrowse-exit-card");
    write_race_store(&temp.join("ecore.db"));
    write_settings(&temp, &json!({ "Paths": { "DbPath": "ecore.db" } }));

    let output = jvbrowse(&temp)
        .args(["card", "2025-09-06", "5", "11"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let envelope = envelope(&output);
    assert_eq!(envelope["ok"], true);
    assert_eq!(envelope["meta"]["entry_count"], 1);
    assert_eq!(envelope["meta"]["schema_version"], "jvbrowse.envelope.v1");
    assert_eq!(envelope["data"]["entries"][0]["horse_name"], "アルファ");
    std::fs::remove_dir_all(temp).ok();
}

#[test]
fn config_reports_resolved_paths() {
    let temp = unique_temp_dir("jvbrowse-exit-config");
    write_settings(&temp, &json!({ "Paths": { "DbPath": "data/ecore.db" } }));

    let output = jvbrowse(&temp)
        .arg("config")
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let envelope = envelope(&output);
    let marks = envelope["data"]["stores"]["marks"]
        .as_str()
        .expect("marks store should resolve");
    assert!(marks.ends_with("excel_data.db"));
    assert_eq!(envelope["data"]["settings_file_exists"], true);
    assert_eq!(envelope["data"]["python"]["executable"], "python");
    std::fs::remove_dir_all(temp).ok();
}

#[cfg(unix)]
mod acquisition {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn write_tool(path: &Path, body: &str) {
        std::fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("tool should be writable");
        let mut permissions = std::fs::metadata(path)
            .expect("tool metadata should load")
            .permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(path, permissions).expect("tool should be executable");
    }

    fn configure(temp: &Path, tool_body: &str) {
        write_tool(&temp.join("jv-tool.sh"), tool_body);
        std::fs::write(temp.join("normal.xml"), "<Settings><FromDate>2025/09/01</FromDate></Settings>")
            .expect("acquisition settings should be writable");
        write_settings(
            temp,
            &json!({
                "Paths": {
                    "DbPath": "ecore.db",
                    "JvToolPath": "jv-tool.sh",
                    "NormalSetting": "normal.xml"
                }
            }),
        );
    }

    #[test]
    fn successful_acquisition_records_update_state() {
        let temp = unique_temp_dir("jvbrowse-exit-acquire-ok");
        configure(&temp, "echo \"acquired $*\"\nexit 0");

        let output = jvbrowse(&temp)
            .args(["acquire", "normal"])
            .output()
            .expect("command should execute");

        assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
        let envelope = envelope(&output);
        assert_eq!(envelope["data"]["exit_code"], 0);
        assert_eq!(envelope["meta"]["update_count"], 1);

        let raw = std::fs::read_to_string(temp.join("LastUpdateState.json"))
            .expect("state file should be written");
        let state: Value = serde_json::from_str(&raw).expect("state should be json");
        assert_eq!(state["LastUpdateSource"], "NORMAL");
        assert_eq!(state["UpdateCount"], 1);
        std::fs::remove_dir_all(temp).ok();
    }

    #[test]
    fn failing_tool_exits_with_runtime_code_and_stderr_tail() {
        let temp = unique_temp_dir("jvbrowse-exit-acquire-fail");
        configure(&temp, "echo 'JV-Link error -201' >&2\nexit 3");

        let output = jvbrowse(&temp)
            .args(["acquire", "normal"])
            .output()
            .expect("command should execute");

        assert_eq!(output.status.code(), Some(EXIT_RUNTIME_FAILURE));
        let envelope = envelope(&output);
        assert_eq!(envelope["error"]["code"], "acquisition_failed");
        assert_eq!(envelope["error"]["details"]["exit_code"], 3);
        assert_eq!(envelope["error"]["details"]["stderr_tail"][0], "JV-Link error -201");
        assert!(!temp.join("LastUpdateState.json").exists());
        std::fs::remove_dir_all(temp).ok();
    }
}
