use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use assert_cmd::Command;
use tempfile::tempdir;

// Simulated backend with a fast clock so `watch` sees traffic quickly.
fn write_sim_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[server]
base_url = "http://127.0.0.1:9"

[realtime]
reconnect_delay_ms = 100

[ui]
locale = "en"

[simulation]
enabled = true
tick_ms = 5
"#;
    let path = dir.path().join("washcall.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn washcall(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("washcall").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("WASHCALL_TOKEN")
        .arg("--config")
        .arg(cfg);
    cmd
}

#[rstest]
#[case(&["list"], 0, "Washing", "stdout")]
#[case(&["start", "--machine", "1", "--course", "표준"], 0, "Washing", "stdout")]
#[case(&["start", "--machine", "1", "--course", "boil"], 5, "not available", "stderr")]
#[case(&["start", "--machine", "2", "--course", "표준"], 5, "already running", "stderr")]
#[case(&["start", "--machine", "99", "--course", "표준"], 4, "HTTP 404", "stderr")]
#[case(&["notify", "--machine", "99"], 6, "Machine 99", "stderr")]
#[case(&["notify", "--machine", "1"], 5, "not available", "stderr")]
#[case(&["notify", "--machine", "3"], 0, "[*]", "stdout")]
#[case(&["notify", "--machine", "2", "--off"], 0, "Washing", "stdout")]
#[case(&["health"], 0, "3 machines via simulated", "stdout")]
#[case(&["congestion"], 0, "Sun:", "stdout")]
#[case(&["congestion", "--day", "토"], 0, "  21:00 [", "stdout")]
#[case(&["congestion", "--day", "someday"], 2, "weekday", "stderr")]
#[case(&["tip"], 0, "여유로운", "stdout")]
#[case(&["reserve", "--room", "1"], 0, "Room 1: alerts on", "stdout")]
#[case(&["reserve", "--room", "1", "--off"], 0, "Room 1: alerts off", "stdout")]
#[case(&["reserve", "--room", "9"], 4, "HTTP 404", "stderr")]
#[case(&["start", "--machine", "1"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);

    let mut cmd = washcall(&cfg);
    cmd.args(args);
    let output = cmd.output().unwrap();

    assert_eq!(
        output.status.code(),
        Some(exit_code),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let text = if stream == "stdout" {
        String::from_utf8_lossy(&output.stdout).to_string()
    } else {
        String::from_utf8_lossy(&output.stderr).to_string()
    };
    assert!(text.contains(needle), "expected {needle:?} in {stream}: {text}");
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("washcall")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn list_json_emits_one_card_per_line() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    let out = washcall(&cfg).args(["--json", "list"]).output().unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    let cards: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("each line is JSON"))
        .collect();
    assert_eq!(cards.len(), 3);
    assert_eq!(cards[0]["machine_id"], 1);
    assert_eq!(cards[0]["status"], "OFF");
    assert_eq!(cards[1]["status"], "WASHING");
    assert_eq!(cards[1]["subscribed"], true);
    assert_eq!(cards[2]["machine_type"], "dryer");
}

#[test]
fn korean_locale_uses_product_wording() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    washcall(&cfg)
        .args(["--locale", "ko", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("세탁 중"))
        .stdout(predicate::str::contains("대기 중"));
}

#[test]
fn watch_stops_after_event_limit() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    washcall(&cfg)
        .args(["watch", "--max-events", "3", "--duration-ms", "20000"])
        .timeout(std::time::Duration::from_secs(15))
        .assert()
        .success()
        .stdout(predicate::str::contains("-- realtime connected"));
}

#[test]
fn watch_json_events_are_tagged() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    let out = washcall(&cfg)
        .args(["--json", "watch", "--max-events", "2"])
        .timeout(std::time::Duration::from_secs(15))
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let first_event = stdout
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .find(|v| v.get("event").is_some())
        .expect("an event line");
    assert_eq!(first_event["event"], "link");
}

#[test]
fn watch_honors_duration() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    washcall(&cfg)
        .args(["watch", "--duration-ms", "300"])
        .timeout(std::time::Duration::from_secs(15))
        .assert()
        .success();
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    washcall(&missing)
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration"));
}

#[test]
fn invalid_config_is_rejected_before_any_request() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[realtime]\nreconnect_delay_ms = 1\n").unwrap();
    washcall(&path)
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("reconnect_delay_ms"));
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    let out = washcall(&cfg)
        .args(["--json", "notify", "--machine", "99"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(6));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let line = stderr
        .lines()
        .rev()
        .find(|l| l.contains("\"reason\""))
        .expect("error JSON on stderr");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "UnknownMachine");
    assert_eq!(v["exit_code"], 6);
}

#[test]
fn unreachable_server_falls_back_to_simulation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("net.toml");
    fs::write(
        &path,
        "[server]\nbase_url = \"http://127.0.0.1:9\"\nrequest_timeout_ms = 500\n\n[ui]\nlocale = \"en\"\n",
    )
    .unwrap();
    washcall(&path)
        .arg("health")
        .timeout(std::time::Duration::from_secs(15))
        .assert()
        .success()
        .stdout(predicate::str::contains("simulated"));
}

#[test]
fn unreachable_server_without_fallback_exits_with_transport_code() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("net.toml");
    fs::write(
        &path,
        "[server]\nbase_url = \"http://127.0.0.1:9\"\nrequest_timeout_ms = 500\n\n[simulation]\nfallback_on_network_error = false\n",
    )
    .unwrap();
    washcall(&path)
        .arg("list")
        .timeout(std::time::Duration::from_secs(15))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("could not be reached"));
}

#[test]
fn congestion_json_is_one_day_per_line() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    let out = washcall(&cfg)
        .args(["--json", "congestion", "--day", "sat"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let days: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["day"], "sat");
    assert_eq!(days[0]["hours"].as_array().unwrap().len(), 13);
    assert_eq!(days[0]["hours"][0]["hour"], 9);
    assert_eq!(days[0]["hours"][0]["value"], 5.0);
}

#[test]
fn tip_json_carries_text() {
    let dir = tempdir().unwrap();
    let cfg = write_sim_config(&dir);
    let out = washcall(&cfg).args(["--json", "tip"]).output().unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(v["tip"].as_str().is_some_and(|t| !t.is_empty()));
}
