//! Smoke tests -- verify the binary runs and the offline path works end to end.

use std::io::{BufRead, BufReader, Write};
use std::process::Stdio;
use std::sync::mpsc;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    Command::cargo_bin("zeroday")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("zero-day traffic anomaly detector"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("zeroday")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("zeroday"));
}

#[test]
fn test_run_subcommand_exists() {
    Command::cargo_bin("zeroday")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--redis-url"));
}

#[test]
fn test_config_prints_defaults() {
    Command::cargo_bin("zeroday")
        .unwrap()
        .arg("config")
        .env_remove("ZERODAY_CONFIG")
        .assert()
        .success()
        .stdout(predicates::str::contains("ingress_channel = \"traffic_monitor\""))
        .stdout(predicates::str::contains("warmup_threshold = 100"));
}

#[test]
fn test_config_file_is_applied() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[transport]\negress_channel = \"soc_alerts\"").unwrap();

    Command::cargo_bin("zeroday")
        .unwrap()
        .arg("--config")
        .arg(file.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicates::str::contains("egress_channel = \"soc_alerts\""));
}

#[test]
fn test_replay_emits_alert_for_outlier() {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    for i in 1..=100u64 {
        writeln!(input, "10.0.0.1|1700000000|{}", 100 + (i * 37) % 50).unwrap();
    }
    writeln!(input, "bad|data").unwrap();
    writeln!(input, "203.0.113.66|1700000100|10000000").unwrap();

    Command::cargo_bin("zeroday")
        .unwrap()
        .env_remove("ZERODAY_CONFIG")
        .args(["replay", "--input"])
        .arg(input.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("\"ip\":\"203.0.113.66\""))
        .stdout(predicates::str::contains("\"type\":\"zero_day\""))
        .stdout(predicates::str::contains("\"payload_size\":10000000"));
}

#[test]
fn test_replay_missing_input_fails() {
    Command::cargo_bin("zeroday")
        .unwrap()
        .env_remove("ZERODAY_CONFIG")
        .args(["replay", "--input", "/nonexistent/records.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read replay input"));
}

#[test]
fn test_unreadable_env_config_is_logged() {
    Command::cargo_bin("zeroday")
        .unwrap()
        .env("ZERODAY_CONFIG", "/nonexistent/zeroday.toml")
        .env_remove("RUST_LOG")
        .arg("config")
        .assert()
        .success()
        .stdout(predicates::str::contains("warmup_threshold = 100"))
        .stderr(predicates::str::contains(
            "ZERODAY_CONFIG set but file could not be loaded",
        ));
}

#[test]
fn test_replay_stdin_alerts_before_input_ends() {
    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("zeroday"))
        .env_remove("ZERODAY_CONFIG")
        .arg("replay")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    for i in 1..=100u64 {
        writeln!(stdin, "10.0.0.1|1700000000|{}", 100 + (i * 37) % 50).unwrap();
    }
    writeln!(stdin, "203.0.113.66|1700000100|10000000").unwrap();
    stdin.flush().unwrap();

    // stdin stays open while we wait for the alert.
    let stdout = child.stdout.take().unwrap();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = BufReader::new(stdout).read_line(&mut line);
        let _ = tx.send(line);
    });
    let first = rx.recv_timeout(Duration::from_secs(30));

    drop(stdin);
    let status = child.wait().unwrap();

    let line = first.expect("no alert while stdin was still open");
    assert!(line.contains("\"ip\":\"203.0.113.66\""), "got {:?}", line);
    assert!(status.success());
}
