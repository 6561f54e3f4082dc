//! Integration tests for the `speedwindow` binary.
//!
//! Argument parsing, help output, completions, config validation, and
//! one-shot `apply`/`status` runs against a mocked qBittorrent WebUI.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// A `speedwindow` command isolated from the user's environment and config.
fn speedwindow_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("speedwindow");
    cmd.env("HOME", "/tmp/speedwindow-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/speedwindow-cli-test-nonexistent")
        .env_remove("SPEEDWINDOW_CONFIG")
        .env_remove("SPEEDWINDOW_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

const VALID_LIMITER: &str = r#"
[limiter]
enabled = true
restrict_cron = "0 18 * * 1-5"
release_cron = "0 23 * * *"
services = ["home"]

[limiter.download]
enabled = true
restricted = 100
normal = 0
"#;

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = speedwindow_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    speedwindow_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("run")
            .and(predicate::str::contains("apply"))
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("check")),
    );
}

#[test]
fn test_version_flag() {
    speedwindow_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("speedwindow"));
}

#[test]
fn test_completions_zsh() {
    speedwindow_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_transition_is_rejected() {
    let output = speedwindow_cmd().args(["apply", "sideways"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("possible values"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    speedwindow_cmd()
        .args(["--config", "/etc/speedwindow/custom.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/etc/speedwindow/custom.toml"));
}

#[test]
fn test_config_show_without_file_uses_defaults() {
    speedwindow_cmd()
        .args(["--config", "/tmp/speedwindow-cli-test-nonexistent/none.toml"])
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[limiter]"));
}

#[test]
fn test_config_show_masks_passwords() {
    let file = write_config(
        r#"
        [downloaders.home]
        url = "http://127.0.0.1:8080"
        username = "admin"
        password = "hunter2"
        "#,
    );
    speedwindow_cmd()
        .arg("--config")
        .arg(file.path())
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("****").and(predicate::str::contains("hunter2").not()));
}

// ── Check ───────────────────────────────────────────────────────────

#[test]
fn test_check_valid_config_previews_jobs() {
    let file = write_config(&format!(
        "{VALID_LIMITER}\n[downloaders.home]\nurl = \"http://127.0.0.1:8080\"\n"
    ));
    speedwindow_cmd()
        .arg("--config")
        .arg(file.path())
        .args(["check", "-n", "2"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("speed-limit-restrict")
                .and(predicate::str::contains("speed-limit-release"))
                .and(predicate::str::contains("next:")),
        );
}

#[test]
fn test_check_reports_bad_cron_and_value() {
    let file = write_config(
        r#"
        [limiter]
        enabled = true
        restrict_cron = "at dusk"
        release_cron = "0 23 * * *"

        [limiter.upload]
        enabled = true
        restricted = "lots"
        "#,
    );
    let output = speedwindow_cmd()
        .arg("--config")
        .arg(file.path())
        .arg("check")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("at dusk"), "{text}");
    assert!(text.contains("limiter.upload.restricted"), "{text}");
}

// ── Against a mocked WebUI ──────────────────────────────────────────

async fn mount_webui(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v2/app/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("v4.6.2"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/transfer/downloadLimit"))
        .respond_with(ResponseTemplate::new(200).set_body_string("512000"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/transfer/uploadLimit"))
        .respond_with(ResponseTemplate::new(200).set_body_string("204800"))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_apply_restricted_sets_download_limit() {
    let server = MockServer::start().await;
    mount_webui(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/transfer/setDownloadLimit"))
        .and(body_string("limit=102400"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let file = write_config(&format!(
        "{VALID_LIMITER}\n[downloaders.home]\nurl = \"{}\"\n",
        server.uri()
    ));
    speedwindow_cmd()
        .arg("--config")
        .arg(file.path())
        .args(["-o", "json", "apply", "restricted"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"success\": true")
                .and(predicate::str::contains("\"upload\": 200")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_apply_reports_rejection_with_exit_code() {
    let server = MockServer::start().await;
    mount_webui(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/transfer/setDownloadLimit"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let file = write_config(&format!(
        "{VALID_LIMITER}\n[downloaders.home]\nurl = \"{}\"\n",
        server.uri()
    ));
    let output = speedwindow_cmd()
        .arg("--config")
        .arg(file.path())
        .args(["apply", "restrict"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(9));
    assert!(combined_output(&output).contains("rejected-by-service"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_lists_live_limits() {
    let server = MockServer::start().await;
    mount_webui(&server).await;

    let file = write_config(&format!(
        "{VALID_LIMITER}\n[downloaders.home]\nurl = \"{}\"\n",
        server.uri()
    ));
    speedwindow_cmd()
        .arg("--config")
        .arg(file.path())
        .args(["-o", "plain", "status"])
        .assert()
        .success()
        .stdout(predicate::str::diff("home\n"));
}
