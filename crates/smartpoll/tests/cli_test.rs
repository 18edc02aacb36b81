//! Integration tests for the `smartpoll` CLI binary.
//!
//! Argument parsing, help output, completions and error handling run without
//! any network; the end-to-end cases point a profile at a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `smartpoll` binary with env isolation.
///
/// Clears all `SMARTPOLL_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn smartpoll_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("smartpoll");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("SMARTPOLL_PROFILE")
        .env_remove("SMARTPOLL_TOKEN")
        .env_remove("SMARTPOLL_OUTPUT")
        .env_remove("SMARTPOLL_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn isolated() -> (tempfile::TempDir, assert_cmd::Command) {
    let dir = tempfile::tempdir().unwrap();
    let cmd = smartpoll_cmd(dir.path());
    (dir, cmd)
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Write a profile named `home` pointing at `server`.
fn write_profile(home: &Path, server: &MockServer) {
    let dir = home.join("smartpoll");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        format!(
            "default_profile = \"home\"\n\n\
             [profiles.home]\n\
             access_token = \"pat-1\"\n\
             api_url = \"{}/v1/\"\n",
            server.uri()
        ),
    )
    .unwrap();
}

async fn tv_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "deviceId": "tv-1", "label": "Living Room TV" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/devices/tv-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "components": { "main": {
                "switch": { "switch": { "value": "off" } },
                "audioVolume": { "volume": { "value": 7, "unit": "%" } }
            } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/devices/tv-1/commands"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let (_dir, mut cmd) = isolated();
    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let (_dir, mut cmd) = isolated();
    cmd.arg("--help").assert().success().stdout(
        predicate::str::contains("SmartThings")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("power")),
    );
}

#[test]
fn test_version_flag() {
    let (_dir, mut cmd) = isolated();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("smartpoll"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_zsh() {
    let (_dir, mut cmd) = isolated();
    cmd.args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    let (_dir, mut cmd) = isolated();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let (_dir, mut cmd) = isolated();
    let output = cmd.arg("foobar").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("foobar"));
}

#[test]
fn test_devices_list_without_credentials() {
    let (_dir, mut cmd) = isolated();
    cmd.args(["devices", "list"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No credentials"));
}

#[test]
fn test_unknown_profile() {
    let (_dir, mut cmd) = isolated();
    cmd.args(["--profile", "nope", "devices", "list"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_invalid_power_state() {
    let (_dir, mut cmd) = isolated();
    let output = cmd.args(["power", "tv-1", "sideways"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("possible values"));
}

#[test]
fn test_config_path_and_show() {
    let (dir, mut cmd) = isolated();
    cmd.args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    smartpoll_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_auth_url_requires_client_id() {
    let (_dir, mut cmd) = isolated();
    cmd.args(["auth", "url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("default"));
}

// ── Against a mocked API ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_plain() {
    let server = tv_server().await;
    let (dir, mut cmd) = isolated();
    write_profile(dir.path(), &server);

    cmd.args(["-o", "plain", "devices", "list"])
        .assert()
        .success()
        .stdout(predicate::str::diff("tv-1\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_status_by_name() {
    let server = tv_server().await;
    let (dir, mut cmd) = isolated();
    write_profile(dir.path(), &server);

    cmd.args(["-o", "plain", "devices", "status", "living room tv"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("device_tv_1_power=off")
                .and(predicate::str::contains("device_tv_1_volume=7")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_power_on() {
    let server = tv_server().await;
    let (dir, mut cmd) = isolated();
    write_profile(dir.path(), &server);

    cmd.args(["power", "tv-1", "on"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Living Room TV: power on"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_prints_first_update() {
    let server = tv_server().await;
    let (dir, mut cmd) = isolated();
    write_profile(dir.path(), &server);

    cmd.args(["-o", "json-compact", "watch", "tv-1", "--count", "1"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""device":"tv-1""#).and(
            predicate::str::contains(r#""power":"off""#),
        ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_status_json_includes_feedbacks() {
    let server = tv_server().await;
    let (dir, mut cmd) = isolated();
    write_profile(dir.path(), &server);

    cmd.args(["-o", "json-compact", "devices", "status", "tv-1"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""feedbacks":{"power_on":false,"muted":false"#)
                .and(predicate::str::contains(r#""volume":"7%""#)),
        );
}
