use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

/// Binary isolated from the user's settings and store
fn stapler(temp: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stapler"));
    cmd.arg("--config")
        .arg(temp.join("config.yaml"))
        .env("STAPLER_STORE_DIR", temp.join("store"))
        .env_remove("STAPLER_CONFIG")
        .env_remove("STAPLER_FORMAT")
        .env_remove("STAPLER_WEBHOOK_URL")
        .env_remove("STAPLER_APPBRAIN_KEY")
        .env_remove("STAPLER_DEBUG");
    cmd
}

fn write_config(temp: &Path, contents: &str) -> PathBuf {
    let path = temp.join("config.yaml");
    fs::write(&path, contents).expect("failed to write config");
    path
}

#[test]
fn version_prints_package_version() {
    let temp = tempdir().unwrap();

    stapler(temp.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn status_without_config_uses_defaults() {
    let temp = tempdir().unwrap();

    stapler(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not found, using defaults"))
        .stdout(predicate::str::contains("No webhook configured"))
        .stdout(predicate::str::contains("Watching 0 apps"));
}

#[test]
fn status_reads_custom_config() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = write_config(
        temp.path(),
        "webhook_url: https://discord.example.com/api/webhooks/1/abc\nwebhook_username: Releases\npoll_interval_secs: 600\n",
    );

    let assert = stapler(temp.path()).arg("status").assert().success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains(&config_path.to_string_lossy().to_string()));
    assert!(stdout.contains("Webhook configured (posting as Releases)"));
    assert!(stdout.contains("polling every 600s"));
    Ok(())
}

#[test]
fn init_writes_settings_from_flags() {
    let temp = tempdir().unwrap();

    stapler(temp.path())
        .args(["init", "--webhook-url", "https://discord.example.com/api/webhooks/1/abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration saved to"));

    let written = fs::read_to_string(temp.path().join("config.yaml")).unwrap();
    assert!(written.contains("discord.example.com/api/webhooks/1/abc"));

    stapler(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Webhook configured"));
}

#[test]
fn invalid_settings_are_rejected() {
    let temp = tempdir().unwrap();
    write_config(temp.path(), "poll_interval_secs: 0\n");

    stapler(temp.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_secs"));
}

#[test]
fn list_starts_empty() {
    let temp = tempdir().unwrap();

    stapler(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No apps found."));
}

#[test]
fn set_apps_then_list_as_json() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    stapler(temp.path())
        .args(["set", "apps", r#"["com.example.app","com.other"]"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated"));

    let assert = stapler(temp.path())
        .args(["list", "--format", "json"])
        .assert()
        .success();

    let output: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(
        output["data"],
        serde_json::json!([{ "id": "com.example.app" }, { "id": "com.other" }])
    );
    assert_eq!(output["meta"]["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[test]
fn set_rejects_invalid_json() {
    let temp = tempdir().unwrap();

    stapler(temp.path())
        .args(["set", "apps", "[not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn remove_drops_app_from_watch_list() {
    let temp = tempdir().unwrap();
    stapler(temp.path())
        .args(["set", "apps", r#"["com.example.app","com.other"]"#])
        .assert()
        .success();

    stapler(temp.path())
        .args(["remove", "com.example.app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped watching com.example.app"));

    stapler(temp.path())
        .args(["remove", "com.example.app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("was not watched"));

    stapler(temp.path())
        .args(["list", "--format", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.other"))
        .stdout(predicate::str::contains("com.example.app").not());
}

#[test]
fn latest_for_unknown_app_fails() {
    let temp = tempdir().unwrap();

    stapler(temp.path())
        .args(["latest", "com.never.polled"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No recorded state for com.never.polled"));
}

#[test]
fn latest_with_nothing_recorded_is_empty() {
    let temp = tempdir().unwrap();

    stapler(temp.path())
        .arg("latest")
        .assert()
        .success()
        .stdout(predicate::str::contains("No apps found."));
}

#[test]
fn poll_with_empty_watch_list() {
    let temp = tempdir().unwrap();

    stapler(temp.path())
        .arg("poll")
        .assert()
        .success()
        .stdout(predicate::str::contains("Polled 0 apps"));
}

#[test]
fn cache_path_follows_store_dir_override() {
    let temp = tempdir().unwrap();
    let expected = temp.path().join("store");

    stapler(temp.path())
        .args(["cache", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.to_string_lossy().to_string()));
}

#[test]
fn cache_clear_keeps_watch_list() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    stapler(temp.path())
        .args(["set", "apps", r#"["com.example.app"]"#])
        .assert()
        .success();

    stapler(temp.path())
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache was already empty"));

    let assert = stapler(temp.path())
        .args(["cache", "status", "--format", "json"])
        .assert()
        .success();
    let status: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(status["total_entries"], 1);

    stapler(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.app"));
    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn add_resolves_live_listing() {
    let temp = tempdir().unwrap();

    stapler(temp.path())
        .args(["add", "com.whatsapp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Watching"));

    stapler(temp.path())
        .args(["add", "com.whatsapp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already watched"));
}
