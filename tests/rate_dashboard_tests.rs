use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use std::fs;
mod test_env;

fn setup_test_env(extra: &str) -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    let guard = test_env::lock_test_env();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let config_dir = temp_dir.path().join(".bao");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("rc"),
        format!("data.location={}\nrates.url=http://127.0.0.1:9/latest\n{}", db_path.display(), extra),
    )
    .unwrap();

    std::env::set_var("HOME", temp_dir.path().to_str().unwrap());
    (temp_dir, guard)
}

fn get_bao_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bao").unwrap();
    cmd.env("HOME", temp_dir.path());
    cmd
}

#[test]
fn test_rate_uses_configured_fallback_when_unreachable() {
    let (temp_dir, _guard) = setup_test_env("rates.fallback=152.5\n");

    get_bao_cmd(&temp_dir)
        .args(&["rate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("USD/JPY 152.50 (configured fallback)"));
}

#[test]
fn test_rate_default_fallback_is_150() {
    let (temp_dir, _guard) = setup_test_env("");

    let output = get_bao_cmd(&temp_dir).args(&["rate", "--json"]).output().unwrap();
    assert!(output.status.success());
    let rate: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rate["rate"], 150.0);
    assert_eq!(rate["success"], true);
    assert_eq!(rate["is_fallback"], true);
    assert_eq!(rate["base"], "USD");
    assert_eq!(rate["quote"], "JPY");
}

#[test]
fn test_rate_fallback_flag_overrides_config() {
    let (temp_dir, _guard) = setup_test_env("rates.fallback=152.5\n");

    get_bao_cmd(&temp_dir)
        .args(&["rate", "--fallback", "140"])
        .assert()
        .success()
        .stdout(predicate::str::contains("140.00"));

    get_bao_cmd(&temp_dir)
        .args(&["rate", "--fallback", "-3"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_dashboard_writes_html_with_all_charts() {
    let (temp_dir, _guard) = setup_test_env("");
    get_bao_cmd(&temp_dir).args(&["add", "Sleeves", "--stage", "M02"]).assert().success();
    get_bao_cmd(&temp_dir).args(&["add", "Cartons", "--stage", "M16"]).assert().success();
    get_bao_cmd(&temp_dir).args(&["quote", "2", "1.25", "800"]).assert().success();
    get_bao_cmd(&temp_dir).args(&["status", "2", "M17"]).assert().success();

    let out_path = temp_dir.path().join("dash.html");
    get_bao_cmd(&temp_dir)
        .args(&["dashboard", "--output", out_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote dashboard to"));

    let html = fs::read_to_string(&out_path).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert_eq!(html.matches("<svg").count(), 6);
    assert!(html.contains("Pipeline"));
    assert!(html.contains("Sales 1"));
    assert!(html.contains("Factory 1"));
    assert!(html.contains("$1,000.00"));
    assert!(!html.contains("NaN"));
}

#[test]
fn test_dashboard_on_empty_store() {
    let (temp_dir, _guard) = setup_test_env("");
    let out_path = temp_dir.path().join("empty.html");

    get_bao_cmd(&temp_dir)
        .args(&["dashboard", "-o", out_path.to_str().unwrap()])
        .assert()
        .success();

    let html = fs::read_to_string(&out_path).unwrap();
    assert!(html.contains("No data"));
    assert!(html.contains("0 of 0 deals"));
}
