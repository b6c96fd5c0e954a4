//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end. Every test gets its own data
//! directory and runs from an empty working directory so no user
//! configuration is picked up.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use serde_json::Value;

/// The binary under test, isolated in `home`.
fn kaskflow(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kaskflow").unwrap();
    cmd.current_dir(home.path())
        .env("KASKFLOW_DATA_DIR", home.child("data").path())
        .env_remove("KASKFLOW_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    kaskflow(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workflow execution and project health assessment"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    kaskflow(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    kaskflow(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kaskflow"));
}

// ============================================================================
// Project Tests
// ============================================================================

#[test]
fn test_project_add_and_list() {
    let home = TempDir::new().unwrap();
    let project = home.child("shop");
    project.create_dir_all().unwrap();

    let output = kaskflow(&home).args(["project", "add"]).arg(project.path()).output().unwrap();
    assert!(output.status.success());
    let added = stdout_json(&output);
    assert_eq!(added["name"], "shop");

    kaskflow(&home)
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(added["id"].as_str().unwrap()))
        .stdout(predicate::str::contains("Total: 1 projects"));
}

#[test]
fn test_project_add_missing_directory_fails() {
    let home = TempDir::new().unwrap();
    kaskflow(&home)
        .args(["project", "add", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ============================================================================
// Check Tests
// ============================================================================

#[test]
fn test_check_empty_directory() {
    let home = TempDir::new().unwrap();
    let empty = home.child("empty");
    empty.create_dir_all().unwrap();

    let output = kaskflow(&home).args(["check", "--path"]).arg(empty.path()).output().unwrap();
    assert!(output.status.success());

    let snapshot = stdout_json(&output);
    assert_eq!(snapshot["health_score"], 0);
    assert_eq!(snapshot["build"], "unknown");
    assert_eq!(snapshot["deployment"], "unknown");
    assert_eq!(snapshot["coverage_reported"], false);
    assert_eq!(snapshot["warnings"][0], "Low test coverage");
}

#[test]
fn test_check_text_format() {
    let home = TempDir::new().unwrap();
    let empty = home.child("empty");
    empty.create_dir_all().unwrap();

    kaskflow(&home)
        .args(["check", "--format", "text", "--path"])
        .arg(empty.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Health score: 0/100"))
        .stdout(predicate::str::contains("Coverage: not reported"))
        .stdout(predicate::str::contains("Consider adding deployment configuration"));
}

#[test]
fn test_check_unknown_project_fails() {
    let home = TempDir::new().unwrap();
    kaskflow(&home)
        .args(["check", "00000000-0000-4000-8000-000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("project not found"));
}

// ============================================================================
// Workflow Tests
// ============================================================================

#[test]
fn test_run_git_sync_then_cancel_is_rejected() {
    let home = TempDir::new().unwrap();
    let project = "11111111-1111-4111-8111-111111111111";

    let output = kaskflow(&home).args(["run", "git_sync", "--project", project]).output().unwrap();
    assert!(output.status.success());

    let result = stdout_json(&output);
    assert_eq!(result["status"], "completed");
    assert_eq!(result["result"]["sync_completed"], true);

    let execution_id = result["execution_id"].as_str().unwrap();
    kaskflow(&home)
        .args(["cancel", execution_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot cancel workflow execution with status: completed"));

    kaskflow(&home)
        .args(["executions", project])
        .assert()
        .success()
        .stdout(predicate::str::contains(execution_id));
}

#[test]
fn test_run_unknown_workflow_type_reports_failure() {
    let home = TempDir::new().unwrap();
    kaskflow(&home)
        .args(["run", "deploy", "--project", "11111111-1111-4111-8111-111111111111"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"status\": \"failed\""))
        .stdout(predicate::str::contains("unknown workflow type: deploy"));
}

#[test]
fn test_run_rejects_out_of_range_video_duration() {
    let home = TempDir::new().unwrap();
    kaskflow(&home)
        .args(["run", "asset_generation", "--project", "11111111-1111-4111-8111-111111111111"])
        .args(["--set", "video_url=http://localhost:3000", "--set", "video_duration=0"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid asset_generation configuration"));
}

#[test]
fn test_schedule_cancel_and_show() {
    let home = TempDir::new().unwrap();

    let output = kaskflow(&home)
        .args(["schedule", "git_sync", "--project", "11111111-1111-4111-8111-111111111111"])
        .args(["--at", "2030-01-01T00:00:00Z"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let pending = stdout_json(&output);
    assert_eq!(pending["status"], "pending");
    assert_eq!(pending["trigger_type"], "scheduled");

    let id = pending["id"].as_str().unwrap();
    kaskflow(&home).args(["cancel", id]).assert().success();

    kaskflow(&home)
        .args(["show", id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"cancelled\""));

    kaskflow(&home).args(["dispatch", id]).assert().failure();
}

#[test]
fn test_schedule_rejects_bad_timestamp() {
    let home = TempDir::new().unwrap();
    kaskflow(&home)
        .args(["schedule", "git_sync", "--project", "11111111-1111-4111-8111-111111111111"])
        .args(["--at", "tomorrow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RFC 3339"));
}

// ============================================================================
// Templates & Config Tests
// ============================================================================

#[test]
fn test_templates_lists_builtins() {
    let home = TempDir::new().unwrap();
    kaskflow(&home)
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("quick_health_check (state_check)"))
        .stdout(predicate::str::contains("generate_demo_assets (asset_generation)"))
        .stdout(predicate::str::contains("comprehensive_analysis (full_analysis)"));
}

#[test]
fn test_templates_include_local_config() {
    let home = TempDir::new().unwrap();
    home.child(".kaskflow.toml")
        .write_str(
            r#"
[[templates]]
name = "lint_only"
description = "Only run the linter"
workflow_type = "state_check"
configuration = { check_build = false, check_tests = false, check_security = false, check_deployment = false }
"#,
        )
        .unwrap();

    kaskflow(&home)
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("lint_only (state_check)"))
        .stdout(predicate::str::contains("Only run the linter"));
}

#[test]
fn test_config_shows_defaults() {
    let home = TempDir::new().unwrap();
    kaskflow(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("tool_timeout_secs = 600"))
        .stdout(predicate::str::contains("docker_tag = \"kaskflow-health-check\""));
}
