#![cfg(unix)]

use predicates::prelude::*;

mod common;

#[test]
fn test_run_success_keeps_dirs() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .args(["run", "--keep"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline completed successfully"))
        .stdout(predicate::str::contains("accuracy: 0.9300"));

    assert_eq!(
        ctx.logged_stages(),
        vec!["train", "predict", "validate-model", "validate-predictions"]
    );
    assert!(ctx.path("test_models/latest_model.pkl").is_file());
    assert!(ctx.path("test_predictions/latest_predictions.csv").is_file());
}

#[test]
fn test_run_prompt_declined_retains_dirs() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .arg("run")
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Clean up test directories? (y/N)"));

    assert!(ctx.path("test_data").is_dir());
    assert!(ctx.path("test_models").is_dir());
    assert!(ctx.path("test_predictions").is_dir());
}

#[test]
fn test_run_prompt_empty_answer_retains_dirs() {
    let ctx = common::TestContext::new();

    ctx.cmd().arg("run").write_stdin("\n").assert().success();

    assert!(ctx.path("test_models/latest_model.pkl").is_file());
}

#[test]
fn test_run_prompt_accepted_removes_dirs() {
    let ctx = common::TestContext::new();

    ctx.cmd().arg("run").write_stdin("Y\n").assert().success();

    assert!(!ctx.path("test_data").exists());
    assert!(!ctx.path("test_models").exists());
    assert!(!ctx.path("test_predictions").exists());
}

#[test]
fn test_build_failure_propagates_exit_code() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .args(["run", "--keep"])
        .env("FAKE_BUILD_EXIT", "3")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("BUILD FAILED"));

    assert!(ctx.logged_stages().is_empty());
}

#[test]
fn test_stage_failure_stops_run() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .args(["run", "--keep"])
        .env("FAKE_FAIL_STAGE", "predict")
        .env("FAKE_FAIL_CODE", "2")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("STAGE FAILED: predict"));

    assert_eq!(ctx.logged_stages(), vec!["train", "predict"]);
}

#[test]
fn test_missing_artifact_fails_run() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .args(["run", "--keep"])
        .env("FAKE_PRODUCE", "0")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MISSING ARTIFACT: verify-model"));

    assert_eq!(ctx.logged_stages(), vec!["train"]);
}

#[test]
fn test_missing_docker_is_launch_failure() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .args(["run", "--keep"])
        .env("MLPIPE_DOCKER", "/nonexistent/docker")
        .assert()
        .code(127)
        .stderr(predicate::str::contains("LAUNCH FAILED"));
}

#[test]
fn test_no_build_skips_build() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .args(["run", "--keep", "--no-build"])
        .env("FAKE_BUILD_EXIT", "3")
        .assert()
        .success();
}

#[test]
fn test_rerun_is_idempotent() {
    let ctx = common::TestContext::new();

    ctx.cmd().args(["run", "--keep"]).assert().success();
    ctx.cmd().args(["run", "--keep"]).assert().success();

    assert!(ctx.path("test_models/latest_model.pkl").is_file());
    assert!(ctx.path("test_predictions/latest_predictions.csv").is_file());
    assert_eq!(ctx.logged_stages().len(), 8);
}

#[test]
fn test_keep_count_runs_prune() {
    let ctx = common::TestContext::new();

    ctx.cmd()
        .args(["run", "--keep", "--keep-count", "2"])
        .assert()
        .success();

    assert_eq!(ctx.logged_stages().last().map(String::as_str), Some("prune"));
}

#[test]
fn test_summary_is_written() {
    let ctx = common::TestContext::new();
    let summary = ctx.path("summary.json");

    ctx.cmd()
        .args(["run", "--keep", "--summary"])
        .arg(&summary)
        .env("FAKE_FAIL_STAGE", "validate-model")
        .assert()
        .code(1);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["failed_stage"], "validate-model");
    assert_eq!(json["failure"], "stage_execution");
    assert_eq!(json["exit_code"], 1);
}
