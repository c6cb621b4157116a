//! CLI integration tests

use std::process::{Command, Output};

fn run_cli(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "pcos-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("PCOS prediction service"), "Should show app name");
    assert!(stdout.contains("features"), "Should show features command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("history"), "Should show history command");
    assert!(stdout.contains("export"), "Should show export command");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("--format"), "Should show format option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run_cli(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("pcos"), "Should show binary name");
}

#[test]
fn test_predict_help() {
    let output = run_cli(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "predict help should succeed");
    assert!(stdout.contains("--set"), "Should show --set option");
    assert!(stdout.contains("NAME=VALUE"), "Should show assignment syntax");
    assert!(stdout.contains("--input"), "Should show --input option");
}

#[test]
fn test_export_help_shows_default_file() {
    let output = run_cli(&["export", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "export help should succeed");
    assert!(stdout.contains("riwayat_prediksi_pcos.csv"));
}

#[test]
fn test_malformed_assignment_is_rejected() {
    let output = run_cli(&["predict", "--set", "AMH(ng/mL)"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Malformed --set should fail");
    assert!(stderr.contains("expected NAME=VALUE"));
}

#[test]
fn test_invalid_command() {
    let output = run_cli(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_invalid_format() {
    let output = run_cli(&["--format", "yaml", "history"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unknown format should fail");
    assert!(stderr.contains("yaml"));
}
