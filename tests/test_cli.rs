//! Tests for CLI argument parsing and the binary's exit behaviour

use assert_cmd::Command;
use clap::Parser;
use predicates::prelude::*;
use std::path::PathBuf;
use surveyfit::cli::Cli;
use surveyfit::pipeline::ScalingScope;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_cli_default_values() {
    let cli = Cli::parse_from(["surveyfit"]);

    assert_eq!(cli.input, PathBuf::from("titanic.csv"), "Default input should be titanic.csv");
    assert_eq!(cli.output_dir, PathBuf::from("."), "Default output dir should be .");
    assert_eq!(cli.test_fraction, 0.25, "Default test fraction should be 0.25");
    assert_eq!(cli.seed, 42, "Default seed should be 42");
    assert_eq!(cli.max_iter, 200, "Default max iterations should be 200");
    assert_eq!(cli.scaling, ScalingScope::FullDataset);
    assert!(!cli.json && !cli.bundle && !cli.quiet);
}

#[test]
fn test_cli_into_config_matches_default() {
    let config = Cli::parse_from(["surveyfit"]).into_config();
    assert_eq!(config, surveyfit::pipeline::PipelineConfig::default());
}

#[test]
fn test_cli_custom_values() {
    let cli = Cli::parse_from([
        "surveyfit",
        "--input",
        "data/passengers.csv",
        "--output-dir",
        "out",
        "--test-fraction",
        "0.3",
        "--seed",
        "7",
        "--max-iter",
        "50",
        "--scaling",
        "train",
        "--json",
        "--bundle",
    ]);
    let config = cli.into_config();
    assert_eq!(config.input, PathBuf::from("data/passengers.csv"));
    assert_eq!(config.output_dir, PathBuf::from("out"));
    assert_eq!(config.test_fraction, 0.3);
    assert_eq!(config.seed, 7);
    assert_eq!(config.fit.max_iter, 50);
    assert_eq!(config.scaling, ScalingScope::TrainOnly);
    assert!(config.export_json && config.bundle);
}

#[test]
fn test_cli_rejects_bad_test_fraction() {
    assert!(Cli::try_parse_from(["surveyfit", "--test-fraction", "1.5"]).is_err());
    assert!(Cli::try_parse_from(["surveyfit", "--scaling", "sometimes"]).is_err());
}

#[test]
fn test_binary_missing_input_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    Command::cargo_bin("surveyfit")
        .unwrap()
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("titanic.csv"));
}

#[test]
fn test_binary_runs_with_defaults() {
    let dir = TempDir::new().unwrap();
    let mut df = common::create_passenger_dataframe();
    common::write_csv(&mut df, dir.path(), "titanic.csv");

    Command::cargo_bin("surveyfit")
        .unwrap()
        .current_dir(dir.path())
        .arg("--quiet")
        .assert()
        .success();

    assert!(dir.path().join("analysis_report.txt").exists());
    assert!(dir.path().join("logistic_coefficients.csv").exists());
    assert!(dir.path().join("figures").join("roc_curve.svg").exists());
}
