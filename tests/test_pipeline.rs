//! End-to-end tests of a full pipeline run

use surveyfit::pipeline::cleaner::clean;
use surveyfit::pipeline::columns::float_values;
use surveyfit::pipeline::features::{build_feature_matrix, ScalingScope};
use surveyfit::pipeline::loader::load_dataset;
use surveyfit::pipeline::runner::run_pipeline;
use surveyfit::pipeline::split::stratified_split;
use surveyfit::report::plots::{
    CONFUSION_MATRIX, HIST_AGE, HIST_FARE, ROC_CURVE, SURVIVAL_BY_CLASS, SURVIVAL_BY_SEX,
};
use surveyfit::report::text_report::{MISSING_HEADING, MODELING_HEADING, NUMERIC_HEADING};
use surveyfit::report::{
    BUNDLE_FILE, CLEAN_CSV_FILE, COEFFICIENTS_FILE, EVALUATION_JSON_FILE, REPORT_FILE,
};
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_four_row_scenario() {
    let mut df = common::create_four_row_dataframe();
    let (dir, input) = common::create_temp_csv(&mut df);
    let config = common::test_config(&input, dir.path());

    let outcome = run_pipeline(&config).unwrap();

    // Age imputed with the median of {22, 38, 35}
    let age = float_values(outcome.clean.column("age").unwrap()).unwrap();
    assert_eq!(age, vec![Some(22.0), Some(35.0), Some(38.0), Some(35.0)]);

    // No sibsp/parch: everyone travels alone
    let family = float_values(outcome.clean.column("family_size").unwrap()).unwrap();
    assert!(family.iter().all(|v| *v == Some(1.0)));

    let run = outcome.model.as_ref().expect("modeling should run");
    assert_eq!(run.model.feature_names, vec!["age", "fare", "sex_male"]);
    assert_eq!(run.evaluation.test_size, 1);
    assert_eq!(run.evaluation.confusion.total(), 1);
    assert!(run.evaluation.auc.is_none(), "single-class test partition");

    assert!(dir.path().join(COEFFICIENTS_FILE).exists());
    assert!(dir.path().join(CLEAN_CSV_FILE).exists());
    assert!(dir.path().join(REPORT_FILE).exists());
}

#[test]
fn test_four_row_split_is_reproducible() {
    let df = common::create_four_row_dataframe();
    let cleaned = clean(&df).unwrap().frame;
    let set = build_feature_matrix(&cleaned, "survived").unwrap();
    assert_eq!(set.matrix.n_features(), 3);

    let first = stratified_split(&set.matrix, 0.25, 42).unwrap();
    let second = stratified_split(&set.matrix, 0.25, 42).unwrap();
    assert_eq!(first.test_rows, second.test_rows);
    assert_eq!(first.train_rows, second.train_rows);
}

#[test]
fn test_missing_cabin_scenario() {
    let mut df = common::create_passenger_dataframe().drop("cabin").unwrap();
    let (dir, input) = common::create_temp_csv(&mut df);
    let config = common::test_config(&input, dir.path());

    let outcome = run_pipeline(&config).unwrap();
    common::assert_missing_columns(&outcome.clean, &["cabin", "has_cabin"]);
    assert!(outcome.model.is_some());

    let report = std::fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap();
    let start = report.find(MISSING_HEADING).unwrap();
    let end = report.find(NUMERIC_HEADING).unwrap();
    let missing_section = &report[start..end];
    assert!(missing_section.contains("age"));
    assert!(!missing_section.contains("cabin"));
}

#[test]
fn test_missing_label_scenario() {
    let mut df = common::create_passenger_dataframe().drop("survived").unwrap();
    let (dir, input) = common::create_temp_csv(&mut df);
    let config = common::test_config(&input, dir.path());

    let outcome = run_pipeline(&config).unwrap();
    assert!(outcome.model.is_none());
    assert!(outcome.warnings().any(|n| n.message.contains("survived")));

    assert!(dir.path().join(CLEAN_CSV_FILE).exists());
    assert!(!dir.path().join(COEFFICIENTS_FILE).exists());

    let report = std::fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap();
    assert!(report.contains(MISSING_HEADING));
    assert!(!report.contains(MODELING_HEADING));

    let figures = config.figures_dir();
    assert!(figures.join(HIST_AGE).exists());
    assert!(figures.join(HIST_FARE).exists());
    for absent in [SURVIVAL_BY_SEX, SURVIVAL_BY_CLASS, ROC_CURVE, CONFUSION_MATRIX] {
        assert!(!figures.join(absent).exists(), "{} should be skipped", absent);
    }
}

#[test]
fn test_full_run_writes_every_artifact() {
    let mut df = common::create_passenger_dataframe();
    let (dir, input) = common::create_temp_csv(&mut df);
    let out = TempDir::new().unwrap();
    let config = surveyfit::pipeline::PipelineConfig {
        export_json: true,
        bundle: true,
        ..common::test_config(&input, out.path())
    };

    let outcome = run_pipeline(&config).unwrap();
    drop(dir);

    for file in [REPORT_FILE, CLEAN_CSV_FILE, COEFFICIENTS_FILE, EVALUATION_JSON_FILE, BUNDLE_FILE] {
        assert!(outcome.manifest.contains_file(file), "{} missing from manifest", file);
        assert!(out.path().join(file).exists(), "{} not written", file);
    }
    for figure in [HIST_AGE, HIST_FARE, SURVIVAL_BY_SEX, SURVIVAL_BY_CLASS, ROC_CURVE, CONFUSION_MATRIX] {
        assert!(config.figures_dir().join(figure).exists(), "{} not rendered", figure);
    }

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join(EVALUATION_JSON_FILE)).unwrap())
            .unwrap();
    assert_eq!(json["run"]["seed"], 42);
    assert!(json["evaluation"]["accuracy"].is_number());
    assert!(json["generated_at"].is_string());

    let coefficients = std::fs::read_to_string(out.path().join(COEFFICIENTS_FILE)).unwrap();
    let weights: Vec<f64> = coefficients
        .lines()
        .skip(1)
        .map(|l| l.rsplit(',').next().unwrap().parse().unwrap())
        .collect();
    assert!(weights.windows(2).all(|w| w[0] >= w[1]), "sorted by weight descending");

    let reloaded = load_dataset(&out.path().join(CLEAN_CSV_FILE), 10000).unwrap();
    common::assert_has_columns(&reloaded, &["title", "family_size", "is_alone", "has_boat"]);
}

#[test]
fn test_train_only_scaling_run() {
    let mut df = common::create_passenger_dataframe();
    let (dir, input) = common::create_temp_csv(&mut df);
    let config = surveyfit::pipeline::PipelineConfig {
        scaling: ScalingScope::TrainOnly,
        ..common::test_config(&input, dir.path())
    };

    let outcome = run_pipeline(&config).unwrap();
    let run = outcome.model.expect("modeling should run");
    assert!(run.model.standardizer.is_some());

    let report = std::fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap();
    assert!(report.contains("training partition only"));
}

#[test]
fn test_blocked_figures_dir_still_writes_reports() {
    let mut df = common::create_passenger_dataframe();
    let (dir, input) = common::create_temp_csv(&mut df);
    let config = common::test_config(&input, dir.path());
    // A plain file where the figures directory should go
    std::fs::write(config.figures_dir(), "not a directory").unwrap();

    let outcome = run_pipeline(&config).unwrap();

    assert!(outcome.model.is_some(), "modeling runs without figures");
    assert!(dir.path().join(REPORT_FILE).exists());
    assert!(dir.path().join(CLEAN_CSV_FILE).exists());
    assert!(dir.path().join(COEFFICIENTS_FILE).exists());
    assert!(outcome.warnings().any(|n| n.stage == "figures"));
    for figure in [HIST_AGE, ROC_CURVE, CONFUSION_MATRIX] {
        assert!(!outcome.manifest.contains_file(figure));
    }

    let report = std::fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap();
    assert!(report.contains("figures directory could not be created"));
}
