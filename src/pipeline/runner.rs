//! End-to-end pipeline run
//!
//! Load -> Diagnose -> Clean -> basic plots -> BuildMatrix ->
//! (Split -> Fit -> Evaluate -> model plots)? -> Report.
//! Only a missing input (or an I/O failure on a mandatory output) stops the
//! run; every other problem is recorded as a notice and the dependent stage
//! is skipped.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;

use super::cleaner::clean;
use super::columns::{float_values, has_column};
use super::diagnostics::{categorical_summary, missingness, numeric_summary, survival_rate_by};
use super::error::{Notice, NoticeLevel, PipelineError, PipelineResult};
use super::evaluation::{evaluate, EvaluationResult};
use super::features::{build_feature_matrix, default_label, encode_features, ScalingScope, Standardizer};
use super::loader::{dataset_stats, load_dataset};
use super::model::{fit, FitConfig, FitOutcome, LogisticModel};
use super::schema::Field;
use super::split::stratified_split;
use crate::report::export::{
    package_artifacts, write_clean_csv, write_coefficients, write_evaluation_json, ArtifactKind,
    ArtifactManifest, RunMetadata, BUNDLE_FILE, CLEAN_CSV_FILE, COEFFICIENTS_FILE,
    EVALUATION_JSON_FILE, REPORT_FILE,
};
use crate::report::plots::{
    plot_confusion_matrix, plot_histogram, plot_roc_curve, plot_survival_rate, CONFUSION_MATRIX,
    HIST_AGE, HIST_FARE, ROC_CURVE, SURVIVAL_BY_CLASS, SURVIVAL_BY_SEX,
};
use crate::report::summary::RunSummary;
use crate::report::text_report::{write_text_report, ModelingSection, ReportSections};
use crate::utils::{create_spinner, finish_with_success, finish_with_warning, print_notice, print_step_header, print_success};

pub const FIGURES_DIR: &str = "figures";

/// Settings for one run; `Default` reproduces the standard invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub label: String,
    pub test_fraction: f64,
    pub seed: u64,
    pub fit: FitConfig,
    /// Entries per categorical summary and coefficients listed in the report
    pub top_n: usize,
    pub scaling: ScalingScope,
    /// Rows sampled for CSV type inference; 0 scans the whole file
    pub infer_schema_length: usize,
    pub export_json: bool,
    pub bundle: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("titanic.csv"),
            output_dir: PathBuf::from("."),
            label: default_label().to_string(),
            test_fraction: 0.25,
            seed: 42,
            fit: FitConfig::default(),
            top_n: 10,
            scaling: ScalingScope::default(),
            infer_schema_length: 10000,
            export_json: false,
            bundle: false,
        }
    }
}

impl PipelineConfig {
    pub fn figures_dir(&self) -> PathBuf {
        self.output_dir.join(FIGURES_DIR)
    }

    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

/// Fitted model and its held-out evaluation
#[derive(Debug, Clone)]
pub struct ModelRun {
    pub model: LogisticModel,
    pub evaluation: EvaluationResult,
    pub train_size: usize,
    pub converged: bool,
    pub iterations: usize,
}

/// Everything a completed run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub clean: DataFrame,
    pub model: Option<ModelRun>,
    pub notices: Vec<Notice>,
    pub manifest: ArtifactManifest,
    pub summary: RunSummary,
}

impl RunOutcome {
    pub fn warnings(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(|n| n.level == NoticeLevel::Warning)
    }
}

/// Notices in arrival order, echoed to the console as they come in
#[derive(Debug, Default)]
struct NoticeLog {
    notices: Vec<Notice>,
}

impl NoticeLog {
    fn push(&mut self, notice: Notice) {
        print_notice(&notice);
        self.notices.push(notice);
    }

    fn extend(&mut self, notices: impl IntoIterator<Item = Notice>) {
        for notice in notices {
            self.push(notice);
        }
    }

    /// Record a soft error; hand a fatal one back to the caller.
    fn soft<T>(&mut self, stage: &'static str, result: PipelineResult<T>) -> PipelineResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if !err.is_fatal() => {
                self.push(Notice::from_error(stage, &err));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn warning_count(&self) -> usize {
        self.notices
            .iter()
            .filter(|n| n.level == NoticeLevel::Warning)
            .count()
    }
}

/// Run every stage and write the artifacts.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunOutcome> {
    let mut log = NoticeLog::default();
    let mut manifest = ArtifactManifest::default();

    // Step 1: load
    print_step_header(1, "Loading dataset");
    let started = Instant::now();
    let spinner = create_spinner("Reading CSV...");
    let raw = match load_dataset(&config.input, config.infer_schema_length) {
        Ok(df) => df,
        Err(err) => {
            finish_with_warning(&spinner, "Input could not be loaded");
            return Err(err.into());
        }
    };
    let (rows, cols, memory_mb) = dataset_stats(&raw);
    finish_with_success(
        &spinner,
        &format!("Loaded {} rows x {} columns ({:.2} MB)", rows, cols, memory_mb),
    );
    let mut summary = RunSummary::new(rows, cols);
    summary.record_stage("load", started.elapsed());

    // Step 2: diagnostics on the raw table
    print_step_header(2, "Diagnostics");
    let started = Instant::now();
    let missing = missingness(&raw)?;
    let numeric = numeric_summary(&raw)?;
    let categorical = categorical_summary(&raw, config.top_n)?;
    print_success(&format!(
        "{} column(s) with missing values, {} numeric, {} categorical",
        missing.iter().filter(|m| m.count > 0).count(),
        numeric.len(),
        categorical.len()
    ));
    summary.record_stage("diagnostics", started.elapsed());

    // Step 3: cleaning and feature engineering
    print_step_header(3, "Cleaning");
    let started = Instant::now();
    let cleaned = clean(&raw)?;
    log.extend(cleaned.notes);
    let clean_df = cleaned.frame;
    summary.engineered_columns = clean_df.width().saturating_sub(raw.width());
    print_success(&format!(
        "Cleaned table has {} columns ({} engineered)",
        clean_df.width(),
        summary.engineered_columns
    ));
    summary.record_stage("cleaning", started.elapsed());

    // Step 4: descriptive figures
    print_step_header(4, "Descriptive figures");
    let started = Instant::now();
    let figures_dir = prepare_figures_dir(config, &mut log)?;
    if let Some(dir) = &figures_dir {
        descriptive_figures(&clean_df, config, dir, &mut log, &mut manifest)?;
    }
    summary.record_stage("figures", started.elapsed());

    // Step 5: modeling
    print_step_header(5, "Modeling");
    let started = Instant::now();
    let model_run = run_modeling(
        &clean_df,
        config,
        figures_dir.as_deref(),
        &mut log,
        &mut manifest,
    )?;
    if let Some(run) = &model_run {
        summary.features = Some(run.model.feature_names.len());
        summary.train_size = Some(run.train_size);
        summary.test_size = Some(run.evaluation.test_size);
        summary.accuracy = Some(run.evaluation.accuracy);
        summary.auc = run.evaluation.auc;
        print_success(&format!(
            "Accuracy {:.4}, AUC {}",
            run.evaluation.accuracy,
            run.evaluation
                .auc
                .map(|a| format!("{:.4}", a))
                .unwrap_or_else(|| "n/a".to_string())
        ));
    }
    summary.record_stage("modeling", started.elapsed());

    // Step 6: reports
    print_step_header(6, "Writing artifacts");
    let started = Instant::now();

    let csv_path = config.artifact_path(CLEAN_CSV_FILE);
    write_clean_csv(&csv_path, &clean_df)
        .with_context(|| format!("Failed to write {}", csv_path.display()))?;
    manifest.push(ArtifactKind::CleanDataset, &csv_path);

    if let Some(run) = &model_run {
        let coef_path = config.artifact_path(COEFFICIENTS_FILE);
        write_coefficients(&coef_path, &run.model.feature_names, &run.model.weights)
            .with_context(|| format!("Failed to write {}", coef_path.display()))?;
        manifest.push(ArtifactKind::Coefficients, &coef_path);
    }

    if config.export_json {
        match &model_run {
            Some(run) => {
                let json_path = config.artifact_path(EVALUATION_JSON_FILE);
                let metadata = RunMetadata {
                    input: config.input.clone(),
                    label: config.label.clone(),
                    test_fraction: config.test_fraction,
                    seed: config.seed,
                    max_iter: config.fit.max_iter,
                    scaling: config.scaling.to_string(),
                    train_size: run.train_size,
                    test_size: run.evaluation.test_size,
                    converged: run.converged,
                    iterations: run.iterations,
                };
                write_evaluation_json(&json_path, &metadata, &run.evaluation, &log.notices)?;
                manifest.push(ArtifactKind::Evaluation, &json_path);
            }
            None => log.push(Notice::info(
                "reporting",
                "No model was fitted - evaluation JSON not written",
            )),
        }
    }

    // Written last among the text artifacts so it carries every notice
    let report_path = config.artifact_path(REPORT_FILE);
    let sections = ReportSections {
        input: config.input.clone(),
        rows,
        columns: cols,
        missingness: missing,
        numeric,
        categorical,
        notes: log.notices.clone(),
        modeling: model_run.as_ref().map(|run| ModelingSection {
            evaluation: run.evaluation.clone(),
            train_size: run.train_size,
            converged: run.converged,
            iterations: run.iterations,
            scaling: config.scaling,
            top_n: config.top_n,
        }),
    };
    write_text_report(&report_path, &sections)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    manifest.push(ArtifactKind::Report, &report_path);

    if config.bundle {
        let zip_path = config.artifact_path(BUNDLE_FILE);
        package_artifacts(&manifest.paths(), &config.output_dir, &zip_path)?;
        manifest.push(ArtifactKind::Bundle, &zip_path);
    }

    print_success(&format!("{} artifact(s) written", manifest.len()));
    summary.record_stage("reporting", started.elapsed());
    summary.warnings = log.warning_count();

    Ok(RunOutcome {
        clean: clean_df,
        model: model_run,
        notices: log.notices,
        manifest,
        summary,
    })
}

/// Create the figures directory. `None` (with a warning) when it cannot be
/// created; every figure is then skipped.
fn prepare_figures_dir(config: &PipelineConfig, log: &mut NoticeLog) -> PipelineResult<Option<PathBuf>> {
    let dir = config.figures_dir();
    let created = std::fs::create_dir_all(&dir).map_err(|e| PipelineError::PlotRender {
        path: dir.clone(),
        reason: format!("figures directory could not be created: {}", e),
    });
    Ok(log.soft("figures", created)?.map(|_| dir))
}

/// Age and fare histograms plus survival rates by sex and class.
fn descriptive_figures(
    df: &DataFrame,
    config: &PipelineConfig,
    figures_dir: &Path,
    log: &mut NoticeLog,
    manifest: &mut ArtifactManifest,
) -> PipelineResult<()> {
    let histograms = [
        (Field::Age, HIST_AGE, "Age distribution", "Age"),
        (Field::Fare, HIST_FARE, "Fare distribution", "Fare"),
    ];
    for (field, file, title, x_desc) in histograms {
        let values = observed_values(df, field)?;
        let path = figures_dir.join(file);
        let rendered = match values {
            Some(values) if !values.is_empty() => plot_histogram(&values, title, x_desc, &path),
            _ => Err(PipelineError::MissingColumn {
                column: field.name().to_string(),
                purpose: format!("figure {}", file),
            }),
        };
        if log.soft("figures", rendered)?.is_some() {
            manifest.push(ArtifactKind::Figure, path);
        }
    }

    let bar_charts = [
        (Field::Sex, SURVIVAL_BY_SEX, "Survival rate by sex", "Sex"),
        (Field::Pclass, SURVIVAL_BY_CLASS, "Survival rate by class", "Passenger class"),
    ];
    for (field, file, title, x_desc) in bar_charts {
        let path = figures_dir.join(file);
        let rendered = match survival_rate_by(df, field.name(), &config.label)? {
            Some(rates) if !rates.is_empty() => plot_survival_rate(&rates, title, x_desc, &path),
            _ => {
                let column = if has_column(df, field.name()) {
                    config.label.clone()
                } else {
                    field.name().to_string()
                };
                Err(PipelineError::MissingColumn {
                    column,
                    purpose: format!("figure {}", file),
                })
            }
        };
        if log.soft("figures", rendered)?.is_some() {
            manifest.push(ArtifactKind::Figure, path);
        }
    }

    Ok(())
}

fn observed_values(df: &DataFrame, field: Field) -> PipelineResult<Option<Vec<f64>>> {
    if !has_column(df, field.name()) {
        return Ok(None);
    }
    let values = float_values(df.column(field.name())?)?;
    Ok(Some(values.into_iter().flatten().collect()))
}

/// Build the matrix, split, fit and evaluate. `None` when modeling was skipped.
fn run_modeling(
    df: &DataFrame,
    config: &PipelineConfig,
    figures_dir: Option<&Path>,
    log: &mut NoticeLog,
    manifest: &mut ArtifactManifest,
) -> Result<Option<ModelRun>> {
    const STAGE: &str = "modeling";

    let encoded = match config.scaling {
        ScalingScope::FullDataset => build_feature_matrix(df, &config.label),
        ScalingScope::TrainOnly => encode_features(df, &config.label),
    };
    let Some(set) = log.soft(STAGE, encoded)? else {
        return Ok(None);
    };
    log.extend(set.notes);
    if set.matrix.n_features() == 0 {
        log.push(Notice::warning(STAGE, "No usable features - fitting an intercept only"));
    }

    let Some(mut partition) = log.soft(
        STAGE,
        stratified_split(&set.matrix, config.test_fraction, config.seed),
    )?
    else {
        return Ok(None);
    };

    let standardizer = match config.scaling {
        ScalingScope::FullDataset => set.standardizer,
        ScalingScope::TrainOnly => {
            let scaler = Standardizer::fit(&partition.train);
            partition.train = scaler.apply(&partition.train);
            partition.test = scaler.apply(&partition.test);
            Some(scaler)
        }
    };

    let outcome = match fit(&partition.train, &config.fit) {
        Ok(outcome) => outcome,
        Err(err) => {
            log.push(Notice::warning(STAGE, format!("Model fit failed: {}", err)));
            return Ok(None);
        }
    };
    if let FitOutcome::NotConverged {
        iterations,
        gradient_norm,
        ..
    } = &outcome
    {
        log.push(Notice::warning(
            STAGE,
            format!(
                "Solver did not converge in {} iterations (gradient norm {:.2e}) - using best parameters",
                iterations, gradient_norm
            ),
        ));
    }

    let converged = outcome.converged();
    let iterations = outcome.iterations();
    let mut model = outcome.into_model();
    model.standardizer = standardizer;

    let evaluation = evaluate(&model, &partition.test);
    if evaluation.auc.is_none() {
        log.push(Notice::warning(
            STAGE,
            "Test partition holds a single class - AUC undefined",
        ));
    }

    if let Some(figures_dir) = figures_dir {
        let roc_path = figures_dir.join(ROC_CURVE);
        if log
            .soft(STAGE, plot_roc_curve(&evaluation.roc, evaluation.auc, &roc_path))?
            .is_some()
        {
            manifest.push(ArtifactKind::Figure, roc_path);
        }
        let cm_path = figures_dir.join(CONFUSION_MATRIX);
        if log
            .soft(STAGE, plot_confusion_matrix(&evaluation.confusion, &cm_path))?
            .is_some()
        {
            manifest.push(ArtifactKind::Figure, cm_path);
        }
    }

    Ok(Some(ModelRun {
        model,
        evaluation,
        train_size: partition.train.n_rows(),
        converged,
        iterations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.input, PathBuf::from("titanic.csv"));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.label, "survived");
        assert_eq!(config.test_fraction, 0.25);
        assert_eq!(config.seed, 42);
        assert_eq!(config.fit.max_iter, 200);
        assert_eq!(config.scaling, ScalingScope::FullDataset);
        assert!(!config.export_json && !config.bundle);
        assert_eq!(config.figures_dir(), PathBuf::from("./figures"));
    }

    #[test]
    fn test_notice_log_soft_errors() {
        let mut log = NoticeLog::default();
        let soft: PipelineResult<()> = Err(PipelineError::Split("too few rows".to_string()));
        assert!(log.soft("modeling", soft).unwrap().is_none());
        assert_eq!(log.warning_count(), 1);

        let fatal: PipelineResult<()> = Err(PipelineError::Io(std::io::Error::other("disk full")));
        assert!(log.soft("reporting", fatal).is_err());
    }

    #[test]
    fn test_missing_input_is_error() {
        let config = PipelineConfig {
            input: PathBuf::from("/no/such/titanic.csv"),
            ..PipelineConfig::default()
        };
        crate::utils::set_quiet(true);
        let err = run_pipeline(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingInput { .. })
        ));
    }
}
