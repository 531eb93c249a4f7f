//! Artifact writers: cleaned CSV, coefficient table, JSON evaluation and
//! the optional zip bundle

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;
use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipWriter};

use crate::pipeline::error::{Notice, PipelineResult};
use crate::pipeline::evaluation::{rank_coefficients, EvaluationResult};

pub const REPORT_FILE: &str = "analysis_report.txt";
pub const CLEAN_CSV_FILE: &str = "clean_dataset.csv";
pub const COEFFICIENTS_FILE: &str = "logistic_coefficients.csv";
pub const EVALUATION_JSON_FILE: &str = "evaluation.json";
pub const BUNDLE_FILE: &str = "analysis_bundle.zip";

/// What an emitted file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Report,
    CleanDataset,
    Coefficients,
    Figure,
    Evaluation,
    Bundle,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArtifactKind::Report => "report",
            ArtifactKind::CleanDataset => "clean dataset",
            ArtifactKind::Coefficients => "coefficients",
            ArtifactKind::Figure => "figure",
            ArtifactKind::Evaluation => "evaluation",
            ArtifactKind::Bundle => "bundle",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Files written by a run, in the order they were produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtifactManifest {
    pub artifacts: Vec<Artifact>,
}

impl ArtifactManifest {
    pub fn push(&mut self, kind: ArtifactKind, path: impl Into<PathBuf>) {
        self.artifacts.push(Artifact {
            kind,
            path: path.into(),
        });
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.artifacts.iter().map(|a| a.path.as_path()).collect()
    }

    /// Whether an artifact with this file name was emitted.
    pub fn contains_file(&self, file_name: &str) -> bool {
        self.artifacts
            .iter()
            .any(|a| a.path.file_name().and_then(|n| n.to_str()) == Some(file_name))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Write the cleaned frame, engineered columns included.
pub fn write_clean_csv(path: &Path, df: &DataFrame) -> PipelineResult<()> {
    let mut file = File::create(path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    Ok(())
}

/// Write `feature,weight` rows sorted by weight descending.
pub fn write_coefficients(path: &Path, names: &[String], weights: &[f64]) -> PipelineResult<()> {
    let mut file = File::create(path)?;
    writeln!(file, "feature,weight")?;
    for coef in rank_coefficients(names, weights) {
        writeln!(file, "{},{}", escape_csv_field(&coef.feature), coef.weight)?;
    }
    Ok(())
}

/// Escape a field for CSV (handle commas and quotes)
pub fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Run settings recorded alongside the evaluation
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub input: PathBuf,
    pub label: String,
    pub test_fraction: f64,
    pub seed: u64,
    pub max_iter: usize,
    pub scaling: String,
    pub train_size: usize,
    pub test_size: usize,
    pub converged: bool,
    pub iterations: usize,
}

#[derive(Debug, Serialize)]
struct EvaluationExport<'a> {
    tool: &'static str,
    version: &'static str,
    generated_at: String,
    run: &'a RunMetadata,
    evaluation: &'a EvaluationResult,
    notices: &'a [Notice],
}

/// Export the evaluation with run metadata as pretty JSON.
pub fn write_evaluation_json(
    path: &Path,
    run: &RunMetadata,
    evaluation: &EvaluationResult,
    notices: &[Notice],
) -> Result<()> {
    let export = EvaluationExport {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        generated_at: Utc::now().to_rfc3339(),
        run,
        evaluation,
        notices,
    };

    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize evaluation to JSON")?;

    std::fs::write(path, json)
        .with_context(|| format!("Failed to write evaluation to {}", path.display()))?;

    Ok(())
}

/// Package artifacts into a zip archive.
///
/// Entry names are relative to `base_dir` so the `figures/` layout survives;
/// the source files are left in place.
pub fn package_artifacts(paths: &[&Path], base_dir: &Path, zip_path: &Path) -> Result<()> {
    let zip_file = File::create(zip_path)
        .with_context(|| format!("Failed to create zip file: {}", zip_path.display()))?;

    let mut zip = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for &path in paths {
        let entry = path
            .strip_prefix(base_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        zip.start_file(entry.as_str(), options)
            .with_context(|| format!("Failed to add {} to zip", entry))?;

        let mut content = Vec::new();
        File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?
            .read_to_end(&mut content)?;
        zip.write_all(&content)?;
    }

    zip.finish().context("Failed to finalize zip file")?;
    Ok(())
}
