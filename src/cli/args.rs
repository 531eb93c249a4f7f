//! Command-line argument definitions using clap

use std::path::PathBuf;

use clap::Parser;

use crate::pipeline::features::{default_label, ScalingScope};
use crate::pipeline::model::FitConfig;
use crate::pipeline::runner::PipelineConfig;

/// surveyfit - clean, profile and model a passenger survey table
///
/// Running without arguments analyses `titanic.csv` in the current directory
/// and writes every artifact next to it.
#[derive(Parser, Debug)]
#[command(name = "surveyfit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input CSV file
    #[arg(short, long, default_value = "titanic.csv")]
    pub input: PathBuf,

    /// Directory for the report, cleaned CSV, coefficients and figures/
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Binary outcome column (after header normalisation)
    #[arg(long, default_value = default_label())]
    pub label: String,

    /// Share of rows held out for evaluation (exclusive range 0..1)
    #[arg(long, default_value = "0.25", value_parser = validate_test_fraction)]
    pub test_fraction: f64,

    /// Seed for the stratified split
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Iteration cap for the logistic regression solver
    #[arg(long, default_value = "200")]
    pub max_iter: usize,

    /// Entries per categorical summary and coefficients listed in the report
    #[arg(long, default_value = "10")]
    pub top_n: usize,

    /// Where standardisation statistics are learned: "full" (all rows,
    /// before the split) or "train" (training partition only)
    #[arg(long, default_value = "full")]
    pub scaling: ScalingScope,

    /// Number of rows to use for schema inference.
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Also write evaluation.json with metrics and run metadata
    #[arg(long, default_value = "false")]
    pub json: bool,

    /// Also package every artifact into analysis_bundle.zip
    #[arg(long, default_value = "false")]
    pub bundle: bool,

    /// Suppress console output
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Cli {
    /// Pipeline settings for this invocation.
    pub fn into_config(self) -> PipelineConfig {
        PipelineConfig {
            input: self.input,
            output_dir: self.output_dir,
            label: self.label,
            test_fraction: self.test_fraction,
            seed: self.seed,
            fit: FitConfig {
                max_iter: self.max_iter,
                ..FitConfig::default()
            },
            top_n: self.top_n,
            scaling: self.scaling,
            infer_schema_length: self.infer_schema_length,
            export_json: self.json,
            bundle: self.bundle,
        }
    }
}

/// Validator for test_fraction parameter
fn validate_test_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "test_fraction must be strictly between 0.0 and 1.0, got {}",
            value
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_test_fraction() {
        assert_eq!(validate_test_fraction("0.3"), Ok(0.3));
        assert!(validate_test_fraction("0").is_err());
        assert!(validate_test_fraction("1.0").is_err());
        assert!(validate_test_fraction("abc").is_err());
    }
}
