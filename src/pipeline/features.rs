//! Feature matrix construction: column selection, one-hot encoding and
//! standardisation.
//!
//! Standardisation statistics are computed on the full dataset by default,
//! before the train/test split. That leaks test-set information into
//! training; [`ScalingScope::TrainOnly`] fits them on the training partition
//! instead.

use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::columns::{float_values, has_column, is_numeric, string_values};
use super::error::{Notice, PipelineError, PipelineResult};
use super::schema::{engineered, Field, FieldKind};

const STAGE: &str = "features";

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// Columns eligible for modeling, in output order. Anything else is ignored.
pub const FEATURE_ALLOW_LIST: [&str; 15] = [
    "pclass",
    "sex",
    "age",
    "sibsp",
    "parch",
    "fare",
    "embarked",
    engineered::FAMILY_SIZE,
    engineered::IS_ALONE,
    engineered::TITLE,
    "has_cabin",
    "has_boat",
    "has_home_dest",
    "has_ticket",
    "has_name",
];

/// Where standardisation statistics are learned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingScope {
    /// All rows, before splitting (reproduces the historical behaviour)
    #[default]
    FullDataset,
    /// Training partition only, applied to both partitions
    TrainOnly,
}

impl fmt::Display for ScalingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingScope::FullDataset => write!(f, "full"),
            ScalingScope::TrainOnly => write!(f, "train"),
        }
    }
}

impl FromStr for ScalingScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" | "full-dataset" | "full_dataset" => Ok(ScalingScope::FullDataset),
            "train" | "train-only" | "train_only" => Ok(ScalingScope::TrainOnly),
            _ => Err(format!(
                "Invalid scaling scope: '{}'. Use 'full' or 'train'.",
                s
            )),
        }
    }
}

/// How a matrix column was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Standardized numeric column
    Numeric,
    /// 0/1 one-hot indicator, never scaled
    Indicator,
}

/// Dense row-major feature matrix with its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Vec<f64>,
    n_rows: usize,
    pub columns: Vec<String>,
    pub kinds: Vec<ColumnKind>,
    /// Outcome per row, 0.0 or 1.0
    pub labels: Vec<f64>,
    /// Row index in the cleaned frame each matrix row came from
    pub row_ids: Vec<usize>,
}

impl FeatureMatrix {
    /// Build from column vectors of equal length.
    pub fn from_columns(
        columns: Vec<(String, ColumnKind, Vec<f64>)>,
        labels: Vec<f64>,
        row_ids: Vec<usize>,
    ) -> Self {
        let n_rows = labels.len();
        let n_cols = columns.len();
        let mut values = vec![0.0; n_rows * n_cols];
        for (j, (_, _, col)) in columns.iter().enumerate() {
            for (i, v) in col.iter().enumerate() {
                values[i * n_cols + j] = *v;
            }
        }

        Self {
            values,
            n_rows,
            columns: columns.iter().map(|(name, _, _)| name.clone()).collect(),
            kinds: columns.iter().map(|(_, kind, _)| *kind).collect(),
            labels,
            row_ids,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.n_features();
        &self.values[i * n..(i + 1) * n]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n_features() + j]
    }

    pub fn column_values(&self, j: usize) -> Vec<f64> {
        (0..self.n_rows).map(|i| self.get(i, j)).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 1.0).count()
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// New matrix holding the given rows (positions in this matrix), in order.
    pub fn select_rows(&self, rows: &[usize]) -> FeatureMatrix {
        let n = self.n_features();
        let mut values = Vec::with_capacity(rows.len() * n);
        for &i in rows {
            values.extend_from_slice(self.row(i));
        }

        FeatureMatrix {
            values,
            n_rows: rows.len(),
            columns: self.columns.clone(),
            kinds: self.kinds.clone(),
            labels: rows.iter().map(|&i| self.labels[i]).collect(),
            row_ids: rows.iter().map(|&i| self.row_ids[i]).collect(),
        }
    }
}

/// Per-column mean and standard deviation for the numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standardizer {
    /// (column index, mean, std)
    pub params: Vec<(usize, f64, f64)>,
}

impl Standardizer {
    /// Learn population mean/std of every numeric column of `matrix`.
    ///
    /// A zero std (possible on a partition even when the column varies
    /// overall) is replaced with 1 so the column centres to 0.
    pub fn fit(matrix: &FeatureMatrix) -> Self {
        let params = matrix
            .kinds
            .iter()
            .enumerate()
            .filter(|(_, kind)| **kind == ColumnKind::Numeric)
            .map(|(j, _)| {
                let (mean, std) = mean_std(&matrix.column_values(j));
                (j, mean, if std > 0.0 { std } else { 1.0 })
            })
            .collect();
        Self { params }
    }

    pub fn apply(&self, matrix: &FeatureMatrix) -> FeatureMatrix {
        let mut out = matrix.clone();
        let n = out.n_features();
        for i in 0..out.n_rows {
            for &(j, mean, std) in &self.params {
                let v = &mut out.values[i * n + j];
                *v = (*v - mean) / std;
            }
        }
        out
    }
}

/// Population mean and standard deviation.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Encoded matrix plus the notices raised while building it
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub matrix: FeatureMatrix,
    /// Present when the matrix is already standardized
    pub standardizer: Option<Standardizer>,
    pub notes: Vec<Notice>,
}

/// Read the outcome column as optional 0/1 values.
///
/// Fails with `MissingLabel` when the column is absent and `InvalidLabel` when
/// it holds anything other than 0/1 or has no observed values.
pub fn extract_labels(df: &DataFrame, label: &str) -> PipelineResult<Vec<Option<f64>>> {
    if !has_column(df, label) {
        return Err(PipelineError::MissingLabel {
            column: label.to_string(),
        });
    }

    let col = df.column(label)?;
    if !is_numeric(col) && col.dtype() != &DataType::Boolean {
        return Err(PipelineError::InvalidLabel {
            column: label.to_string(),
            detail: format!("expected 0/1 values, found {} column", col.dtype()),
        });
    }

    let values = float_values(col)?;
    if let Some(bad) = values
        .iter()
        .flatten()
        .find(|v| (*v - 0.0).abs() > TOLERANCE && (*v - 1.0).abs() > TOLERANCE)
    {
        return Err(PipelineError::InvalidLabel {
            column: label.to_string(),
            detail: format!("found value {}", bad),
        });
    }
    if values.iter().all(Option::is_none) {
        return Err(PipelineError::InvalidLabel {
            column: label.to_string(),
            detail: "no observed values".to_string(),
        });
    }

    Ok(values
        .into_iter()
        .map(|v| v.map(|x| if (x - 1.0).abs() <= TOLERANCE { 1.0 } else { 0.0 }))
        .collect())
}

/// Select allow-listed columns and one-hot encode, without scaling.
///
/// Numeric columns come first (allow-list order), followed by the indicator
/// columns of each categorical column. Rows with a missing label are dropped.
pub fn encode_features(df: &DataFrame, label: &str) -> PipelineResult<FeatureSet> {
    let labels = extract_labels(df, label)?;
    let mut notes = Vec::new();

    let row_ids: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter_map(|(i, y)| y.map(|_| i))
        .collect();
    let dropped = labels.len() - row_ids.len();
    if dropped > 0 {
        notes.push(Notice::warning(
            STAGE,
            format!("{} row(s) without '{}' excluded from modeling", dropped, label),
        ));
    }
    let y: Vec<f64> = row_ids.iter().filter_map(|&i| labels[i]).collect();

    let selected: Vec<&str> = FEATURE_ALLOW_LIST
        .iter()
        .copied()
        .filter(|name| *name != label && has_column(df, name))
        .collect();

    let mut numeric: Vec<(String, ColumnKind, Vec<f64>)> = Vec::new();
    let mut indicators: Vec<(String, ColumnKind, Vec<f64>)> = Vec::new();

    for name in selected {
        let col = df.column(name)?;
        // Nominal fields are one-hot encoded even when stored as numbers
        let nominal = Field::from_name(name).map(Field::kind) == Some(FieldKind::Nominal);
        if is_numeric(col) && !nominal {
            let all = float_values(col)?;
            let kept: Vec<Option<f64>> = row_ids.iter().map(|&i| all[i]).collect();
            if let Some(values) = prepare_numeric(name, kept, &mut notes) {
                numeric.push((name.to_string(), ColumnKind::Numeric, values));
            }
        } else {
            let all = string_values(col)?;
            let kept: Vec<Option<String>> = row_ids.iter().map(|&i| all[i].clone()).collect();
            indicators.extend(
                one_hot(name, &kept)
                    .into_iter()
                    .map(|(n, v)| (n, ColumnKind::Indicator, v)),
            );
        }
    }

    numeric.extend(indicators);
    Ok(FeatureSet {
        matrix: FeatureMatrix::from_columns(numeric, y, row_ids),
        standardizer: None,
        notes,
    })
}

/// Encode and standardize with statistics from every row.
pub fn build_feature_matrix(df: &DataFrame, label: &str) -> PipelineResult<FeatureSet> {
    let mut set = encode_features(df, label)?;
    let standardizer = Standardizer::fit(&set.matrix);
    set.matrix = standardizer.apply(&set.matrix);
    set.standardizer = Some(standardizer);
    Ok(set)
}

/// Fill remaining gaps with the column mean; drop columns that cannot be
/// standardized.
fn prepare_numeric(name: &str, values: Vec<Option<f64>>, notes: &mut Vec<Notice>) -> Option<Vec<f64>> {
    let observed: Vec<f64> = values.iter().flatten().copied().collect();
    if observed.is_empty() {
        notes.push(Notice::warning(
            STAGE,
            format!("'{}' has no observed values - excluded from the matrix", name),
        ));
        return None;
    }

    let (mean, std) = mean_std(&observed);
    if std == 0.0 {
        notes.push(Notice::info(
            STAGE,
            format!("'{}' is constant - excluded from the matrix", name),
        ));
        return None;
    }

    let missing = values.len() - observed.len();
    if missing > 0 {
        notes.push(Notice::info(
            STAGE,
            format!("Filled {} missing value(s) in '{}' with its mean", missing, name),
        ));
    }

    Some(values.into_iter().map(|v| v.unwrap_or(mean)).collect())
}

/// One-hot encode with the first (lexicographically smallest) level dropped.
///
/// A column with k observed levels yields k - 1 indicator columns named
/// `<column>_<level>`; missing values encode as all zeros.
pub fn one_hot(name: &str, values: &[Option<String>]) -> Vec<(String, Vec<f64>)> {
    let mut levels: Vec<&str> = values.iter().flatten().map(String::as_str).collect();
    levels.sort_unstable();
    levels.dedup();

    levels
        .iter()
        .skip(1)
        .map(|level| {
            let indicator = values
                .iter()
                .map(|v| if v.as_deref() == Some(*level) { 1.0 } else { 0.0 })
                .collect();
            (format!("{}_{}", name, level), indicator)
        })
        .collect()
}

/// Default label column
pub fn default_label() -> &'static str {
    Field::Survived.name()
}
