//! Dataset loader for delimited survey tables

use std::path::Path;

use polars::prelude::*;

use super::error::{PipelineError, PipelineResult};
use super::schema::normalize_header;

/// Cell values read as missing in every column, in addition to empty fields.
/// The set matches the tokens common dataframe tools treat as NA.
pub const NULL_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Load a CSV table and normalize its column names.
///
/// Fails with [`PipelineError::MissingInput`] when the path is not a readable
/// file or the contents cannot be parsed as a table. This is the only error
/// that aborts a run.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> PipelineResult<DataFrame> {
    let missing = |reason: String| PipelineError::MissingInput {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(missing("no such file".to_string()));
    }

    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(schema_length)
        .with_null_values(Some(NullValues::AllColumns(
            NULL_TOKENS.iter().map(|t| (*t).into()).collect(),
        )))
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| missing(e.to_string()))?;

    normalize_columns(df)
}

/// Rename every column to its normalized form.
pub fn normalize_columns(mut df: DataFrame) -> PipelineResult<DataFrame> {
    let raw: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let normalized = normalize_header(&raw);

    if normalized != raw {
        df.set_column_names(normalized)?;
    }

    Ok(df)
}

/// Row count, column count and estimated in-memory size (MB).
pub fn dataset_stats(df: &DataFrame) -> (usize, usize, f64) {
    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    (rows, cols, memory_mb)
}
