//! Missing-data policy and feature engineering
//!
//! `clean` never mutates its input. Each step is skipped (with a notice) when
//! its source column is absent.

use std::collections::HashMap;
use std::sync::LazyLock;

use polars::prelude::*;
use ::regex::Regex;

use super::columns::{float_values, format_number, has_column, is_numeric, missing_mask, string_values};
use super::error::{Notice, PipelineError, PipelineResult};
use super::schema::{engineered, Field};

const STAGE: &str = "cleaning";

/// Nominal fields filled with their most frequent value
pub const MODE_IMPUTED: [Field; 2] = [Field::Sex, Field::Embarked];

/// Numeric fields filled with their median
pub const MEDIAN_IMPUTED: [Field; 2] = [Field::Age, Field::Fare];

/// Optionally populated fields that get a `has_<field>` indicator
pub const PRESENCE_INDICATORS: [Field; 5] = [
    Field::Cabin,
    Field::Boat,
    Field::HomeDest,
    Field::Ticket,
    Field::Name,
];

static TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([^\.]+)\.").expect("Invalid title pattern"));

/// Cleaned frame plus a record of what was done to it
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub frame: DataFrame,
    pub notes: Vec<Notice>,
}

/// Apply the missing-data policy and derive engineered columns.
///
/// Order matters: aliases are resolved first, then imputation, then derived
/// features, which read the aliased and imputed columns.
pub fn clean(raw: &DataFrame) -> PipelineResult<CleanOutcome> {
    let mut df = raw.clone();
    let mut notes = Vec::new();

    resolve_aliases(&mut df, &mut notes)?;

    for field in MODE_IMPUTED {
        impute_mode(&mut df, field, &mut notes)?;
    }
    for field in MEDIAN_IMPUTED {
        impute_median(&mut df, field, &mut notes)?;
    }
    for field in PRESENCE_INDICATORS {
        add_presence_indicator(&mut df, field, &mut notes)?;
    }

    add_title(&mut df, &mut notes)?;
    add_family_size(&mut df, &mut notes)?;

    Ok(CleanOutcome { frame: df, notes })
}

fn skipped(notes: &mut Vec<Notice>, field: Field, purpose: &str) {
    let err = PipelineError::MissingColumn {
        column: field.name().to_string(),
        purpose: purpose.to_string(),
    };
    notes.push(Notice::info(STAGE, err.to_string()));
}

fn resolve_aliases(df: &mut DataFrame, notes: &mut Vec<Notice>) -> PipelineResult<()> {
    for field in Field::ALL {
        if has_column(df, field.name()) {
            continue;
        }
        if let Some(alias) = field.aliases().iter().find(|a| has_column(df, a)) {
            df.rename(alias, field.name().into())?;
            notes.push(Notice::info(
                STAGE,
                format!("Renamed '{}' to '{}'", alias, field.name()),
            ));
        }
    }
    Ok(())
}

/// Most frequent observed value; ties go to the smallest value.
pub fn mode_of<T: Clone + PartialOrd + std::hash::Hash + Eq>(values: &[Option<T>]) -> Option<T> {
    let mut counts: HashMap<&T, usize> = HashMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| {
            ca.cmp(cb)
                .then_with(|| vb.partial_cmp(va).unwrap_or(std::cmp::Ordering::Equal))
        })
        .map(|(v, _)| v.clone())
}

/// Median of observed values.
pub fn median_of(values: &[Option<f64>]) -> Option<f64> {
    let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
    if observed.is_empty() {
        return None;
    }
    observed.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = observed.len() / 2;
    if observed.len() % 2 == 0 {
        Some((observed[mid - 1] + observed[mid]) / 2.0)
    } else {
        Some(observed[mid])
    }
}

fn impute_mode(df: &mut DataFrame, field: Field, notes: &mut Vec<Notice>) -> PipelineResult<()> {
    let name = field.name();
    if !has_column(df, name) {
        skipped(notes, field, "mode imputation");
        return Ok(());
    }

    let col = df.column(name)?.clone();
    let missing = missing_mask(&col)?.into_iter().filter(|m| *m).count();

    let (filled, shown) = if is_numeric(&col) {
        let values = float_values(&col)?;
        let Some(mode) = numeric_mode(&values) else {
            notes.push(Notice::warning(
                STAGE,
                format!("'{}' has no observed values - mode imputation skipped", name),
            ));
            return Ok(());
        };
        let filled: Vec<Option<f64>> = values.iter().map(|v| Some(v.unwrap_or(mode))).collect();
        let column = Column::new(name.into(), filled).cast(col.dtype())?;
        (column, format_number(mode))
    } else {
        let values = string_values(&col)?;
        let Some(mode) = mode_of(&values) else {
            notes.push(Notice::warning(
                STAGE,
                format!("'{}' has no observed values - mode imputation skipped", name),
            ));
            return Ok(());
        };
        let filled: Vec<String> = values
            .into_iter()
            .map(|v| v.unwrap_or_else(|| mode.clone()))
            .collect();
        (Column::new(name.into(), filled), mode)
    };

    df.with_column(filled)?;
    notes.push(Notice::info(
        STAGE,
        format!("Filled {} missing value(s) in '{}' with mode '{}'", missing, name, shown),
    ));
    Ok(())
}

/// Numeric counterpart of [`mode_of`]; f64 is not `Hash`, so counts are
/// keyed on the bit pattern.
fn numeric_mode(values: &[Option<f64>]) -> Option<f64> {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v.to_bits()).or_insert(0) += 1;
    }
    let max = counts.values().copied().max()?;
    values
        .iter()
        .flatten()
        .copied()
        .filter(|v| counts.get(&v.to_bits()) == Some(&max))
        .fold(None, |best: Option<f64>, v| match best {
            Some(b) if b <= v => Some(b),
            _ => Some(v),
        })
}

fn impute_median(df: &mut DataFrame, field: Field, notes: &mut Vec<Notice>) -> PipelineResult<()> {
    let name = field.name();
    if !has_column(df, name) {
        skipped(notes, field, "median imputation");
        return Ok(());
    }

    let col = df.column(name)?;
    let absent = missing_mask(col)?;
    let values = float_values(col)?;
    // Present cells that do not parse as numbers
    let coerced = values
        .iter()
        .zip(&absent)
        .filter(|(v, was_null)| v.is_none() && !**was_null)
        .count();
    if coerced > 0 {
        notes.push(Notice::warning(
            STAGE,
            format!(
                "{} non-numeric value(s) in '{}' treated as missing",
                coerced, name
            ),
        ));
    }

    let Some(median) = median_of(&values) else {
        notes.push(Notice::warning(
            STAGE,
            format!("'{}' has no observed values - median imputation skipped", name),
        ));
        return Ok(());
    };

    let missing = values.iter().filter(|v| v.is_none()).count();
    let filled: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(median)).collect();
    df.with_column(Column::new(name.into(), filled))?;

    notes.push(Notice::info(
        STAGE,
        format!(
            "Filled {} missing value(s) in '{}' with median {}",
            missing,
            name,
            format_number(median)
        ),
    ));
    Ok(())
}

fn add_presence_indicator(
    df: &mut DataFrame,
    field: Field,
    notes: &mut Vec<Notice>,
) -> PipelineResult<()> {
    if !has_column(df, field.name()) {
        skipped(notes, field, "presence indicator");
        return Ok(());
    }

    let present: Vec<i32> = missing_mask(df.column(field.name())?)?
        .into_iter()
        .map(|missing| if missing { 0 } else { 1 })
        .collect();
    df.with_column(Column::new(field.indicator_name().into(), present))?;
    Ok(())
}

/// Honorific between the first `, ` and the following `.`, trimmed.
///
/// `"Braund, Mr. Owen Harris"` gives `Some("Mr")`; names without the pattern
/// give `None`.
pub fn extract_title(name: &str) -> Option<String> {
    TITLE_PATTERN
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Replace titles seen fewer than `min_count` times with the rare bucket.
pub fn collapse_rare_titles(titles: Vec<Option<String>>, min_count: usize) -> Vec<Option<String>> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for t in titles.iter().flatten() {
        *counts.entry(t.clone()).or_insert(0) += 1;
    }

    titles
        .into_iter()
        .map(|t| {
            t.map(|t| {
                if counts.get(&t).copied().unwrap_or(0) < min_count {
                    engineered::RARE_TITLE.to_string()
                } else {
                    t
                }
            })
        })
        .collect()
}

fn add_title(df: &mut DataFrame, notes: &mut Vec<Notice>) -> PipelineResult<()> {
    if !has_column(df, Field::Name.name()) {
        skipped(notes, Field::Name, "title extraction");
        return Ok(());
    }

    let titles: Vec<Option<String>> = string_values(df.column(Field::Name.name())?)?
        .into_iter()
        .map(|name| name.as_deref().and_then(extract_title))
        .collect();

    let unmatched = titles.iter().filter(|t| t.is_none()).count();
    if unmatched > 0 {
        notes.push(Notice::info(
            STAGE,
            format!("{} name(s) without a recognisable title", unmatched),
        ));
    }

    let titles = collapse_rare_titles(titles, engineered::RARE_TITLE_MIN_COUNT);
    df.with_column(Column::new(engineered::TITLE.into(), titles))?;
    Ok(())
}

fn add_family_size(df: &mut DataFrame, notes: &mut Vec<Notice>) -> PipelineResult<()> {
    let rows = df.height();
    let mut counts = |field: Field| -> PipelineResult<Vec<f64>> {
        if has_column(df, field.name()) {
            Ok(float_values(df.column(field.name())?)?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect())
        } else {
            notes.push(Notice::info(
                STAGE,
                format!("'{}' not found - counted as 0 in family size", field.name()),
            ));
            Ok(vec![0.0; rows])
        }
    };

    let sibsp = counts(Field::SibSp)?;
    let parch = counts(Field::Parch)?;

    let family_size: Vec<f64> = sibsp
        .iter()
        .zip(parch.iter())
        .map(|(s, p)| s + p + 1.0)
        .collect();
    let is_alone: Vec<i32> = family_size
        .iter()
        .map(|&f| if f == 1.0 { 1 } else { 0 })
        .collect();

    df.with_column(Column::new(engineered::FAMILY_SIZE.into(), family_size))?;
    df.with_column(Column::new(engineered::IS_ALONE.into(), is_alone))?;
    Ok(())
}
