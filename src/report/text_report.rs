//! Plain-text analysis report
//!
//! Sections are always written in the same order: missingness, numeric
//! summary, categorical summaries, cleaning notes, then modeling results
//! when a model was fitted.

use std::path::{Path, PathBuf};

use comfy_table::{presets::ASCII_FULL_CONDENSED, CellAlignment, Table};

use crate::pipeline::diagnostics::{CategoricalSummary, MissingEntry, NumericSummary, SUMMARY_PERCENTILES};
use crate::pipeline::error::{Notice, NoticeLevel, PipelineResult};
use crate::pipeline::evaluation::EvaluationResult;
use crate::pipeline::features::ScalingScope;

/// Modeling results; absent when modeling was skipped.
#[derive(Debug, Clone)]
pub struct ModelingSection {
    pub evaluation: EvaluationResult,
    pub train_size: usize,
    pub converged: bool,
    pub iterations: usize,
    pub scaling: ScalingScope,
    pub top_n: usize,
}

/// Everything the text report renders
#[derive(Debug, Clone)]
pub struct ReportSections {
    pub input: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub missingness: Vec<MissingEntry>,
    pub numeric: Vec<NumericSummary>,
    pub categorical: Vec<CategoricalSummary>,
    pub notes: Vec<Notice>,
    pub modeling: Option<ModelingSection>,
}

pub const MISSING_HEADING: &str = "MISSING VALUES";
pub const NUMERIC_HEADING: &str = "NUMERIC SUMMARY";
pub const CATEGORICAL_HEADING: &str = "CATEGORICAL SUMMARIES";
pub const NOTES_HEADING: &str = "CLEANING NOTES";
pub const MODELING_HEADING: &str = "MODELING RESULTS";

/// Write the report, replacing any previous file.
pub fn write_text_report(path: &Path, sections: &ReportSections) -> PipelineResult<()> {
    std::fs::write(path, render_text_report(sections))?;
    Ok(())
}

pub fn render_text_report(sections: &ReportSections) -> String {
    let mut out = String::new();
    out.push_str("SURVEY ANALYSIS REPORT\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');
    out.push_str(&format!("Input: {}\n", sections.input.display()));
    out.push_str(&format!(
        "Rows: {}  Columns: {}\n",
        sections.rows, sections.columns
    ));

    heading(&mut out, 1, MISSING_HEADING);
    out.push_str(&missing_table(&sections.missingness));

    heading(&mut out, 2, NUMERIC_HEADING);
    if sections.numeric.is_empty() {
        out.push_str("No numeric columns.\n");
    } else {
        out.push_str(&numeric_table(&sections.numeric));
    }

    heading(&mut out, 3, CATEGORICAL_HEADING);
    if sections.categorical.is_empty() {
        out.push_str("No categorical columns.\n");
    }
    for summary in &sections.categorical {
        out.push_str(&format!("\n[{}]\n", summary.column));
        out.push_str(&categorical_table(summary));
    }

    heading(&mut out, 4, NOTES_HEADING);
    if sections.notes.is_empty() {
        out.push_str("None.\n");
    }
    for note in &sections.notes {
        let level = match note.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
        };
        out.push_str(&format!("- [{}] {}: {}\n", level, note.stage, note.message));
    }

    if let Some(modeling) = &sections.modeling {
        heading(&mut out, 5, MODELING_HEADING);
        out.push_str(&modeling_section(modeling));
    }

    out
}

fn heading(out: &mut String, number: usize, title: &str) {
    out.push('\n');
    out.push_str(&format!("{}. {}\n", number, title));
    out.push_str(&"-".repeat(60));
    out.push('\n');
}

fn new_table(header: Vec<String>) -> Table {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL_CONDENSED);
    table.set_header(header);
    table
}

fn finish(table: Table) -> String {
    format!("{}\n", table)
}

fn missing_table(entries: &[MissingEntry]) -> String {
    let mut table = new_table(vec!["Column".into(), "Missing".into(), "Percent".into()]);
    for entry in entries {
        table.add_row(vec![
            entry.column.clone(),
            entry.count.to_string(),
            format!("{:.2}", entry.percent),
        ]);
    }
    align_numeric(&mut table, 1);
    finish(table)
}

fn numeric_table(summaries: &[NumericSummary]) -> String {
    let mut header: Vec<String> = ["Column", "count", "mean", "std", "min"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(SUMMARY_PERCENTILES.iter().map(|q| format!("{}%", (q * 100.0).round())));
    header.push("max".to_string());

    let mut table = new_table(header);
    for s in summaries {
        let mut row = vec![s.column.clone(), s.count.to_string(), fmt_opt(s.mean), fmt_opt(s.std), fmt_opt(s.min)];
        row.extend(s.percentiles.iter().map(|p| fmt_opt(*p)));
        row.push(fmt_opt(s.max));
        table.add_row(row);
    }
    align_numeric(&mut table, 1);
    finish(table)
}

fn categorical_table(summary: &CategoricalSummary) -> String {
    let mut table = new_table(vec!["Value".into(), "Count".into()]);
    for (value, count) in &summary.counts {
        table.add_row(vec![value.clone(), count.to_string()]);
    }
    align_numeric(&mut table, 1);
    finish(table)
}

fn modeling_section(m: &ModelingSection) -> String {
    let eval = &m.evaluation;
    let mut out = String::new();

    out.push_str(&format!(
        "Train rows: {}  Test rows: {}\n",
        m.train_size, eval.test_size
    ));
    out.push_str(&format!(
        "Solver: {} after {} iteration(s)\n",
        if m.converged { "converged" } else { "did NOT converge" },
        m.iterations
    ));
    match m.scaling {
        ScalingScope::FullDataset => out.push_str(
            "Scaling: statistics computed on the full dataset (test rows influence the scaler)\n",
        ),
        ScalingScope::TrainOnly => {
            out.push_str("Scaling: statistics computed on the training partition only\n")
        }
    }

    out.push_str(&format!("\nAccuracy: {:.4}\n", eval.accuracy));
    match eval.auc {
        Some(auc) => out.push_str(&format!("AUC: {:.4}\n", auc)),
        None => out.push_str("AUC: n/a (test partition holds a single class)\n"),
    }

    out.push_str("\nConfusion matrix (rows = actual, columns = predicted):\n");
    let grid = eval.confusion.as_grid();
    let mut table = new_table(vec!["".into(), "pred 0".into(), "pred 1".into()]);
    for (label, row) in ["actual 0", "actual 1"].iter().zip(grid.iter()) {
        table.add_row(vec![label.to_string(), row[0].to_string(), row[1].to_string()]);
    }
    align_numeric(&mut table, 1);
    out.push_str(&finish(table));

    out.push_str("\nClassification report:\n");
    out.push_str(&eval.classification_report());
    out.push('\n');

    out.push_str(&format!(
        "\nIntercept: {:.4}\nStrongest coefficients (top {} by magnitude):\n",
        eval.intercept, m.top_n
    ));
    let mut table = new_table(vec!["Feature".into(), "Weight".into()]);
    for coef in eval.strongest_coefficients(m.top_n) {
        table.add_row(vec![coef.feature.clone(), format!("{:+.4}", coef.weight)]);
    }
    align_numeric(&mut table, 1);
    out.push_str(&finish(table));

    out
}

/// Right-align every column from `first` onwards.
fn align_numeric(table: &mut Table, first: usize) {
    let n = table.column_count();
    for idx in first..n {
        if let Some(column) = table.column_mut(idx) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{:.3}", x),
        None => "NaN".to_string(),
    }
}
