//! End-of-run console summary

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use super::export::ArtifactManifest;

/// Headline numbers of a pipeline run
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub rows: usize,
    pub columns: usize,
    pub engineered_columns: usize,
    pub features: Option<usize>,
    pub train_size: Option<usize>,
    pub test_size: Option<usize>,
    pub accuracy: Option<f64>,
    pub auc: Option<f64>,
    pub warnings: usize,
    pub stage_timings: Vec<(&'static str, Duration)>,
}

impl RunSummary {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            ..Default::default()
        }
    }

    pub fn record_stage(&mut self, stage: &'static str, elapsed: Duration) {
        self.stage_timings.push((stage, elapsed));
    }

    pub fn total_time(&self) -> Duration {
        self.stage_timings.iter().map(|(_, d)| *d).sum()
    }

    pub fn modeled(&self) -> bool {
        self.accuracy.is_some()
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("Rows"), Cell::new(self.rows)]);
        table.add_row(vec![Cell::new("Columns (raw)"), Cell::new(self.columns)]);
        table.add_row(vec![
            Cell::new("Engineered columns"),
            Cell::new(self.engineered_columns),
        ]);

        let dash = || Cell::new("-").fg(Color::DarkGrey);
        table.add_row(vec![
            Cell::new("Model features"),
            self.features.map(Cell::new).unwrap_or_else(dash),
        ]);

        let split = match (self.train_size, self.test_size) {
            (Some(train), Some(test)) => Cell::new(format!("{} / {}", train, test)),
            _ => dash(),
        };
        table.add_row(vec![Cell::new("Train / test rows"), split]);

        table.add_row(vec![
            Cell::new("Accuracy"),
            self.accuracy
                .map(|a| {
                    Cell::new(format!("{:.4}", a))
                        .fg(Color::Green)
                        .add_attribute(Attribute::Bold)
                })
                .unwrap_or_else(dash),
        ]);
        table.add_row(vec![
            Cell::new("AUC"),
            match (self.modeled(), self.auc) {
                (true, Some(auc)) => Cell::new(format!("{:.4}", auc))
                    .fg(Color::Green)
                    .add_attribute(Attribute::Bold),
                (true, None) => Cell::new("n/a").fg(Color::Yellow),
                (false, _) => dash(),
            },
        ]);

        table.add_row(vec![
            Cell::new("Warnings"),
            Cell::new(self.warnings).fg(if self.warnings == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);

        table.add_row(vec![
            Cell::new("Total time"),
            Cell::new(format!("{:.2}s", self.total_time().as_secs_f64())),
        ]);

        table
    }

    pub fn display(&self, manifest: &ArtifactManifest) {
        println!();
        println!("    {}", style("RUN SUMMARY").white().bold());
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        // Indent the table
        for line in self.table().to_string().lines() {
            println!("    {}", line);
        }

        if !self.stage_timings.is_empty() {
            println!();
            println!("    {}", style("STAGE TIMINGS").white().bold());
            println!("    {}", style("─".repeat(50)).dim());
            for (stage, elapsed) in &self.stage_timings {
                println!(
                    "      {:<16} {}",
                    stage,
                    style(format!("{:.2}s", elapsed.as_secs_f64())).dim()
                );
            }
        }

        println!();
        println!(
            "    {} {}",
            style("ARTIFACTS").white().bold(),
            style(format!("({})", manifest.len())).dim()
        );
        println!("    {}", style("─".repeat(50)).dim());
        for artifact in &manifest.artifacts {
            println!(
                "      {} {:<14} {}",
                style("•").dim(),
                style(artifact.kind.to_string()).cyan(),
                artifact.path.display()
            );
        }
    }
}
