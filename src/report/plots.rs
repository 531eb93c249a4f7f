//! Diagnostic figures rendered to SVG with plotters

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::pipeline::diagnostics::GroupRate;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::evaluation::{ConfusionMatrix, RocPoint};

pub const HIST_AGE: &str = "hist_age.svg";
pub const HIST_FARE: &str = "hist_fare.svg";
pub const SURVIVAL_BY_SEX: &str = "survival_by_sex.svg";
pub const SURVIVAL_BY_CLASS: &str = "survival_by_class.svg";
pub const ROC_CURVE: &str = "roc_curve.svg";
pub const CONFUSION_MATRIX: &str = "confusion_matrix.svg";

pub const HISTOGRAM_BINS: usize = 30;

const FIGURE_SIZE: (u32, u32) = (800, 600);
const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);
const CURVE_COLOR: RGBColor = RGBColor(214, 39, 40);
const CLASS_NAMES: [&str; 2] = ["Did not survive", "Survived"];

type DrawResult = Result<(), Box<dyn Error>>;

/// Open an SVG canvas, run `draw` on it and map any failure to `PlotRender`.
fn render<F>(path: &Path, draw: F) -> PipelineResult<()>
where
    F: FnOnce(&DrawingArea<SVGBackend, Shift>) -> DrawResult,
{
    let result = (|| -> DrawResult {
        let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
        Ok(())
    })();

    result.map_err(|e| PipelineError::PlotRender {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Equal-width bins over the observed range: `(lower, upper, count)`.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &v in values {
        // Upper edge belongs to the last bin
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (lo + i as f64 * width, lo + (i + 1) as f64 * width, c))
        .collect()
}

/// Histogram of the observed values of one numeric column.
pub fn plot_histogram(values: &[f64], title: &str, x_desc: &str, path: &Path) -> PipelineResult<()> {
    let bins = histogram_bins(values, HISTOGRAM_BINS);
    let (x_min, x_max) = match (bins.first(), bins.last()) {
        (Some(first), Some(last)) => (first.0, last.1),
        _ => (0.0, 1.0),
    };
    let y_max = bins.iter().map(|b| b.2).max().unwrap_or(0).max(1) as f64 * 1.05;

    render(path, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, ("sans-serif", 28))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(55)
            .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(x_desc)
            .y_desc("Frequency")
            .draw()?;

        chart.draw_series(bins.iter().map(|&(lo, hi, count)| {
            Rectangle::new([(lo, 0.0), (hi, count as f64)], BAR_COLOR.filled())
        }))?;
        chart.draw_series(bins.iter().map(|&(lo, hi, count)| {
            Rectangle::new([(lo, 0.0), (hi, count as f64)], WHITE.stroke_width(1))
        }))?;
        Ok(())
    })
}

/// Bar chart of the survival rate per group.
pub fn plot_survival_rate(rates: &[GroupRate], title: &str, x_desc: &str, path: &Path) -> PipelineResult<()> {
    let names: Vec<String> = rates.iter().map(|r| r.group.clone()).collect();
    let n = rates.len().max(1) as u32;

    render(path, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, ("sans-serif", 28))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(55)
            .build_cartesian_2d((0u32..n).into_segmented(), 0f64..1f64)?;

        let label = |v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                names.get(*i as usize).cloned().unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(x_desc)
            .y_desc("Survival rate")
            .x_label_formatter(&label)
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BAR_COLOR.filled())
                .margin(20)
                .data(rates.iter().enumerate().map(|(i, r)| (i as u32, r.rate))),
        )?;
        Ok(())
    })
}

/// ROC curve with the chance diagonal.
pub fn plot_roc_curve(points: &[RocPoint], auc: Option<f64>, path: &Path) -> PipelineResult<()> {
    let label = match auc {
        Some(value) => format!("ROC AUC = {:.3}", value),
        None => "ROC AUC = n/a".to_string(),
    };

    render(path, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("ROC curve", ("sans-serif", 28))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(55)
            .build_cartesian_2d(0f64..1f64, 0f64..1f64)?;

        chart
            .configure_mesh()
            .x_desc("False positive rate")
            .y_desc("True positive rate")
            .draw()?;

        chart.draw_series(LineSeries::new(
            vec![(0.0, 0.0), (1.0, 1.0)],
            BLACK.mix(0.4).stroke_width(1),
        ))?;

        chart
            .draw_series(LineSeries::new(
                points.iter().map(|p| (p.fpr, p.tpr)),
                CURVE_COLOR.stroke_width(2),
            ))?
            .label(label.as_str())
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &CURVE_COLOR));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
        Ok(())
    })
}

/// 2x2 heatmap of the confusion counts; rows are actual, columns predicted.
pub fn plot_confusion_matrix(cm: &ConfusionMatrix, path: &Path) -> PipelineResult<()> {
    let grid = cm.as_grid();
    let max = grid.iter().flatten().copied().max().unwrap_or(0).max(1) as f64;

    render(path, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Confusion matrix", ("sans-serif", 28))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(110)
            .build_cartesian_2d(0f64..2f64, 0f64..2f64)?;

        // Cell centres sit at 0.5 and 1.5; actual negatives are the top row
        let x_label = |v: &f64| cell_label(*v, false);
        let y_label = |v: &f64| cell_label(*v, true);

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(5)
            .y_labels(5)
            .x_desc("Predicted")
            .y_desc("Actual")
            .x_label_formatter(&x_label)
            .y_label_formatter(&y_label)
            .draw()?;

        for (row, counts) in grid.iter().enumerate() {
            let top = 2.0 - row as f64;
            for (col, &count) in counts.iter().enumerate() {
                let left = col as f64;
                let shade = count as f64 / max;
                let fill = RGBColor(
                    (247.0 - shade * 239.0) as u8,
                    (251.0 - shade * 203.0) as u8,
                    (255.0 - shade * 148.0) as u8,
                );
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(left, top - 1.0), (left + 1.0, top)],
                    fill.filled(),
                )))?;

                let text_color = if shade > 0.5 { WHITE } else { BLACK };
                chart.draw_series(std::iter::once(Text::new(
                    count.to_string(),
                    (left + 0.45, top - 0.45),
                    ("sans-serif", 32).into_font().color(&text_color),
                )))?;
            }
        }
        Ok(())
    })
}

fn cell_label(v: f64, flipped: bool) -> String {
    let idx = if (v - 0.5).abs() < 1e-6 {
        0
    } else if (v - 1.5).abs() < 1e-6 {
        1
    } else {
        return String::new();
    };
    let idx = if flipped { 1 - idx } else { idx };
    CLASS_NAMES[idx].to_string()
}
