//! Held-out evaluation of a fitted classifier

use std::fmt::Write as _;

use serde::Serialize;

use super::features::FeatureMatrix;
use super::model::LogisticModel;

/// Probability at or above which a row is predicted positive
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(labels: &[f64], predicted: &[f64]) -> Self {
        let mut cm = ConfusionMatrix::default();
        for (&y, &p) in labels.iter().zip(predicted) {
            match (y == 1.0, p == 1.0) {
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
                (true, true) => cm.tp += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tn + self.tp, self.total())
    }

    /// Rows as `[[tn, fp], [fn, tp]]`
    pub fn as_grid(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    /// Metrics treating `class` (0 or 1) as the positive label
    fn class_metrics(&self, class: u8) -> ClassMetrics {
        let (tp, fp, fn_) = if class == 1 {
            (self.tp, self.fp, self.fn_)
        } else {
            (self.tn, self.fn_, self.fp)
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            label: class.to_string(),
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

/// Precision, recall, F1 and support for one row of the classification report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// One point of the ROC curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    pub threshold: f64,
}

/// A fitted weight paired with its feature name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCoefficient {
    pub feature: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub accuracy: f64,
    /// `None` when the test partition holds a single class
    pub auc: Option<f64>,
    pub confusion: ConfusionMatrix,
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub roc: Vec<RocPoint>,
    pub coefficients: Vec<RankedCoefficient>,
    pub intercept: f64,
    pub test_size: usize,
}

impl EvaluationResult {
    /// Plain-text report in the familiar precision/recall/f1/support layout.
    pub fn classification_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        );
        let _ = writeln!(out);
        for m in &self.per_class {
            let _ = writeln!(out, "{}", report_line(&m.label, m));
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:>12} {:>9} {:>9} {:>9.3} {:>9}",
            "accuracy", "", "", self.accuracy, self.test_size
        );
        let _ = writeln!(out, "{}", report_line("macro avg", &self.macro_avg));
        let _ = write!(out, "{}", report_line("weighted avg", &self.weighted_avg));
        out
    }

    /// The `n` largest weights in absolute value, strongest first.
    pub fn strongest_coefficients(&self, n: usize) -> Vec<&RankedCoefficient> {
        let mut by_magnitude: Vec<&RankedCoefficient> = self.coefficients.iter().collect();
        by_magnitude.sort_by(|a, b| {
            b.weight
                .abs()
                .partial_cmp(&a.weight.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        by_magnitude.truncate(n);
        by_magnitude
    }
}

fn report_line(label: &str, m: &ClassMetrics) -> String {
    format!(
        "{:>12} {:>9.3} {:>9.3} {:>9.3} {:>9}",
        label, m.precision, m.recall, m.f1, m.support
    )
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Score a fitted model on the held-out partition.
pub fn evaluate(model: &LogisticModel, test: &FeatureMatrix) -> EvaluationResult {
    let scores = model.predict_proba(test);
    let predicted: Vec<f64> = scores
        .iter()
        .map(|&p| if p >= DECISION_THRESHOLD { 1.0 } else { 0.0 })
        .collect();

    let confusion = ConfusionMatrix::from_predictions(&test.labels, &predicted);
    let per_class = vec![confusion.class_metrics(0), confusion.class_metrics(1)];

    let total = confusion.total();
    let macro_avg = average("macro avg", &per_class, |_| 1.0 / per_class.len() as f64, total);
    let weighted_avg = average("weighted avg", &per_class, |m| ratio(m.support, total), total);

    let roc = roc_curve(&test.labels, &scores);
    let auc = roc.as_ref().map(|points| auc(points));

    EvaluationResult {
        accuracy: confusion.accuracy(),
        auc,
        confusion,
        per_class,
        macro_avg,
        weighted_avg,
        roc: roc.unwrap_or_default(),
        coefficients: rank_coefficients(&model.feature_names, &model.weights),
        intercept: model.bias,
        test_size: test.n_rows(),
    }
}

fn average(
    label: &str,
    per_class: &[ClassMetrics],
    weight: impl Fn(&ClassMetrics) -> f64,
    support: usize,
) -> ClassMetrics {
    let mut avg = ClassMetrics {
        label: label.to_string(),
        precision: 0.0,
        recall: 0.0,
        f1: 0.0,
        support,
    };
    for m in per_class {
        let w = weight(m);
        avg.precision += w * m.precision;
        avg.recall += w * m.recall;
        avg.f1 += w * m.f1;
    }
    avg
}

/// Coefficients ordered by descending weight; ties keep feature order.
pub fn rank_coefficients(names: &[String], weights: &[f64]) -> Vec<RankedCoefficient> {
    let mut ranked: Vec<RankedCoefficient> = names
        .iter()
        .zip(weights)
        .map(|(name, &weight)| RankedCoefficient {
            feature: name.clone(),
            weight,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

/// ROC curve from (0, 0) to (1, 1), one point per distinct score.
///
/// Returns `None` when either class is absent.
pub fn roc_curve(labels: &[f64], scores: &[f64]) -> Option<Vec<RocPoint>> {
    let positives = labels.iter().filter(|&&y| y == 1.0).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut points = vec![RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: f64::INFINITY,
    }];
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut idx = 0;
    while idx < order.len() {
        let threshold = scores[order[idx]];
        // Consume every row tied at this score
        while idx < order.len() && scores[order[idx]] == threshold {
            if labels[order[idx]] == 1.0 {
                tp += 1;
            } else {
                fp += 1;
            }
            idx += 1;
        }
        points.push(RocPoint {
            fpr: fp as f64 / negatives as f64,
            tpr: tp as f64 / positives as f64,
            threshold,
        });
    }

    Some(points)
}

/// Trapezoidal area under a ROC curve.
pub fn auc(points: &[RocPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
        .sum()
}
