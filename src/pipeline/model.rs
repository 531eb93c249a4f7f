//! L2-regularised logistic regression fitted by Newton's method
//!
//! The objective is `0.5 * ||w||^2 + C * sum(logloss)` with an unpenalised
//! bias. Each iteration solves the Newton system with a Cholesky
//! factorisation of the Hessian and backtracks until the objective decreases.

use faer::prelude::*;
use faer::{Mat, Side};
use serde::Serialize;
use thiserror::Error;

use super::features::{FeatureMatrix, Standardizer};

/// Ridge added to the Hessian diagonal so the bias row stays positive definite
const HESSIAN_JITTER: f64 = 1e-10;

/// Armijo sufficient-decrease constant for the line search
const ARMIJO: f64 = 1e-4;

const MAX_HALVINGS: usize = 40;

/// Solver settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitConfig {
    /// Iteration cap; hitting it is a warning, not a failure
    pub max_iter: usize,
    /// Converged when the largest gradient component falls below this
    pub tolerance: f64,
    /// Inverse regularisation strength
    pub c: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tolerance: 1e-6,
            c: 1.0,
        }
    }
}

/// Fitted parameters plus the transformation that produced the inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticModel {
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    /// Scaling applied to the matrix the model was trained on
    pub standardizer: Option<Standardizer>,
}

impl LogisticModel {
    pub fn decision(&self, row: &[f64]) -> f64 {
        self.bias + row.iter().zip(&self.weights).map(|(x, w)| x * w).sum::<f64>()
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision(row))
    }

    /// Probability of the positive class for every row.
    pub fn predict_proba(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        (0..matrix.n_rows())
            .map(|i| self.predict_proba_row(matrix.row(i)))
            .collect()
    }
}

/// Result of a fit that produced usable parameters.
#[derive(Debug, Clone)]
pub enum FitOutcome {
    Converged {
        model: LogisticModel,
        iterations: usize,
    },
    /// Iteration cap reached; the model holds the best parameters found
    NotConverged {
        model: LogisticModel,
        iterations: usize,
        gradient_norm: f64,
    },
}

impl FitOutcome {
    pub fn model(&self) -> &LogisticModel {
        match self {
            FitOutcome::Converged { model, .. } | FitOutcome::NotConverged { model, .. } => model,
        }
    }

    pub fn into_model(self) -> LogisticModel {
        match self {
            FitOutcome::Converged { model, .. } | FitOutcome::NotConverged { model, .. } => model,
        }
    }

    pub fn converged(&self) -> bool {
        matches!(self, FitOutcome::Converged { .. })
    }

    pub fn iterations(&self) -> usize {
        match self {
            FitOutcome::Converged { iterations, .. } | FitOutcome::NotConverged { iterations, .. } => {
                *iterations
            }
        }
    }
}

/// Inputs the solver cannot work with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("training labels contain a single class ({0})")]
    SingleClass(f64),
    #[error("expected {expected} values per row, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("training matrix contains non-finite values")]
    NonFiniteInput,
    #[error("Newton system is not positive definite at iteration {iteration}")]
    SingularSystem { iteration: usize },
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + exp(z))` without overflow.
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

/// Fit the classifier on a training matrix.
pub fn fit(train: &FeatureMatrix, config: &FitConfig) -> Result<FitOutcome, FitError> {
    let n = train.n_rows();
    let p = train.n_features();

    if n == 0 {
        return Err(FitError::EmptyTrainingSet);
    }
    if train.kinds.len() != p || train.row_ids.len() != n {
        return Err(FitError::DimensionMismatch {
            expected: p,
            found: train.kinds.len(),
        });
    }
    if !train.is_finite() {
        return Err(FitError::NonFiniteInput);
    }
    let first = train.labels[0];
    if train.labels.iter().all(|&y| y == first) {
        return Err(FitError::SingleClass(first));
    }

    // Design matrix with a trailing intercept column
    let xa = Mat::<f64>::from_fn(n, p + 1, |i, j| if j < p { train.get(i, j) } else { 1.0 });
    let y = &train.labels;

    let mut theta = vec![0.0; p + 1];
    let mut current = objective(&xa, y, &theta, config.c);
    let mut iterations = 0;

    while iterations < config.max_iter {
        let probs = probabilities(&xa, &theta);
        let grad = gradient(&xa, y, &probs, &theta, config.c);
        if max_abs(&grad) < config.tolerance {
            return Ok(FitOutcome::Converged {
                model: build_model(train, &theta),
                iterations,
            });
        }

        let hessian = hessian(&xa, &probs, config.c);
        let step = cholesky_solve(&hessian, &grad)
            .ok_or(FitError::SingularSystem { iteration: iterations })?;

        // Backtracking line search along the Newton direction
        let slope: f64 = grad.iter().zip(&step).map(|(g, d)| g * d).sum();
        let mut t = 1.0;
        let mut accepted = false;
        for _ in 0..MAX_HALVINGS {
            let candidate: Vec<f64> = theta.iter().zip(&step).map(|(th, d)| th - t * d).collect();
            let value = objective(&xa, y, &candidate, config.c);
            if value <= current - ARMIJO * t * slope {
                theta = candidate;
                current = value;
                accepted = true;
                break;
            }
            t *= 0.5;
        }

        if !accepted {
            // No representable decrease left; keep the best point
            break;
        }
        iterations += 1;
    }

    let probs = probabilities(&xa, &theta);
    let gradient_norm = max_abs(&gradient(&xa, y, &probs, &theta, config.c));
    let model = build_model(train, &theta);
    if gradient_norm < config.tolerance {
        Ok(FitOutcome::Converged { model, iterations })
    } else {
        Ok(FitOutcome::NotConverged {
            model,
            iterations,
            gradient_norm,
        })
    }
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
}

fn build_model(train: &FeatureMatrix, theta: &[f64]) -> LogisticModel {
    let p = train.n_features();
    LogisticModel {
        feature_names: train.columns.clone(),
        weights: theta[..p].to_vec(),
        bias: theta[p],
        standardizer: None,
    }
}

fn column(values: &[f64]) -> Mat<f64> {
    Mat::from_fn(values.len(), 1, |i, _| values[i])
}

fn to_vec(m: &Mat<f64>) -> Vec<f64> {
    (0..m.nrows()).map(|i| m[(i, 0)]).collect()
}

/// Linear predictor `Xa theta` for every row.
fn linear(xa: &Mat<f64>, theta: &[f64]) -> Vec<f64> {
    to_vec(&(xa * &column(theta)))
}

fn probabilities(xa: &Mat<f64>, theta: &[f64]) -> Vec<f64> {
    linear(xa, theta).into_iter().map(sigmoid).collect()
}

fn objective(xa: &Mat<f64>, y: &[f64], theta: &[f64], c: f64) -> f64 {
    let p = theta.len() - 1;
    let penalty: f64 = 0.5 * theta[..p].iter().map(|w| w * w).sum::<f64>();
    let loss: f64 = linear(xa, theta)
        .iter()
        .zip(y)
        .map(|(&z, &yi)| softplus(z) - yi * z)
        .sum();
    penalty + c * loss
}

fn gradient(xa: &Mat<f64>, y: &[f64], probs: &[f64], theta: &[f64], c: f64) -> Vec<f64> {
    let residual = Mat::<f64>::from_fn(xa.nrows(), 1, |i, _| c * (probs[i] - y[i]));
    let mut grad = to_vec(&(xa.transpose() * &residual));
    // Bias (last entry) is not penalised
    let p = grad.len() - 1;
    for (g, w) in grad[..p].iter_mut().zip(theta) {
        *g += w;
    }
    grad
}

fn hessian(xa: &Mat<f64>, probs: &[f64], c: f64) -> Mat<f64> {
    let k = xa.ncols();
    let weighted = Mat::<f64>::from_fn(xa.nrows(), k, |i, j| {
        c * probs[i] * (1.0 - probs[i]) * xa[(i, j)]
    });

    // H = C * Xa^T S Xa + diag(1, ..., 1, 0)
    let mut h = xa.transpose() * &weighted;
    for j in 0..k - 1 {
        h[(j, j)] += 1.0;
    }
    for j in 0..k {
        h[(j, j)] += HESSIAN_JITTER;
    }
    h
}

/// Solve `a x = b` for symmetric positive definite `a`.
///
/// `None` when the factorisation fails or the solution is not finite.
fn cholesky_solve(a: &Mat<f64>, b: &[f64]) -> Option<Vec<f64>> {
    let llt = a.cholesky(Side::Lower).ok()?;
    let x = to_vec(&llt.solve(&column(b)));
    x.iter().all(|v| v.is_finite()).then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::features::ColumnKind;

    fn separable_matrix() -> FeatureMatrix {
        let x = vec![-2.0, -1.5, -1.0, -0.5, 0.5, 1.0, 1.5, 2.0, -0.2, 0.2];
        let y = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0];
        let n = x.len();
        FeatureMatrix::from_columns(
            vec![("x".to_string(), ColumnKind::Numeric, x)],
            y,
            (0..n).collect(),
        )
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!((softplus(0.0) - 2f64.ln()).abs() < 1e-12);
        assert!(softplus(-1000.0).is_finite());
    }

    #[test]
    fn test_fit_converges_with_positive_weight() {
        let m = separable_matrix();
        let outcome = fit(&m, &FitConfig::default()).unwrap();
        assert!(outcome.converged());
        let model = outcome.model();
        assert!(model.weights[0] > 0.0);
        assert!(model.predict_proba_row(&[2.0]) > 0.5);
        assert!(model.predict_proba_row(&[-2.0]) < 0.5);
    }

    #[test]
    fn test_fit_iteration_cap_is_a_warning() {
        let m = separable_matrix();
        let config = FitConfig {
            max_iter: 1,
            ..FitConfig::default()
        };
        let outcome = fit(&m, &config).unwrap();
        assert!(!outcome.converged());
        assert!(outcome.model().weights[0] > 0.0);
    }

    #[test]
    fn test_fit_rejects_single_class() {
        let m = FeatureMatrix::from_columns(
            vec![("x".to_string(), ColumnKind::Numeric, vec![1.0, 2.0])],
            vec![1.0, 1.0],
            vec![0, 1],
        );
        assert_eq!(fit(&m, &FitConfig::default()).unwrap_err(), FitError::SingleClass(1.0));
    }

    #[test]
    fn test_fit_rejects_empty_and_non_finite() {
        let empty = FeatureMatrix::from_columns(
            vec![("x".to_string(), ColumnKind::Numeric, vec![])],
            vec![],
            vec![],
        );
        assert_eq!(fit(&empty, &FitConfig::default()).unwrap_err(), FitError::EmptyTrainingSet);

        let bad = FeatureMatrix::from_columns(
            vec![("x".to_string(), ColumnKind::Numeric, vec![f64::NAN, 1.0])],
            vec![0.0, 1.0],
            vec![0, 1],
        );
        assert_eq!(fit(&bad, &FitConfig::default()).unwrap_err(), FitError::NonFiniteInput);
    }

    #[test]
    fn test_cholesky_solve_identity() {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = 4.0;
        a[(1, 1)] = 2.0;
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 1.0;
        let x = cholesky_solve(&a, &[9.0, 5.0]).unwrap();
        // 4x + y = 9, x + 2y = 5 -> x = 13/7, y = 11/7
        assert!((x[0] - 13.0 / 7.0).abs() < 1e-12);
        assert!((x[1] - 11.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_cholesky_solve_rejects_indefinite() {
        let mut a = Mat::<f64>::zeros(2, 2);
        a[(0, 0)] = 1.0;
        a[(1, 1)] = -1.0;
        assert!(cholesky_solve(&a, &[1.0, 1.0]).is_none());
    }

    #[test]
    fn test_gradient_matches_row_sums() {
        // Two rows, one feature plus intercept
        let xa = Mat::<f64>::from_fn(2, 2, |i, j| if j == 0 { [1.0, 3.0][i] } else { 1.0 });
        let theta = [0.5, -0.25];
        assert_eq!(linear(&xa, &theta), vec![0.25, 1.25]);

        let probs = [0.25, 0.75];
        let y = [0.0, 1.0];
        let grad = gradient(&xa, &y, &probs, &theta, 2.0);
        // weight: 2 * (0.25 * 1 - 0.25 * 3) + 0.5, bias: 2 * (0.25 - 0.25)
        assert!((grad[0] - (-0.5)).abs() < 1e-12);
        assert!(grad[1].abs() < 1e-12);
    }
}
