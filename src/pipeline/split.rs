//! Stratified train/test partitioning

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::error::{PipelineError, PipelineResult};
use super::features::FeatureMatrix;

/// Disjoint train/test partition of a feature matrix.
#[derive(Debug, Clone)]
pub struct Partition {
    pub train: FeatureMatrix,
    pub test: FeatureMatrix,
    /// Row positions (in the source matrix) of the training rows, ascending
    pub train_rows: Vec<usize>,
    /// Row positions (in the source matrix) of the test rows, ascending
    pub test_rows: Vec<usize>,
    pub test_fraction: f64,
}

/// Number of test rows for `n` rows: `ceil(test_fraction * n)`.
pub fn test_size(n: usize, test_fraction: f64) -> usize {
    (test_fraction * n as f64).ceil() as usize
}

/// Split so each class keeps (up to rounding) its share in both partitions.
///
/// Per-class test counts are allocated by largest remainder, each class is
/// shuffled with a `StdRng` seeded from `seed`, and the first rows of every
/// shuffled class go to the test side. The same seed always yields the same
/// partition.
pub fn stratified_split(
    matrix: &FeatureMatrix,
    test_fraction: f64,
    seed: u64,
) -> PipelineResult<Partition> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::Split(format!(
            "test fraction must be between 0 and 1, got {}",
            test_fraction
        )));
    }

    let n = matrix.n_rows();
    let n_test = test_size(n, test_fraction);
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::Split(format!(
            "{} row(s) cannot be split with test fraction {}",
            n, test_fraction
        )));
    }

    // Group row positions by class label (0 then 1)
    let mut classes: Vec<Vec<usize>> = vec![Vec::new(), Vec::new()];
    for (i, &y) in matrix.labels.iter().enumerate() {
        classes[if y == 1.0 { 1 } else { 0 }].push(i);
    }

    let allocation = allocate_test_counts(&classes.iter().map(Vec::len).collect::<Vec<_>>(), n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_rows = Vec::with_capacity(n - n_test);
    let mut test_rows = Vec::with_capacity(n_test);

    for (indices, &k) in classes.iter_mut().zip(allocation.iter()) {
        indices.shuffle(&mut rng);
        test_rows.extend_from_slice(&indices[..k]);
        train_rows.extend_from_slice(&indices[k..]);
    }

    train_rows.sort_unstable();
    test_rows.sort_unstable();

    Ok(Partition {
        train: matrix.select_rows(&train_rows),
        test: matrix.select_rows(&test_rows),
        train_rows,
        test_rows,
        test_fraction,
    })
}

/// Distribute `n_test` rows across classes proportionally to their sizes,
/// using the largest-remainder method (ties go to the lower class index).
pub fn allocate_test_counts(class_sizes: &[usize], n_test: usize) -> Vec<usize> {
    let total: usize = class_sizes.iter().sum();
    if total == 0 {
        return vec![0; class_sizes.len()];
    }

    let exact: Vec<f64> = class_sizes
        .iter()
        .map(|&c| c as f64 * n_test as f64 / total as f64)
        .collect();
    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut order: Vec<usize> = (0..class_sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut remaining = n_test.saturating_sub(counts.iter().sum());
    for &c in order.iter().cycle().take(class_sizes.len() * 2) {
        if remaining == 0 {
            break;
        }
        if counts[c] < class_sizes[c] {
            counts[c] += 1;
            remaining -= 1;
        }
    }

    counts
}
