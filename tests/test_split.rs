//! Integration tests for the stratified split

use surveyfit::pipeline::features::{ColumnKind, FeatureMatrix};
use surveyfit::pipeline::split::{stratified_split, test_size};
use surveyfit::pipeline::PipelineError;

fn matrix_with_labels(labels: Vec<f64>) -> FeatureMatrix {
    let n = labels.len();
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    FeatureMatrix::from_columns(
        vec![("x".to_string(), ColumnKind::Numeric, x)],
        labels,
        (0..n).collect(),
    )
}

fn positive_share(m: &FeatureMatrix) -> f64 {
    m.positive_count() as f64 / m.n_rows() as f64
}

#[test]
fn test_split_size_and_proportion_bounds() {
    for (n, positives) in [(40, 16), (41, 7), (100, 38), (13, 5), (891, 342)] {
        let labels: Vec<f64> = (0..n).map(|i| if i < positives { 1.0 } else { 0.0 }).collect();
        let m = matrix_with_labels(labels);

        for seed in [0u64, 7, 42] {
            let part = stratified_split(&m, 0.25, seed).unwrap();
            let expected = (0.25 * n as f64).round() as i64;
            let actual = part.test.n_rows() as i64;
            assert!(
                (actual - expected).abs() <= 1,
                "n={} test size {} vs {}",
                n,
                actual,
                expected
            );
            assert_eq!(part.train.n_rows() + part.test.n_rows(), n);

            let diff = (positive_share(&part.train) - positive_share(&m)).abs();
            assert!(
                diff <= 1.0 / part.train.n_rows() as f64,
                "n={} seed={} proportion drift {}",
                n,
                seed,
                diff
            );
        }
    }
}

#[test]
fn test_split_is_deterministic_and_disjoint() {
    let labels: Vec<f64> = (0..60).map(|i| (i % 3 == 0) as i32 as f64).collect();
    let m = matrix_with_labels(labels);

    let a = stratified_split(&m, 0.3, 42).unwrap();
    let b = stratified_split(&m, 0.3, 42).unwrap();
    assert_eq!(a.test_rows, b.test_rows, "same seed, same partition");
    assert_eq!(a.train_rows, b.train_rows);

    for row in &a.test_rows {
        assert!(!a.train_rows.contains(row), "row {} on both sides", row);
    }

    let c = stratified_split(&m, 0.3, 43).unwrap();
    assert_ne!(a.test_rows, c.test_rows, "different seed should reshuffle");
}

#[test]
fn test_split_carries_row_ids() {
    let m = matrix_with_labels(vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    let part = stratified_split(&m, 0.25, 1).unwrap();
    for (pos, &row) in part.test_rows.iter().enumerate() {
        assert_eq!(part.test.row_ids[pos], row);
        assert_eq!(part.test.row(pos), &[row as f64]);
    }
}

#[test]
fn test_split_rejects_degenerate_inputs() {
    let tiny = matrix_with_labels(vec![1.0]);
    assert!(matches!(
        stratified_split(&tiny, 0.25, 42),
        Err(PipelineError::Split(_))
    ));

    let m = matrix_with_labels(vec![0.0, 1.0, 0.0, 1.0]);
    assert!(matches!(
        stratified_split(&m, 1.5, 42),
        Err(PipelineError::Split(_))
    ));
}

#[test]
fn test_test_size_rounds_up() {
    assert_eq!(test_size(4, 0.25), 1);
    assert_eq!(test_size(41, 0.25), 11);
    assert_eq!(test_size(891, 0.25), 223);
}
