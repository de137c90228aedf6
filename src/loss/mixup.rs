//! Loss and accuracy for mixed batches.
//!
//! A mixed input is `λ·x_a + (1-λ)·x_b`, so it is trained toward both of its
//! source labels in the same proportion, and credited for matching either.

use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::math::matrix::Matrix;

/// `λ·criterion(pred, a) + (1-λ)·criterion(pred, b)`.
pub fn mixup_criterion<F>(
    criterion: F,
    predictions: &Matrix,
    labels_a: &[usize],
    labels_b: &[usize],
    lambda: f64,
) -> f64
where
    F: Fn(&Matrix, &[usize]) -> f64,
{
    lambda * criterion(predictions, labels_a) + (1.0 - lambda) * criterion(predictions, labels_b)
}

/// Cross-entropy flavour of `mixup_criterion`.
pub fn mixup_cross_entropy(predictions: &Matrix, labels_a: &[usize], labels_b: &[usize], lambda: f64) -> f64 {
    mixup_criterion(CrossEntropyLoss::loss, predictions, labels_a, labels_b, lambda)
}

/// ∂/∂logits of `mixup_cross_entropy`. Mixing is linear, so this is the plain
/// gradient against the mixed target `λ·onehot(a) + (1-λ)·onehot(b)`.
pub fn mixup_gradient(predictions: &Matrix, labels_a: &[usize], labels_b: &[usize], lambda: f64) -> Matrix {
    let classes = predictions.cols;
    let targets = CrossEntropyLoss::one_hot(labels_a, classes, lambda)
        + CrossEntropyLoss::one_hot(labels_b, classes, 1.0 - lambda);
    CrossEntropyLoss::derivative(predictions, &targets)
}

/// Weighted correct-count: each prediction earns `λ` for matching `a` and
/// `1-λ` for matching `b` (both when a == b).
pub fn mixup_correct(predicted: &[usize], labels_a: &[usize], labels_b: &[usize], lambda: f64) -> f64 {
    predicted.iter().zip(labels_a.iter().zip(labels_b.iter()))
        .map(|(p, (a, b))| {
            let mut credit = 0.0;
            if p == a {
                credit += lambda;
            }
            if p == b {
                credit += 1.0 - lambda;
            }
            credit
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preds() -> Matrix {
        Matrix::from_data(vec![vec![0.7, 0.2, 0.1], vec![0.1, 0.3, 0.6]])
    }

    #[test]
    fn test_lambda_one_is_plain_loss_on_a() {
        let p = preds();
        let combined = mixup_cross_entropy(&p, &[0, 2], &[1, 0], 1.0);
        assert_eq!(combined, CrossEntropyLoss::loss(&p, &[0, 2]));
    }

    #[test]
    fn test_lambda_zero_is_plain_loss_on_b() {
        let p = preds();
        let combined = mixup_cross_entropy(&p, &[0, 2], &[1, 0], 0.0);
        assert_eq!(combined, CrossEntropyLoss::loss(&p, &[1, 0]));
    }

    #[test]
    fn test_intermediate_lambda_interpolates() {
        let p = preds();
        let la = CrossEntropyLoss::loss(&p, &[0, 2]);
        let lb = CrossEntropyLoss::loss(&p, &[1, 0]);
        let combined = mixup_cross_entropy(&p, &[0, 2], &[1, 0], 0.3);
        assert!((combined - (0.3 * la + 0.7 * lb)).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_targets_sum_to_one() {
        let p = preds();
        let g = mixup_gradient(&p, &[0, 2], &[1, 2], 0.25);
        // Row 0 target = [0.25, 0.75, 0], row 1 target = [0, 0, 1]; N = 2.
        let expected = [[0.225, -0.275, 0.05], [0.05, 0.15, -0.2]];
        for (row, exp) in g.data.iter().zip(expected.iter()) {
            for (x, e) in row.iter().zip(exp.iter()) {
                assert!((x - e).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_correct_count_is_weighted_by_source_label() {
        // sample 0 matches a, sample 1 matches b, sample 2 matches both
        let c = mixup_correct(&[0, 1, 2], &[0, 0, 2], &[1, 1, 2], 0.8);
        assert!((c - (0.8 + 0.2 + 1.0)).abs() < 1e-12);
    }
}
