use crate::math::matrix::Matrix;

/// Categorical cross-entropy for use with a Softmax output layer.
pub struct CrossEntropyLoss;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// Mean cross-entropy over the batch:
    ///   L = -mean_i log(predicted[i][labels[i]] + eps)
    ///
    /// `predicted` — softmax probabilities, one row per sample
    /// `labels`    — class index per row
    pub fn loss(predicted: &Matrix, labels: &[usize]) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        let total: f64 = predicted.data.iter().zip(labels.iter())
            .map(|(row, &label)| -(row[label] + EPS).ln())
            .sum();
        total / labels.len() as f64
    }

    /// Gradient of the batch-mean Softmax + cross-entropy w.r.t. the logits,
    /// against soft targets (each row a distribution over classes):
    ///   ∂L/∂z = (predicted - targets) / N
    pub fn derivative(predicted: &Matrix, targets: &Matrix) -> Matrix {
        let n = predicted.rows.max(1) as f64;
        (predicted.clone() - targets.clone()).map(|x| x / n)
    }

    /// One-hot rows for `labels`, scaled by `weight`.
    pub fn one_hot(labels: &[usize], classes: usize, weight: f64) -> Matrix {
        let mut targets = Matrix::zeros(labels.len(), classes);
        for (row, &label) in targets.data.iter_mut().zip(labels.iter()) {
            row[label] = weight;
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_is_mean_negative_log_likelihood() {
        let p = Matrix::from_data(vec![vec![0.5, 0.5], vec![0.25, 0.75]]);
        let l = CrossEntropyLoss::loss(&p, &[0, 1]);
        let expected = -(0.5f64.ln() + 0.75f64.ln()) / 2.0;
        assert!((l - expected).abs() < 1e-9);
    }

    #[test]
    fn test_derivative_is_scaled_residual() {
        let p = Matrix::from_data(vec![vec![0.5, 0.5], vec![0.25, 0.75]]);
        let t = CrossEntropyLoss::one_hot(&[0, 1], 2, 1.0);
        let g = CrossEntropyLoss::derivative(&p, &t);
        assert_eq!(g.data, vec![vec![-0.25, 0.25], vec![0.125, -0.125]]);
    }
}
