//! Mixup: convex combinations of sample pairs within a batch.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Beta, Distribution};

use crate::data::dataset::Batch;
use crate::math::matrix::Matrix;

/// A batch after mixing, plus what is needed to score it.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedBatch {
    pub inputs: Matrix,
    /// Original labels, in batch order.
    pub labels_a: Vec<usize>,
    /// Labels of the permuted partners.
    pub labels_b: Vec<usize>,
    pub lambda: f64,
}

/// Draws the mixing coefficient: `Beta(alpha, alpha)` for `alpha > 0`,
/// otherwise exactly `1.0` (no mixing).
pub fn sample_lambda<R: Rng + ?Sized>(alpha: f64, rng: &mut R) -> f64 {
    if alpha > 0.0 {
        match Beta::new(alpha, alpha) {
            Ok(beta) => beta.sample(rng).clamp(0.0, 1.0),
            // Only reachable for non-finite alpha.
            Err(_) => 1.0,
        }
    } else {
        1.0
    }
}

/// Mixes `batch` with a random permutation of itself:
///   inputs[i] = λ·x[i] + (1-λ)·x[perm[i]]
///
/// A sample paired with itself is copied unchanged, so a batch of one is
/// returned exactly as given.
pub fn mixup_batch<R: Rng + ?Sized>(batch: &Batch, alpha: f64, rng: &mut R) -> MixedBatch {
    let lambda = sample_lambda(alpha, rng);

    let mut perm: Vec<usize> = (0..batch.len()).collect();
    perm.shuffle(rng);

    let data = perm.iter().enumerate()
        .map(|(i, &j)| {
            let own = batch.inputs.row(i);
            if i == j {
                own.to_vec()
            } else {
                own.iter().zip(batch.inputs.row(j).iter())
                    .map(|(a, b)| lambda * a + (1.0 - lambda) * b)
                    .collect()
            }
        })
        .collect();

    MixedBatch {
        inputs: Matrix { rows: batch.inputs.rows, cols: batch.inputs.cols, data },
        labels_a: batch.labels.clone(),
        labels_b: perm.iter().map(|&j| batch.labels[j]).collect(),
        lambda,
    }
}
