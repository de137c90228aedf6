//! One pass over a batch source, in training or evaluation mode.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::debug;

use crate::data::dataset::Batch;
use crate::error::{ExperimentError, Result};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::loss::mixup::{mixup_correct, mixup_cross_entropy, mixup_gradient};
use crate::network::classifier::Classifier;
use crate::optim::sgd::Sgd;
use crate::train::checkpoint::{CheckpointManager, CheckpointStore};
use crate::train::mixup::mixup_batch;

/// Result of a training pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainStats {
    /// Mean mixed-label loss per batch.
    pub loss: f64,
    /// Mean extra regularization loss per batch. Always `0` here.
    pub reg_loss: f64,
    /// Mixup-weighted accuracy in percent.
    pub accuracy: f64,
}

/// Result of an evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalStats {
    /// Mean loss per batch.
    pub loss: f64,
    /// Accuracy in percent.
    pub accuracy: f64,
    /// Best test accuracy of the iteration after this pass.
    pub best_accuracy: f64,
    /// Whether this pass wrote a checkpoint.
    pub saved: bool,
}

fn check_batch<M: Classifier>(model: &M, batch: &Batch) -> Result<()> {
    if batch.inputs.cols != model.input_size() || batch.inputs.rows != batch.labels.len() {
        return Err(ExperimentError::shape(format!(
            "batch of {}x{} with {} labels does not fit a model taking {} inputs",
            batch.inputs.rows,
            batch.inputs.cols,
            batch.labels.len(),
            model.input_size()
        )));
    }
    if let Some(&label) = batch.labels.iter().find(|&&l| l >= model.class_count()) {
        return Err(ExperimentError::shape(format!(
            "label {} out of range for a {}-class model",
            label,
            model.class_count()
        )));
    }
    Ok(())
}

fn percent(correct: f64, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * correct / total as f64
    }
}

/// Trains for one pass: every batch is mixed, scored against both label sets,
/// and followed by a backward pass and an optimizer step.
pub fn train_epoch<M, R>(
    model: &mut M,
    optimizer: &mut Sgd,
    batches: &[Batch],
    alpha: f64,
    rng: &mut R,
) -> Result<TrainStats>
where
    M: Classifier,
    R: Rng + ?Sized,
{
    let mut train_loss = 0.0;
    let reg_loss = 0.0;
    let mut correct = 0.0;
    let mut total = 0usize;

    for (batch_idx, batch) in batches.iter().enumerate() {
        check_batch(model, batch)?;
        let mixed = mixup_batch(batch, alpha, rng);

        let outputs = model.forward(&mixed.inputs);
        let loss = mixup_cross_entropy(&outputs, &mixed.labels_a, &mixed.labels_b, mixed.lambda);
        train_loss += loss;

        let predicted = outputs.argmax_rows();
        total += batch.len();
        correct += mixup_correct(&predicted, &mixed.labels_a, &mixed.labels_b, mixed.lambda);

        let grad = mixup_gradient(&outputs, &mixed.labels_a, &mixed.labels_b, mixed.lambda);
        model.backward(&grad);
        optimizer.step(model.parameters());

        let seen = (batch_idx + 1) as f64;
        debug!(
            batch = batch_idx + 1,
            batches = batches.len(),
            lambda = mixed.lambda,
            "Loss: {:.3} | Reg: {:.5} | Acc: {:.3}% ({:.1}/{})",
            train_loss / seen,
            reg_loss / seen,
            percent(correct, total),
            correct,
            total
        );
    }

    let n = batches.len().max(1) as f64;
    Ok(TrainStats {
        loss: train_loss / n,
        reg_loss: reg_loss / n,
        accuracy: percent(correct, total),
    })
}

/// Evaluates one pass on unmixed inputs without touching the parameters, then
/// lets the checkpoint manager decide whether this epoch supersedes the stored
/// checkpoint.
pub fn evaluate_epoch<M, S>(
    model: &mut M,
    batches: &[Batch],
    checkpoints: &mut CheckpointManager<S>,
    rng: &ChaCha8Rng,
    epoch: usize,
    is_final_epoch: bool,
) -> Result<EvalStats>
where
    M: Classifier + Serialize,
    S: CheckpointStore,
{
    let mut test_loss = 0.0;
    let mut correct = 0usize;
    let mut total = 0usize;

    for (batch_idx, batch) in batches.iter().enumerate() {
        check_batch(model, batch)?;
        let outputs = model.forward(&batch.inputs);
        test_loss += CrossEntropyLoss::loss(&outputs, &batch.labels);

        total += batch.len();
        correct += outputs.argmax_rows().iter().zip(batch.labels.iter())
            .filter(|(p, l)| p == l)
            .count();

        debug!(
            batch = batch_idx + 1,
            batches = batches.len(),
            "Loss: {:.3} | Acc: {:.3}% ({}/{})",
            test_loss / (batch_idx + 1) as f64,
            percent(correct as f64, total),
            correct,
            total
        );
    }

    let accuracy = percent(correct as f64, total);
    let saved = checkpoints.maybe_save(&*model, rng, accuracy, epoch, is_final_epoch)?;

    Ok(EvalStats {
        loss: test_loss / batches.len().max(1) as f64,
        accuracy,
        best_accuracy: checkpoints.best_accuracy(),
        saved,
    })
}
