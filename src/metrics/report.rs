use std::fmt;

use crate::data::dataset::Batch;
use crate::error::{ExperimentError, Result};
use crate::network::classifier::Classifier;

/// Runs the model over `batches` in order and returns `(targets, predictions)`,
/// one entry per sample.
pub fn predict<M: Classifier>(model: &mut M, batches: &[Batch]) -> Result<(Vec<usize>, Vec<usize>)> {
    let mut targets = Vec::new();
    let mut predictions = Vec::new();
    for batch in batches {
        if batch.inputs.cols != model.input_size() {
            return Err(ExperimentError::shape(format!(
                "batch width {} does not match model input {}",
                batch.inputs.cols,
                model.input_size()
            )));
        }
        let outputs = model.forward(&batch.inputs);
        predictions.extend(outputs.argmax_rows());
        targets.extend_from_slice(&batch.labels);
    }
    Ok((targets, predictions))
}

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averages over classes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricSummary {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Per-class and averaged classification metrics. Any ratio whose
/// denominator is zero is reported as `0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub class_names: Vec<String>,
    pub per_class: Vec<ClassMetrics>,
    /// Fraction of correct predictions, in `[0, 1]`.
    pub accuracy: f64,
    pub macro_avg: MetricSummary,
    pub weighted_avg: MetricSummary,
    pub total: usize,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

impl ClassificationReport {
    pub fn new(targets: &[usize], predictions: &[usize], class_names: &[String]) -> Result<Self> {
        if targets.len() != predictions.len() {
            return Err(ExperimentError::shape(format!(
                "{} targets but {} predictions",
                targets.len(),
                predictions.len()
            )));
        }
        let n = class_names.len();
        if let Some(&c) = targets.iter().chain(predictions.iter()).find(|&&c| c >= n) {
            return Err(ExperimentError::shape(format!("class index {} out of range for {} classes", c, n)));
        }

        // confusion[actual][predicted]
        let mut confusion = vec![vec![0usize; n]; n];
        for (&t, &p) in targets.iter().zip(predictions.iter()) {
            confusion[t][p] += 1;
        }

        let per_class: Vec<ClassMetrics> = (0..n)
            .map(|c| {
                let tp = confusion[c][c] as f64;
                let support: usize = confusion[c].iter().sum();
                let predicted: usize = confusion.iter().map(|row| row[c]).sum();
                let precision = ratio(tp, predicted as f64);
                let recall = ratio(tp, support as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);
                ClassMetrics { precision, recall, f1, support }
            })
            .collect();

        let total = targets.len();
        let correct: usize = (0..n).map(|c| confusion[c][c]).sum();

        let mut macro_avg = MetricSummary::default();
        let mut weighted_avg = MetricSummary::default();
        for m in &per_class {
            macro_avg.precision += m.precision;
            macro_avg.recall += m.recall;
            macro_avg.f1 += m.f1;
            let w = m.support as f64;
            weighted_avg.precision += w * m.precision;
            weighted_avg.recall += w * m.recall;
            weighted_avg.f1 += w * m.f1;
        }
        let classes = n as f64;
        macro_avg = MetricSummary {
            precision: ratio(macro_avg.precision, classes),
            recall: ratio(macro_avg.recall, classes),
            f1: ratio(macro_avg.f1, classes),
        };
        weighted_avg = MetricSummary {
            precision: ratio(weighted_avg.precision, total as f64),
            recall: ratio(weighted_avg.recall, total as f64),
            f1: ratio(weighted_avg.f1, total as f64),
        };

        Ok(ClassificationReport {
            class_names: class_names.to_vec(),
            per_class,
            accuracy: ratio(correct as f64, total as f64),
            macro_avg,
            weighted_avg,
            total,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.class_names.iter()
            .map(|name| name.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);

        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for (name, m) in self.class_names.iter().zip(self.per_class.iter()) {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>width$} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.total)?;
        for (label, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label, avg.precision, avg.recall, avg.f1, self.total
            )?;
        }
        Ok(())
    }
}
