use serde::{Serialize, Deserialize};

use crate::error::{ExperimentError, Result};
use crate::math::matrix::Matrix;
use crate::network::metadata::InputType;

/// Channel-major image dimensions of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub fn rgb(height: usize, width: usize) -> Self {
        ImageShape { channels: 3, height, width }
    }

    /// Flattened sample length (C·H·W).
    pub fn len(&self) -> usize {
        self.channels * self.height * self.width
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn input_type(&self) -> InputType {
        if self.channels == 3 {
            InputType::ImageRgb { width: self.width as u32, height: self.height as u32 }
        } else {
            InputType::Numeric { features: self.len() }
        }
    }
}

/// Which half of the dataset a pass reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

/// A batch of samples, one flattened (C, H, W) image per row of `inputs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Matrix,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Fully decoded, normalized samples of one split.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub samples: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
    pub class_names: Vec<String>,
    pub shape: ImageShape,
}

impl Dataset {
    /// Checks that every sample matches `shape` and every label names a class.
    pub fn new(
        samples: Vec<Vec<f64>>,
        labels: Vec<usize>,
        class_names: Vec<String>,
        shape: ImageShape,
    ) -> Result<Dataset> {
        if samples.len() != labels.len() {
            return Err(ExperimentError::shape(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }
        if let Some((i, s)) = samples.iter().enumerate().find(|(_, s)| s.len() != shape.len()) {
            return Err(ExperimentError::shape(format!(
                "sample {} has {} values, expected {}",
                i,
                s.len(),
                shape.len()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= class_names.len()) {
            return Err(ExperimentError::shape(format!(
                "label {} out of range for {} classes",
                bad,
                class_names.len()
            )));
        }
        Ok(Dataset { samples, labels, class_names, shape })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Gathers the samples at `indices`, in that order.
    pub fn batch(&self, indices: &[usize]) -> Batch {
        let rows = indices.iter().map(|&i| self.samples[i].clone()).collect();
        Batch {
            inputs: Matrix { rows: indices.len(), cols: self.shape.len(), data: rows },
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}
