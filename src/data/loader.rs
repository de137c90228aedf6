use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::augment::Augmentation;
use crate::data::dataset::{Batch, Dataset, ImageShape, Split};
use crate::error::{ExperimentError, Result};

/// Supplies the batches an experiment trains and evaluates on.
///
/// Every call is a complete, blocking pass. Training order is reshuffled on
/// each call from the caller's generator; test and inference order is fixed.
pub trait BatchSource {
    fn class_names(&self) -> &[String];

    fn class_count(&self) -> usize {
        self.class_names().len()
    }

    fn input_shape(&self) -> ImageShape;

    /// Shuffled (and augmented, when enabled) training batches.
    fn train_batches<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Batch>;

    /// Test batches in dataset order, never augmented.
    fn test_batches(&self) -> Vec<Batch>;

    /// Batches of `split` in dataset order, never augmented.
    fn inference_batches(&self, split: Split) -> Vec<Batch>;
}

/// In-memory batch source over a train/test pair of datasets.
pub struct DataLoader {
    pub train: Dataset,
    pub test: Dataset,
    pub batch_size: usize,
    pub augmentation: Option<Augmentation>,
}

impl DataLoader {
    pub fn new(train: Dataset, test: Dataset, batch_size: usize) -> Result<DataLoader> {
        if batch_size == 0 {
            return Err(ExperimentError::configuration("batch_size must be at least 1"));
        }
        if train.class_names != test.class_names {
            return Err(ExperimentError::configuration("train and test class lists differ"));
        }
        if train.shape != test.shape {
            return Err(ExperimentError::shape(format!(
                "train samples are {:?} but test samples are {:?}",
                train.shape, test.shape
            )));
        }
        Ok(DataLoader { train, test, batch_size, augmentation: None })
    }

    pub fn with_augmentation(mut self, augmentation: Augmentation) -> Self {
        self.augmentation = Some(augmentation);
        self
    }

    fn dataset(&self, split: Split) -> &Dataset {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
        }
    }

    fn ordered(&self, split: Split) -> Vec<Batch> {
        let dataset = self.dataset(split);
        let indices: Vec<usize> = (0..dataset.len()).collect();
        indices.chunks(self.batch_size).map(|chunk| dataset.batch(chunk)).collect()
    }
}

impl BatchSource for DataLoader {
    fn class_names(&self) -> &[String] {
        &self.train.class_names
    }

    fn input_shape(&self) -> ImageShape {
        self.train.shape
    }

    fn train_batches<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Batch> {
        let mut indices: Vec<usize> = (0..self.train.len()).collect();
        indices.shuffle(rng);

        indices
            .chunks(self.batch_size)
            .map(|chunk| {
                let mut batch = self.train.batch(chunk);
                if let Some(aug) = &self.augmentation {
                    for row in batch.inputs.data.iter_mut() {
                        *row = aug.apply(row, self.train.shape, rng);
                    }
                }
                batch
            })
            .collect()
    }

    fn test_batches(&self) -> Vec<Batch> {
        self.ordered(Split::Test)
    }

    fn inference_batches(&self, split: Split) -> Vec<Batch> {
        self.ordered(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn dataset(n: usize) -> Dataset {
        Dataset::new(
            (0..n).map(|i| vec![i as f64]).collect(),
            (0..n).map(|i| i % 2).collect(),
            vec!["even".into(), "odd".into()],
            ImageShape { channels: 1, height: 1, width: 1 },
        )
        .unwrap()
    }

    #[test]
    fn test_last_batch_may_be_smaller() {
        let loader = DataLoader::new(dataset(5), dataset(5), 2).unwrap();
        let sizes: Vec<usize> = loader.test_batches().iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_train_pass_is_a_permutation_and_reproducible() {
        let loader = DataLoader::new(dataset(6), dataset(2), 4).unwrap();
        let collect = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            loader.train_batches(&mut rng)
                .into_iter()
                .flat_map(|b| b.inputs.data.into_iter().map(|r| r[0] as usize))
                .collect::<Vec<_>>()
        };
        let a = collect(9);
        assert_eq!(a, collect(9));
        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_test_order_is_fixed() {
        let loader = DataLoader::new(dataset(2), dataset(3), 2).unwrap();
        let labels: Vec<usize> = loader.test_batches().into_iter().flat_map(|b| b.labels).collect();
        assert_eq!(labels, vec![0, 1, 0]);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(DataLoader::new(dataset(2), dataset(2), 0).is_err());
    }
}
