//! Runs every iteration of an experiment and collects one results row per
//! iteration.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::ExperimentConfig;
use crate::data::augment::Augmentation;
use crate::data::dataset::Split;
use crate::data::image_folder::{normalized_black, ImageFolder};
use crate::data::loader::{BatchSource, DataLoader};
use crate::device::Device;
use crate::error::{ExperimentError, Result};
use crate::metrics::report::{predict, ClassificationReport};
use crate::metrics::results::{ResultsRow, ResultsTable};
use crate::network::classifier::Classifier;
use crate::network::metadata::ModelMetadata;
use crate::network::network::Network;
use crate::network::spec::NetworkSpec;
use crate::optim::sgd::Sgd;
use crate::train::checkpoint::{CheckpointKey, CheckpointManager, CheckpointStore, FileCheckpointStore, RunState};
use crate::train::epoch::{evaluate_epoch, train_epoch};
use crate::train::epoch_log::{EpochLog, EpochRecord};
use crate::train::scheduler::StepDecay;

/// Owns everything that lives across iterations: the configuration, the batch
/// source, the checkpoint store, the generator and the results table.
pub struct Experiment<B, S> {
    config: ExperimentConfig,
    source: B,
    store: S,
    device: Device,
    rng: ChaCha8Rng,
    results: ResultsTable,
}

impl Experiment<DataLoader, FileCheckpointStore> {
    /// Loads the image folder named by `config.dataset` and stores checkpoints
    /// as files under `config.checkpoint_dir`.
    pub fn from_config(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let (train, test) = ImageFolder::new(&config.dataset, config.image_size).load()?;
        let mut loader = DataLoader::new(train, test, config.batch_size)?;
        if config.augment {
            loader = loader.with_augmentation(Augmentation::standard(normalized_black()));
        }
        let store = FileCheckpointStore::new(&config.checkpoint_dir);
        Experiment::new(config, loader, store)
    }
}

impl<B: BatchSource, S: CheckpointStore> Experiment<B, S> {
    pub fn new(config: ExperimentConfig, source: B, store: S) -> Result<Self> {
        config.validate()?;
        // Unknown presets fail here rather than at the first iteration.
        if config.pretrained.is_none() {
            NetworkSpec::preset(&config.model)?;
        }
        let device = Device::select(config.accelerated);
        let rng = if config.seed == 0 {
            ChaCha8Rng::from_entropy()
        } else {
            ChaCha8Rng::seed_from_u64(config.seed)
        };
        info!(
            device = %device,
            classes = source.class_count(),
            model = %config.model,
            "experiment ready"
        );
        Ok(Experiment { config, source, store, device, rng, results: ResultsTable::new() })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn results(&self) -> &ResultsTable {
        &self.results
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs all iterations in order. The results file is rewritten after each
    /// one, so rows of finished iterations survive a later failure.
    pub fn run(&mut self) -> Result<&ResultsTable> {
        let iterations = self.config.iterations;
        for iteration in 0..iterations {
            info!(iteration = iteration + 1, iterations, "starting iteration");
            let row = self.run_iteration()?;
            self.results.push(row);
            self.results.save_csv(&self.config.results_file)?;
            info!(
                iteration = iteration + 1,
                test_acc = row.test_accuracy,
                train_acc = row.train_accuracy,
                path = %self.config.results_file.display(),
                "results saved"
            );
        }
        Ok(&self.results)
    }

    /// One full epoch loop followed by the final metrics pass.
    pub fn run_iteration(&mut self) -> Result<ResultsRow> {
        let Experiment { config, source, store, rng, .. } = self;

        if config.seed != 0 {
            *rng = ChaCha8Rng::seed_from_u64(config.seed);
        }

        let key = CheckpointKey::new(config.name.clone(), config.seed);
        let mut checkpoints = CheckpointManager::new(&mut *store, key);

        let (mut model, start_epoch) = if config.resume {
            let state: RunState<Network> = checkpoints.load()?;
            check_resumed_model(&state.model, &*source)?;
            *rng = state.rng;
            (state.model, state.start_epoch)
        } else {
            (build_model(config, &*source, rng)?, 0)
        };

        let mut optimizer = Sgd::with_momentum(config.lr, config.momentum, config.decay);
        let schedule = StepDecay::new(config.lr);
        // A resumed run picks up the rate the uninterrupted run would have.
        if start_epoch > 0 {
            schedule.adjust(&mut optimizer, start_epoch - 1);
        }

        let log = EpochLog::open(config.epoch_log_path())?;
        let test_batches = source.test_batches();

        for epoch in start_epoch..config.epoch {
            let train_batches = source.train_batches(rng);
            let train = train_epoch(&mut model, &mut optimizer, &train_batches, config.alpha, rng)?;
            let is_final_epoch = epoch + 1 == config.epoch;
            let eval = evaluate_epoch(&mut model, &test_batches, &mut checkpoints, rng, epoch, is_final_epoch)?;
            let lr = schedule.adjust(&mut optimizer, epoch);

            log.append(&EpochRecord {
                epoch,
                train_loss: train.loss,
                reg_loss: train.reg_loss,
                train_accuracy: train.accuracy,
                test_loss: eval.loss,
                test_accuracy: eval.accuracy,
            })?;
            info!(
                epoch,
                train_loss = train.loss,
                train_acc = train.accuracy,
                test_loss = eval.loss,
                test_acc = eval.accuracy,
                best_acc = eval.best_accuracy,
                next_lr = lr,
                "epoch done"
            );
        }

        let class_names = source.class_names();
        let (targets, preds) = predict(&mut model, &source.inference_batches(Split::Test))?;
        let test_report = ClassificationReport::new(&targets, &preds, class_names)?;
        let (targets, preds) = predict(&mut model, &source.inference_batches(Split::Train))?;
        let train_report = ClassificationReport::new(&targets, &preds, class_names)?;
        info!("test set\n{}", test_report);
        info!("train set\n{}", train_report);

        Ok(ResultsRow::from_reports(&test_report, &train_report))
    }
}

/// Fresh model for the configured preset, or the pretrained backbone with a
/// new head sized to the dataset.
fn build_model<B: BatchSource>(config: &ExperimentConfig, source: &B, rng: &mut ChaCha8Rng) -> Result<Network> {
    let shape = source.input_shape();
    let class_count = source.class_count();

    let mut network = match &config.pretrained {
        Some(path) => {
            let backbone = Network::load_json(path)?;
            if backbone.input_size() != shape.len() {
                return Err(ExperimentError::configuration(format!(
                    "pretrained network '{}' takes {} inputs but samples have {}",
                    path.display(),
                    backbone.input_size(),
                    shape.len()
                )));
            }
            info!(path = %path.display(), class_count, "replacing pretrained head");
            backbone.with_head(class_count, rng)?
        }
        None => NetworkSpec::preset(&config.model)?.build(shape.len(), class_count, rng),
    };

    network.metadata = ModelMetadata {
        model: Some(config.model.clone()),
        input_type: Some(shape.input_type()),
        output_labels: Some(source.class_names().to_vec()),
    };
    Ok(network)
}

fn check_resumed_model<B: BatchSource>(model: &Network, source: &B) -> Result<()> {
    if let Some(labels) = &model.metadata.output_labels {
        if labels.as_slice() != source.class_names() {
            return Err(ExperimentError::configuration(format!(
                "checkpoint classes {:?} differ from dataset classes {:?}",
                labels,
                source.class_names()
            )));
        }
    }
    if model.input_size() != source.input_shape().len() || model.class_count() != source.class_count() {
        return Err(ExperimentError::configuration(format!(
            "checkpoint model maps {} inputs to {} classes, dataset has {} inputs and {} classes",
            model.input_size(),
            model.class_count(),
            source.input_shape().len(),
            source.class_count()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{Dataset, ImageShape};
    use crate::train::checkpoint::MemoryCheckpointStore;

    fn dataset(n: usize) -> Dataset {
        // Two linearly separable classes in 4 features.
        let samples = (0..n)
            .map(|i| if i % 2 == 0 { vec![1.0, 0.0, 1.0, 0.0] } else { vec![0.0, 1.0, 0.0, 1.0] })
            .collect();
        Dataset::new(
            samples,
            (0..n).map(|i| i % 2).collect(),
            vec!["a".into(), "b".into()],
            ImageShape { channels: 1, height: 2, width: 2 },
        )
        .unwrap()
    }

    fn config(dir: &std::path::Path) -> ExperimentConfig {
        ExperimentConfig {
            seed: 7,
            epoch: 3,
            iterations: 2,
            model: "linear".into(),
            checkpoint_dir: dir.join("checkpoint"),
            results_dir: dir.join("results"),
            results_file: dir.join("results.csv"),
            ..Default::default()
        }
    }

    #[test]
    fn test_run_writes_one_row_per_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DataLoader::new(dataset(8), dataset(4), 2).unwrap();
        let mut store = MemoryCheckpointStore::new();
        let mut experiment = Experiment::new(config(dir.path()), loader, &mut store).unwrap();
        let table = experiment.run().unwrap().clone();

        assert_eq!(table.len(), 2);
        // Same nonzero seed every iteration: identical rows.
        assert_eq!(table.rows()[0], table.rows()[1]);
        assert_eq!(ResultsTable::load_csv(dir.path().join("results.csv")).unwrap(), table);

        let log = EpochLog::open(dir.path().join("results").join("log_linear_0_7.csv")).unwrap();
        assert_eq!(log.records().unwrap().len(), 6);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_resume_without_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DataLoader::new(dataset(4), dataset(2), 2).unwrap();
        let config = ExperimentConfig { resume: true, ..config(dir.path()) };
        let mut experiment = Experiment::new(config, loader, MemoryCheckpointStore::new()).unwrap();
        let err = experiment.run().unwrap_err();
        assert!(matches!(err, ExperimentError::MissingCheckpoint { ref name, seed: 7 } if name == "0"));
        assert!(!dir.path().join("results.csv").exists());
    }

    #[test]
    fn test_resume_continues_after_saved_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryCheckpointStore::new();

        let first = ExperimentConfig { epoch: 1, iterations: 1, ..config(dir.path()) };
        let loader = DataLoader::new(dataset(4), dataset(2), 2).unwrap();
        Experiment::new(first, loader, &mut store).unwrap().run().unwrap();

        let resumed = ExperimentConfig { epoch: 3, iterations: 1, resume: true, ..config(dir.path()) };
        let loader = DataLoader::new(dataset(4), dataset(2), 2).unwrap();
        Experiment::new(resumed, loader, &mut store).unwrap().run().unwrap();

        let log = EpochLog::open(dir.path().join("results").join("log_linear_0_7.csv")).unwrap();
        let epochs: Vec<usize> = log.records().unwrap().iter().map(|r| r.epoch).collect();
        assert_eq!(epochs, vec![0, 1, 2]);
    }

    #[test]
    fn test_unknown_model_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DataLoader::new(dataset(4), dataset(2), 2).unwrap();
        let config = ExperimentConfig { model: "resnet1000".into(), ..config(dir.path()) };
        let result = Experiment::new(config, loader, MemoryCheckpointStore::new());
        assert!(matches!(result, Err(ExperimentError::Configuration(_))));
    }
}
