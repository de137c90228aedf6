use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::error::{ExperimentError, Result};

/// Every parameter of an experiment. Built once at startup and handed to the
/// orchestrator by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Base learning rate.
    pub lr: f64,
    /// Restore each iteration from its checkpoint instead of starting fresh.
    pub resume: bool,
    /// Architecture preset name.
    pub model: String,
    /// Run name; part of checkpoint and log file names.
    pub name: String,
    /// `0` draws a seed from the OS once per process.
    pub seed: u64,
    pub batch_size: usize,
    /// Total epochs per iteration.
    pub epoch: usize,
    /// Random crop and horizontal flip on training batches.
    pub augment: bool,
    /// Weight decay.
    pub decay: f64,
    /// Mixup strength; `<= 0` disables mixing.
    pub alpha: f64,
    /// Dataset root containing `train/` and `test/`.
    pub dataset: PathBuf,
    pub iterations: usize,
    pub momentum: f64,
    /// Side length images are resized to.
    pub image_size: u32,
    /// Backbone network JSON whose head is replaced.
    pub pretrained: Option<PathBuf>,
    pub accelerated: bool,
    pub checkpoint_dir: PathBuf,
    pub results_dir: PathBuf,
    pub results_file: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            lr: 0.1,
            resume: false,
            model: "mlp".to_string(),
            name: "0".to_string(),
            seed: 0,
            batch_size: 2,
            epoch: 2,
            augment: true,
            decay: 1e-4,
            alpha: 1.0,
            dataset: PathBuf::from("dataset"),
            iterations: 3,
            momentum: 0.9,
            image_size: 32,
            pretrained: None,
            accelerated: false,
            checkpoint_dir: PathBuf::from("checkpoint"),
            results_dir: PathBuf::from("results"),
            results_file: PathBuf::from("experimental_results_for_mixup.csv"),
        }
    }
}

impl ExperimentConfig {
    /// Reads a JSON file; absent fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<ExperimentConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ExperimentError::configuration("batch_size must be at least 1"));
        }
        if self.iterations == 0 {
            return Err(ExperimentError::configuration("iterations must be at least 1"));
        }
        if self.lr.is_nan() || self.lr <= 0.0 {
            return Err(ExperimentError::configuration(format!("lr must be positive, got {}", self.lr)));
        }
        if self.decay.is_nan() || self.decay < 0.0 {
            return Err(ExperimentError::configuration(format!("decay must not be negative, got {}", self.decay)));
        }
        if self.image_size < 1 {
            return Err(ExperimentError::configuration("image_size must be at least 1"));
        }
        Ok(())
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint_dir.join(format!("ckpt_{}_{}.json", self.name, self.seed))
    }

    pub fn epoch_log_path(&self) -> PathBuf {
        self.results_dir.join(format!("log_{}_{}_{}.csv", self.model, self.name, self.seed))
    }
}
