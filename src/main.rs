use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use mixup_lab::{Experiment, ExperimentConfig};

/// Repeated mixup training runs over an image folder dataset.
#[derive(Parser, Debug)]
#[command(name = "mixup-lab", version, about, long_about = None)]
struct Cli {
    /// JSON file with experiment settings; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Resume each iteration from its checkpoint
    #[arg(short, long)]
    resume: bool,

    /// Model preset (linear, mlp, mlp-deep)
    #[arg(long)]
    model: Option<String>,

    /// Run name used in checkpoint and log file names
    #[arg(long)]
    name: Option<String>,

    /// Random seed; 0 draws one from the OS
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    batch_size: Option<usize>,

    /// Total epochs per iteration
    #[arg(long)]
    epoch: Option<usize>,

    /// Disable random crop and flip
    #[arg(long)]
    no_augment: bool,

    /// Weight decay
    #[arg(long)]
    decay: Option<f64>,

    /// Mixup alpha; 0 disables mixing
    #[arg(long)]
    alpha: Option<f64>,

    /// Dataset root holding train/ and test/
    #[arg(long)]
    dataset: Option<PathBuf>,

    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long)]
    momentum: Option<f64>,

    #[arg(long)]
    image_size: Option<u32>,

    /// Backbone network JSON whose output layer is replaced
    #[arg(long)]
    pretrained: Option<PathBuf>,

    /// Ask for accelerated compute (falls back to cpu)
    #[arg(long)]
    accelerated: bool,

    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    #[arg(long)]
    results_dir: Option<PathBuf>,

    #[arg(long)]
    results_file: Option<PathBuf>,

    /// Verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> mixup_lab::Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::load_json(path)?,
            None => ExperimentConfig::default(),
        };
        if let Some(lr) = self.lr {
            config.lr = lr;
        }
        if self.resume {
            config.resume = true;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(epoch) = self.epoch {
            config.epoch = epoch;
        }
        if self.no_augment {
            config.augment = false;
        }
        if let Some(decay) = self.decay {
            config.decay = decay;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(dataset) = self.dataset {
            config.dataset = dataset;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(momentum) = self.momentum {
            config.momentum = momentum;
        }
        if let Some(image_size) = self.image_size {
            config.image_size = image_size;
        }
        if self.pretrained.is_some() {
            config.pretrained = self.pretrained;
        }
        if self.accelerated {
            config.accelerated = true;
        }
        if let Some(dir) = self.checkpoint_dir {
            config.checkpoint_dir = dir;
        }
        if let Some(dir) = self.results_dir {
            config.results_dir = dir;
        }
        if let Some(file) = self.results_file {
            config.results_file = file;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let result = cli.into_config()
        .and_then(Experiment::from_config)
        .and_then(|mut experiment| experiment.run().map(|table| table.len()));

    match result {
        Ok(rows) => {
            tracing::info!(rows, "experiment finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "experiment failed");
            ExitCode::FAILURE
        }
    }
}
