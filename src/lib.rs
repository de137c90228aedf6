pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;
pub mod metrics;
pub mod config;
pub mod device;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::network::Network;
pub use network::classifier::Classifier;
pub use optim::sgd::Sgd;
pub use data::loader::{BatchSource, DataLoader};
pub use train::experiment::Experiment;
pub use config::ExperimentConfig;
pub use error::{ExperimentError, Result};
