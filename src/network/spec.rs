use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{ExperimentError, Result};
use crate::network::network::Network;

/// One hidden layer of an architecture preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub activation: ActivationFunction,
}

/// Architecture description independent of input width and class count.
///
/// The output layer is always a Softmax head sized to the dataset's classes,
/// so only the hidden stack is described here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Model identifier; also used in log file names.
    pub name: String,
    /// Hidden layers, input side first.
    pub hidden: Vec<LayerSpec>,
}

impl NetworkSpec {
    pub const PRESETS: [&'static str; 3] = ["linear", "mlp", "mlp-deep"];

    /// Looks up a named preset.
    pub fn preset(name: &str) -> Result<NetworkSpec> {
        let relu = |size| LayerSpec { size, activation: ActivationFunction::ReLU };
        let hidden = match name {
            "linear" => vec![],
            "mlp" => vec![relu(128)],
            "mlp-deep" => vec![relu(256), relu(128)],
            other => {
                return Err(ExperimentError::configuration(format!(
                    "unknown model '{}', expected one of {:?}",
                    other,
                    NetworkSpec::PRESETS
                )))
            }
        };
        Ok(NetworkSpec { name: name.to_string(), hidden })
    }

    /// Instantiates the architecture with freshly initialized weights.
    pub fn build<R: Rng + ?Sized>(&self, input_size: usize, class_count: usize, rng: &mut R) -> Network {
        let mut layer_specs = Vec::with_capacity(self.hidden.len() + 1);
        let mut fan_in = input_size;
        for layer in &self.hidden {
            layer_specs.push((layer.size, fan_in, layer.activation));
            fan_in = layer.size;
        }
        layer_specs.push((class_count, fan_in, ActivationFunction::Softmax));
        Network::new(layer_specs, rng)
    }
}
