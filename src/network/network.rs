use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{ExperimentError, Result};
use crate::layers::dense::Layer;
use crate::math::matrix::Matrix;
use crate::network::classifier::{Classifier, Parameter};
use crate::network::metadata::ModelMetadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new<R: Rng + ?Sized>(
        layer_specs: Vec<(usize, usize, ActivationFunction)>,
        rng: &mut R,
    ) -> Network {
        let layers = layer_specs.into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation, rng))
            .collect();
        Network { layers, metadata: ModelMetadata::default() }
    }

    /// Swaps the final layer for a fresh Softmax head with `class_count`
    /// outputs, keeping every earlier layer as a trained backbone.
    pub fn with_head<R: Rng + ?Sized>(mut self, class_count: usize, rng: &mut R) -> Result<Network> {
        let old_head = self.layers.pop().ok_or_else(|| {
            ExperimentError::configuration("pretrained network has no layers")
        })?;
        let fan_in = self.layers.last().map_or(old_head.input_size, |layer| layer.size);
        self.layers.push(Layer::new(class_count, fan_in, ActivationFunction::Softmax, rng));
        self.metadata.output_labels = None;
        Ok(self)
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Classifier for Network {
    fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.input_size)
    }

    fn class_count(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.size)
    }

    fn forward(&mut self, inputs: &Matrix) -> Matrix {
        let mut current = inputs.clone();
        for layer in &mut self.layers {
            current = layer.feed_from(&current);
        }
        current
    }

    fn backward(&mut self, output_grad: &Matrix) {
        let mut delta = output_grad.clone();
        for layer in self.layers.iter_mut().rev() {
            delta = layer.backward(&delta);
        }
    }

    fn parameters(&mut self) -> Vec<Parameter<'_>> {
        self.layers.iter_mut()
            .flat_map(|layer| layer.parameters())
            .map(|(value, grad)| Parameter { value, grad })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn net(rng: &mut ChaCha8Rng) -> Network {
        Network::new(vec![
            (5, 4, ActivationFunction::ReLU),
            (3, 5, ActivationFunction::Softmax),
        ], rng)
    }

    #[test]
    fn test_forward_rows_are_distributions() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut network = net(&mut rng);
        let out = network.forward(&Matrix::from_data(vec![vec![0.1, 0.2, 0.3, 0.4]; 2]));
        assert_eq!((out.rows, out.cols), (2, 3));
        for row in &out.data {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_with_head_resizes_output() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let network = net(&mut rng).with_head(7, &mut rng).unwrap();
        assert_eq!(network.class_count(), 7);
        assert_eq!(network.layers[1].input_size, 5);
        assert_eq!(network.input_size(), 4);
    }

    #[test]
    fn test_parameters_cover_every_layer() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut network = net(&mut rng);
        assert_eq!(network.parameters().len(), 4);
    }

    #[test]
    fn test_json_roundtrip_keeps_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let network = net(&mut rng);
        network.save_json(&path).unwrap();
        let loaded = Network::load_json(&path).unwrap();
        assert_eq!(loaded.layers[0].weights, network.layers[0].weights);
    }
}
