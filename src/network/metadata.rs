use serde::{Deserialize, Serialize};

/// Describes how to interpret the input fed to a Network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InputType {
    /// Flat feature vector.
    Numeric { features: usize },
    /// RGB image resized to width×height, normalized per channel, flattened
    /// channel-major (all R, then all G, then all B).
    ImageRgb { width: u32, height: u32 },
}

impl InputType {
    pub fn input_size(&self) -> usize {
        match self {
            InputType::Numeric { features } => *features,
            InputType::ImageRgb { width, height } => 3 * (*width as usize) * (*height as usize),
        }
    }
}

/// Annotations saved alongside the weights.
/// All fields are Option<> so bare weight files deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    /// Model identifier the network was built from (e.g. "mlp").
    pub model: Option<String>,
    pub input_type: Option<InputType>,
    /// Class labels for the output layer, in output order.
    pub output_labels: Option<Vec<String>>,
}
