use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    ReLU,
    LeakyReLU { alpha: f64 },
    Tanh,
    Identity,
    /// Vector-valued; only valid on the output layer, where it is paired with
    /// cross-entropy.
    Softmax,
}

impl ActivationFunction {
    /// Applies the activation to one row of pre-activations.
    pub fn apply(&self, z: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Softmax => softmax(z),
            _ => z.iter().map(|&x| self.function(x)).collect(),
        }
    }

    /// Element-wise activation. Softmax rows go through `apply`.
    fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Identity | ActivationFunction::Softmax => x,
        }
    }

    /// Element-wise derivative at the pre-activation `x`.
    ///
    /// Softmax returns `1.0`: the loss hands the layer the combined
    /// softmax + cross-entropy gradient with respect to the logits already.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::Identity | ActivationFunction::Softmax => 1.0,
        }
    }

    /// ReLU-family layers get He init, everything else Xavier.
    pub fn prefers_he_init(&self) -> bool {
        matches!(self, ActivationFunction::ReLU | ActivationFunction::LeakyReLU { .. })
    }
}

/// Numerically stable softmax (max-shifted).
pub fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
