use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer{
    pub size: usize,
    pub input_size: usize,
    /// Shape (input_size, size).
    pub weights: Matrix,
    /// Shape (1, size).
    pub biases: Matrix,
    pub activator: ActivationFunction,
    #[serde(skip)]
    input: Matrix,
    // pre-activation values (z = xW + b) needed for the derivative
    #[serde(skip)]
    pre_neurons: Matrix,
    #[serde(skip)]
    weights_grad: Matrix,
    #[serde(skip)]
    biases_grad: Matrix,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };

        Layer {
            size,
            input_size,
            weights,
            biases: Matrix::zeros(1, size),
            activator: activation,
            input: Matrix::default(),
            pre_neurons: Matrix::default(),
            weights_grad: Matrix::zeros(input_size, size),
            biases_grad: Matrix::zeros(1, size),
        }
    }

    /// Forward pass over a batch (one sample per row). Caches the input and
    /// pre-activations for `backward`.
    pub fn feed_from(&mut self, input: &Matrix) -> Matrix {
        let z = input.matmul(&self.weights).add_row(&self.biases);
        let a = Matrix::from_data(z.data.iter().map(|row| self.activator.apply(row)).collect());
        self.input = input.clone();
        self.pre_neurons = z;
        Matrix { rows: a.rows, cols: self.size, data: a.data }
    }

    /// Backward pass over the cached batch.
    ///
    /// `delta` is ∂L/∂a for this layer. Stores the weight and bias gradients
    /// (replacing the previous ones) and returns ∂L/∂a for the layer below.
    pub fn backward(&mut self, delta: &Matrix) -> Matrix {
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        let layer_delta = delta.hadamard(&act_derivative);

        self.weights_grad = self.input.transpose().matmul(&layer_delta);
        self.biases_grad = layer_delta.column_sums();

        layer_delta.matmul(&self.weights.transpose())
    }

    /// (value, gradient) pairs for the optimizer: weights first, then biases.
    pub fn parameters(&mut self) -> [(&mut Matrix, &Matrix); 2] {
        if self.weights_grad.rows != self.weights.rows || self.weights_grad.cols != self.weights.cols {
            // Freshly deserialized layers carry no gradient storage yet.
            self.weights_grad = Matrix::zeros(self.weights.rows, self.weights.cols);
            self.biases_grad = Matrix::zeros(self.biases.rows, self.biases.cols);
        }
        [
            (&mut self.weights, &self.weights_grad),
            (&mut self.biases, &self.biases_grad),
        ]
    }
}
