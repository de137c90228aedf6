use crate::math::matrix::Matrix;

/// A trainable parameter handed to the optimizer: its current value and the
/// gradient from the most recent backward pass.
pub struct Parameter<'a> {
    pub value: &'a mut Matrix,
    pub grad: &'a Matrix,
}

/// Capability interface the training loop drives a model through.
///
/// The loop only calls `forward`, `backward` and hands `parameters` to the
/// optimizer; parameter storage stays owned by the implementor.
pub trait Classifier {
    /// Width of one flattened input sample.
    fn input_size(&self) -> usize;

    /// Width of the output distribution.
    fn class_count(&self) -> usize;

    /// Class probabilities for a batch, one row per sample. Implementations
    /// cache whatever `backward` needs.
    fn forward(&mut self, inputs: &Matrix) -> Matrix;

    /// Takes ∂L/∂logits for the last forward batch and replaces the stored
    /// parameter gradients.
    fn backward(&mut self, output_grad: &Matrix);

    fn parameters(&mut self) -> Vec<Parameter<'_>>;
}
