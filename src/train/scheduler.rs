use crate::optim::sgd::Sgd;

/// Step decay keyed on the absolute epoch number: the base rate is divided by
/// `factor` once for every milestone the epoch has reached.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDecay {
    pub base_lr: f64,
    pub milestones: Vec<usize>,
    pub factor: f64,
}

impl StepDecay {
    /// Divides by 10 at epochs 100 and 150.
    pub fn new(base_lr: f64) -> Self {
        StepDecay { base_lr, milestones: vec![100, 150], factor: 10.0 }
    }

    pub fn rate(&self, epoch: usize) -> f64 {
        let mut lr = self.base_lr;
        for &milestone in &self.milestones {
            if epoch >= milestone {
                lr /= self.factor;
            }
        }
        lr
    }

    /// Sets the optimizer's rate for the epochs after `epoch`.
    pub fn adjust(&self, optimizer: &mut Sgd, epoch: usize) -> f64 {
        let lr = self.rate(epoch);
        optimizer.set_learning_rate(lr);
        lr
    }
}
