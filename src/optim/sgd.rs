use crate::math::matrix::Matrix;
use crate::network::classifier::Parameter;

/// Stochastic gradient descent with momentum and L2 weight decay.
///
/// The update for each parameter `w` with gradient `g` is
///   g' = g + weight_decay · w
///   v  = momentum · v + g'      (v = g' on the first step)
///   w  = w - learning_rate · v
#[derive(Debug, Clone)]
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    velocity: Vec<Matrix>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd::with_momentum(learning_rate, 0.0, 0.0)
    }

    pub fn with_momentum(learning_rate: f64, momentum: f64, weight_decay: f64) -> Sgd {
        Sgd { learning_rate, momentum, weight_decay, velocity: Vec::new() }
    }

    /// Sets the rate used by every subsequent step.
    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    /// Applies one update to every parameter, in the order the model lists them.
    pub fn step(&mut self, parameters: Vec<Parameter<'_>>) {
        let first_step = self.velocity.is_empty();

        for (i, param) in parameters.into_iter().enumerate() {
            let wd = self.weight_decay;
            let mut update = param.grad.clone();
            if wd != 0.0 {
                for (u_row, w_row) in update.data.iter_mut().zip(param.value.data.iter()) {
                    for (u, w) in u_row.iter_mut().zip(w_row.iter()) {
                        *u += wd * w;
                    }
                }
            }

            if self.momentum != 0.0 {
                if first_step {
                    self.velocity.push(update.clone());
                } else {
                    let m = self.momentum;
                    let v = self.velocity[i].map(|x| x * m) + update;
                    self.velocity[i] = v.clone();
                    update = v;
                }
            }

            let lr = self.learning_rate;
            for (w_row, u_row) in param.value.data.iter_mut().zip(update.data.iter()) {
                for (w, u) in w_row.iter_mut().zip(u_row.iter()) {
                    *w -= lr * u;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_once(opt: &mut Sgd, value: &mut Matrix, grad: &Matrix) {
        opt.step(vec![Parameter { value, grad }]);
    }

    #[test]
    fn test_plain_step() {
        let mut opt = Sgd::new(0.5);
        let mut w = Matrix::from_data(vec![vec![1.0, 2.0]]);
        let g = Matrix::from_data(vec![vec![0.2, -0.4]]);
        step_once(&mut opt, &mut w, &g);
        assert!((w.data[0][0] - 0.9).abs() < 1e-12);
        assert!((w.data[0][1] - 2.2).abs() < 1e-12);
    }

    #[test]
    fn test_momentum_and_decay() {
        let mut opt = Sgd::with_momentum(0.1, 0.9, 0.5);
        let mut w = Matrix::from_data(vec![vec![1.0]]);
        let g = Matrix::from_data(vec![vec![1.0]]);

        // g' = 1 + 0.5 = 1.5, v = 1.5, w = 1 - 0.15
        step_once(&mut opt, &mut w, &g);
        assert!((w.data[0][0] - 0.85).abs() < 1e-12);

        // g' = 1 + 0.425 = 1.425, v = 1.35 + 1.425 = 2.775
        step_once(&mut opt, &mut w, &g);
        assert!((w.data[0][0] - (0.85 - 0.2775)).abs() < 1e-12);
    }
}
