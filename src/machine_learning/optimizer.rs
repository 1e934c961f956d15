//! Optimization algorithms for the trainable parameters

use crate::config::OptimizerKind;
use crate::machine_learning::core::ModelError;

/// Trait for optimization algorithms
pub trait Optimizer: Send + std::fmt::Debug {
    /// Update parameters using gradients
    fn update(&mut self, parameters: &mut [f64], gradients: &[f64]) -> Result<(), ModelError>;

    /// Reset the optimizer's internal state
    fn reset(&mut self);

    /// Step size
    fn learning_rate(&self) -> f64;
}

/// Builds the optimizer selected in the configuration.
pub fn build_optimizer(kind: OptimizerKind, learning_rate: f64) -> Box<dyn Optimizer> {
    match kind {
        OptimizerKind::Adam => Box::new(Adam::with_learning_rate(learning_rate)),
        OptimizerKind::Sgd => Box::new(GradientDescent::new(learning_rate)),
    }
}

fn check_lengths(parameters: &[f64], gradients: &[f64]) -> Result<(), ModelError> {
    if parameters.len() != gradients.len() {
        return Err(ModelError::UpdateError(format!(
            "{} parameters but {} gradients",
            parameters.len(),
            gradients.len()
        )));
    }
    Ok(())
}

/// Gradient Descent optimizer
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f64,
}

impl GradientDescent {
    /// Creates a new Gradient Descent optimizer
    pub fn new(learning_rate: f64) -> Self {
        GradientDescent { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    fn update(&mut self, parameters: &mut [f64], gradients: &[f64]) -> Result<(), ModelError> {
        check_lengths(parameters, gradients)?;

        for (param, grad) in parameters.iter_mut().zip(gradients.iter()) {
            *param -= self.learning_rate * grad;
        }
        Ok(())
    }

    fn reset(&mut self) {
        // Gradient descent has no state to reset
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

/// Adaptive Moment Estimation (Adam) optimizer
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: Vec<f64>, // First moment estimate
    v: Vec<f64>, // Second moment estimate
    t: i32,      // Timestep
}

impl Adam {
    /// Creates a new Adam optimizer
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    /// Adam with the usual moment decay rates
    pub fn with_learning_rate(learning_rate: f64) -> Self {
        Adam::new(learning_rate, 0.9, 0.999, 1e-8)
    }

    /// Number of updates applied since the last reset
    pub fn timestep(&self) -> i32 {
        self.t
    }
}

impl Optimizer for Adam {
    fn update(&mut self, parameters: &mut [f64], gradients: &[f64]) -> Result<(), ModelError> {
        check_lengths(parameters, gradients)?;
        let n = parameters.len();

        // Initialize moment estimates if not already done
        if self.m.len() != n {
            self.m = vec![0.0; n];
            self.v = vec![0.0; n];
            self.t = 0;
        }

        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);

        for i in 0..n {
            let g = gradients[i];
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;

            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;

            parameters[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
