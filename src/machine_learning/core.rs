//! Core traits and types for the classical models

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in machine learning models
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// Dimensionality mismatch in input or output data
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error during forward computation
    #[error("Forward computation error: {0}")]
    ForwardError(String),

    /// Error during backward computation or gradient calculation
    #[error("Backward computation error: {0}")]
    BackwardError(String),

    /// Error during parameter update
    #[error("Parameter update error: {0}")]
    UpdateError(String),

    /// Invalid construction argument
    #[error("Model error: {0}")]
    Other(String),
}

/// Base trait for all trainable models
pub trait Model {
    /// Type of input data
    type Input;

    /// Type of output predictions
    type Output;

    /// Returns the number of trainable parameters in the model
    fn parameter_count(&self) -> usize;

    /// Gets the current model parameters
    fn get_parameters(&self) -> Vec<f64>;

    /// Sets the model parameters
    fn set_parameters(&mut self, parameters: &[f64]) -> Result<(), ModelError>;

    /// Returns the input and output dimensions
    fn dimensions(&self) -> (usize, usize);
}

/// Trait for models that can make predictions
pub trait PredictiveModel: Model {
    /// Make a prediction for a single input
    fn predict(&self, input: &Self::Input) -> Result<Self::Output, ModelError>;

    /// Make predictions for a batch of inputs
    fn predict_batch(&self, inputs: &[Self::Input]) -> Result<Vec<Self::Output>, ModelError> {
        inputs.iter().map(|input| self.predict(input)).collect()
    }
}

/// Trait for models that have specific architectures
pub trait ArchitecturalModel: Model {
    /// Returns the model's architecture as a string
    fn architecture_description(&self) -> String;

    /// Returns the model's layer information
    fn layer_information(&self) -> Vec<(String, usize)>;
}

/// Intermediate values of a batch forward pass, kept for back-propagation
#[derive(Debug, Clone)]
pub struct ForwardCache {
    /// Input of every layer; `inputs[0]` is the feature batch
    inputs: Vec<Array2<f64>>,
    /// Pre-activation output of every layer
    pre_activations: Vec<Array2<f64>>,
}

impl ForwardCache {
    /// Raw logits of the final layer, one row per sample.
    pub fn logits(&self) -> &Array2<f64> {
        // A classifier always has at least one layer.
        &self.pre_activations[self.pre_activations.len() - 1]
    }
}

/// Stored form of one dense layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayerSnapshot {
    /// Row-major `(outputs, inputs)` weights
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

/// Stored form of a [`DenseClassifier`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSnapshot {
    pub layers: Vec<DenseLayerSnapshot>,
}

/// Stack of dense layers ending in raw class logits
///
/// `depth - 1` hidden layers keep the input width and use ReLU; the final
/// layer maps to the class count without activation. A depth of one is a
/// plain linear (logistic-regression) classifier.
#[derive(Clone, Debug)]
pub struct DenseClassifier {
    input_dim: usize,
    output_dim: usize,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
}

impl DenseClassifier {
    /// Creates a classifier with normally distributed weights and zero biases
    pub fn new<R: Rng + ?Sized>(
        input_dim: usize,
        depth: usize,
        output_dim: usize,
        init_std: f64,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        if depth == 0 {
            return Err(ModelError::Other("classifier needs at least one layer".to_string()));
        }
        let normal = Normal::new(0.0, init_std)
            .map_err(|e| ModelError::Other(format!("invalid init_std {}: {}", init_std, e)))?;

        // Hidden layers keep the feature width
        let layer_dims: Vec<usize> = std::iter::repeat(input_dim)
            .take(depth)
            .chain(std::iter::once(output_dim))
            .collect();

        let mut weights = Vec::with_capacity(depth);
        let mut biases = Vec::with_capacity(depth);
        for pair in layer_dims.windows(2) {
            let (cols, rows) = (pair[0], pair[1]);
            weights.push(Array2::from_shape_fn((rows, cols), |_| normal.sample(rng)));
            biases.push(Array1::zeros(rows));
        }

        Ok(DenseClassifier {
            input_dim,
            output_dim,
            weights,
            biases,
        })
    }

    /// Rebuilds a classifier from its stored form.
    pub fn from_snapshot(snapshot: &ClassifierSnapshot) -> Result<Self, ModelError> {
        if snapshot.layers.is_empty() {
            return Err(ModelError::Other("snapshot has no layers".to_string()));
        }

        let mut weights = Vec::with_capacity(snapshot.layers.len());
        let mut biases = Vec::with_capacity(snapshot.layers.len());
        let mut expected_cols: Option<usize> = None;

        for (i, layer) in snapshot.layers.iter().enumerate() {
            let rows = layer.weights.len();
            let cols = layer.weights.first().map(Vec::len).unwrap_or(0);
            if layer.weights.iter().any(|row| row.len() != cols) || layer.biases.len() != rows {
                return Err(ModelError::DimensionMismatch(format!("layer {} is ragged", i)));
            }
            if let Some(expected) = expected_cols {
                if cols != expected {
                    return Err(ModelError::DimensionMismatch(format!(
                        "layer {} expects {} inputs, previous layer gives {}",
                        i, cols, expected
                    )));
                }
            }
            expected_cols = Some(rows);

            let flat: Vec<f64> = layer.weights.iter().flatten().copied().collect();
            let matrix = Array2::from_shape_vec((rows, cols), flat)
                .map_err(|e| ModelError::DimensionMismatch(e.to_string()))?;
            weights.push(matrix);
            biases.push(Array1::from(layer.biases.clone()));
        }

        Ok(DenseClassifier {
            input_dim: weights[0].ncols(),
            output_dim: weights[weights.len() - 1].nrows(),
            weights,
            biases,
        })
    }

    /// Stored form of the current weights.
    pub fn to_snapshot(&self) -> ClassifierSnapshot {
        let layers = self
            .weights
            .iter()
            .zip(self.biases.iter())
            .map(|(w, b)| DenseLayerSnapshot {
                weights: w.rows().into_iter().map(|row| row.to_vec()).collect(),
                biases: b.to_vec(),
            })
            .collect();
        ClassifierSnapshot { layers }
    }

    /// Number of dense layers
    pub fn depth(&self) -> usize {
        self.weights.len()
    }

    /// Forward pass for a batch, one sample per row
    pub fn forward_batch(&self, features: &Array2<f64>) -> Result<ForwardCache, ModelError> {
        if features.ncols() != self.input_dim {
            return Err(ModelError::DimensionMismatch(format!(
                "Expected input dim {}, got {}",
                self.input_dim,
                features.ncols()
            )));
        }

        let last = self.depth() - 1;
        let mut inputs = Vec::with_capacity(self.depth());
        let mut pre_activations = Vec::with_capacity(self.depth());
        let mut current = features.clone();

        for (i, (weight, bias)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            // Linear transformation: XWᵀ + b
            let z = current.dot(&weight.t()) + bias;
            inputs.push(current);
            current = if i < last { z.mapv(relu) } else { z.clone() };
            pre_activations.push(z);
        }

        Ok(ForwardCache {
            inputs,
            pre_activations,
        })
    }

    /// Gradients of the loss with respect to every parameter, in
    /// [`Model::get_parameters`] order, given the gradient of the loss with
    /// respect to the logits.
    pub fn backward(&self, cache: &ForwardCache, grad_logits: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        if grad_logits.dim() != cache.logits().dim() {
            return Err(ModelError::BackwardError(format!(
                "logit gradient has shape {:?}, logits have {:?}",
                grad_logits.dim(),
                cache.logits().dim()
            )));
        }

        let depth = self.depth();
        let mut weight_grads: Vec<Array2<f64>> = Vec::with_capacity(depth);
        let mut bias_grads: Vec<Array1<f64>> = Vec::with_capacity(depth);
        let mut delta = grad_logits.clone();

        for layer in (0..depth).rev() {
            weight_grads.push(delta.t().dot(&cache.inputs[layer]));
            bias_grads.push(delta.sum_axis(Axis(0)));

            if layer > 0 {
                let upstream = delta.dot(&self.weights[layer]);
                let gate = cache.pre_activations[layer - 1].mapv(relu_derivative);
                delta = upstream * gate;
            }
        }
        weight_grads.reverse();
        bias_grads.reverse();

        let mut gradients = Vec::with_capacity(self.parameter_count());
        for (w, b) in weight_grads.iter().zip(bias_grads.iter()) {
            gradients.extend(w.iter().copied());
            gradients.extend(b.iter().copied());
        }
        Ok(gradients)
    }
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

fn relu_derivative(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { 0.0 }
}

impl Model for DenseClassifier {
    type Input = Array1<f64>;
    type Output = Array1<f64>;

    fn parameter_count(&self) -> usize {
        self.weights
            .iter()
            .zip(self.biases.iter())
            .map(|(w, b)| w.len() + b.len())
            .sum()
    }

    fn get_parameters(&self) -> Vec<f64> {
        let mut parameters = Vec::with_capacity(self.parameter_count());
        for (w, b) in self.weights.iter().zip(self.biases.iter()) {
            parameters.extend(w.iter().copied());
            parameters.extend(b.iter().copied());
        }
        parameters
    }

    fn set_parameters(&mut self, parameters: &[f64]) -> Result<(), ModelError> {
        if parameters.len() != self.parameter_count() {
            return Err(ModelError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                self.parameter_count(),
                parameters.len()
            )));
        }

        let mut param_idx = 0;
        for (w, b) in self.weights.iter_mut().zip(self.biases.iter_mut()) {
            for value in w.iter_mut() {
                *value = parameters[param_idx];
                param_idx += 1;
            }
            for value in b.iter_mut() {
                *value = parameters[param_idx];
                param_idx += 1;
            }
        }

        Ok(())
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.input_dim, self.output_dim)
    }
}

impl PredictiveModel for DenseClassifier {
    fn predict(&self, input: &Self::Input) -> Result<Self::Output, ModelError> {
        let batch = input
            .clone()
            .insert_axis(Axis(0));
        let cache = self.forward_batch(&batch)?;
        Ok(cache.logits().row(0).to_owned())
    }
}

impl ArchitecturalModel for DenseClassifier {
    fn architecture_description(&self) -> String {
        let widths: Vec<String> = std::iter::once(self.input_dim)
            .chain(self.weights.iter().map(|w| w.nrows()))
            .map(|w| w.to_string())
            .collect();
        format!("dense [{}] relu hidden, linear logits", widths.join(" -> "))
    }

    fn layer_information(&self) -> Vec<(String, usize)> {
        let last = self.depth() - 1;
        self.weights
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let kind = if i < last { "dense_relu" } else { "logits" };
                (format!("{}_{}", kind, i), w.len() + w.nrows())
            })
            .collect()
    }
}
