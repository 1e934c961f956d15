//! Machine learning module
//!
//! Classical half of the transfer-learning pipeline: noisy inputs, feature
//! extraction from evolved states, the dense classifier head and the hybrid
//! model tying them to the photonic circuit.

pub mod core;
pub mod loss;
pub mod optimizer;
pub mod dataset;
pub mod features;
pub mod quantum;

/// Re-exports of commonly used components
pub mod prelude {
    // Core ML components
    pub use super::core::{ArchitecturalModel, DenseClassifier, Model, ModelError, PredictiveModel};
    pub use super::loss::{LossFunction, SoftmaxCrossEntropy};
    pub use super::optimizer::{build_optimizer, Adam, GradientDescent, Optimizer};
    pub use super::dataset::{CoherentInput, CoherentStateDataset, InputBatch, NUM_CLASSES};
    pub use super::features::{FeatureBatch, FeatureExtractor};

    // Hybrid model
    pub use super::quantum::{BatchMetrics, TransferModel};
}
