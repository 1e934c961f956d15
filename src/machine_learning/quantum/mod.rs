//! Quantum machine learning module

pub mod model;

// Re-exports for convenience
pub use model::{metrics, BatchMetrics, ForwardPass, TransferModel};
