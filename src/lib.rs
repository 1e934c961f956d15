//! Continuous-variable quantum-to-classical transfer learning
//!
//! This crate evolves noisy two-mode coherent states through a truncated,
//! pre-trained photonic circuit, turns the evolved Fock amplitudes into
//! classical features and trains a small dense classifier on top of them.
//! The circuit is simulated in a truncated Fock basis; its parameters stay
//! frozen unless fine-tuning is enabled.

pub mod error;
pub mod config;
pub mod context;
pub mod quantum;
pub mod simulators;
pub mod machine_learning;
pub mod training;
pub mod checkpoint;

pub use error::{CvtlError, CvtlResult};

// Create a prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ExperimentConfig, GateClips, OptimizerKind};
    pub use crate::context::ExecutionContext;
    pub use crate::error::{CvtlError, CvtlResult};
    pub use crate::machine_learning::prelude::*;
    pub use crate::quantum::prelude::*;
    pub use crate::simulators::FockSimulator;
    pub use crate::training::{PhaseSummary, RunSummary, RunningStats, Trainer};
}

// Version and crate information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
