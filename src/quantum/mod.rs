// src/quantum/mod.rs
//! Continuous-variable photonic circuits
//!
//! This module implements the two-mode register, its gates, the per-layer
//! gate parameters and the composition of layers into programs.

pub mod parameters;
pub mod gate;
pub mod state;
pub mod circuit;

pub use parameters::{GateParameters, ParameterKind, PARAMETER_KINDS};
pub use gate::{clip, Gate, GateOp, ModeTarget, PhotonBlock};
pub use state::{FockBatch, FockState, MODES};
pub use circuit::{build_program, compose_layer, compose_layers, state_preparation, PhotonicProgram};

/// Re-export commonly used types
pub mod prelude {
    pub use super::{FockState, FockBatch};
    pub use super::{Gate, GateOp, ModeTarget};
    pub use super::{GateParameters, ParameterKind, PhotonicProgram};
}
