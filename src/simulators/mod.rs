//! Photonic circuit simulators
//!
//! This module provides the state evolver used by the transfer-learning
//! pipeline: a pure-state simulator over the truncated Fock basis.

pub mod fock;

pub use fock::{CompiledOp, FockSimulator};
