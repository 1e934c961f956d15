//! Truncated Fock-basis simulator
//!
//! Evolves two-mode states through a [`PhotonicProgram`]. Gates are first
//! compiled to matrices for the configured cutoff; a batch shares the
//! compiled layer gates and only compiles its own state preparation.

use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{CvtlError, CvtlResult};
use crate::quantum::circuit::{PhotonicProgram, PREPARATION_GATES};
use crate::quantum::gate::{beamsplitter_blocks, Gate, GateOp, ModeTarget, PhotonBlock};
use crate::quantum::state::{FockBatch, FockState, MODES};

/// A gate turned into matrices for a fixed cutoff
#[derive(Debug, Clone)]
pub enum CompiledOp {
    Single {
        mode: usize,
        matrix: Array2<Complex64>,
    },
    Blocks {
        first: usize,
        second: usize,
        blocks: Vec<PhotonBlock>,
    },
}

impl CompiledOp {
    fn apply(&self, state: &mut FockState) -> CvtlResult<()> {
        match self {
            CompiledOp::Single { mode, matrix } => state.apply_single(*mode, matrix),
            CompiledOp::Blocks { first, second, blocks } => state.apply_blocks(*first, *second, blocks),
        }
    }
}

/// A state-vector simulator for the two-mode photonic register
#[derive(Debug, Clone, Copy)]
pub struct FockSimulator {
    cutoff: usize,
}

impl FockSimulator {
    /// Create a simulator truncating each mode at `cutoff` photons
    pub fn new(cutoff: usize) -> Self {
        FockSimulator { cutoff }
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }

    /// Compile one gate operation to matrices.
    pub fn compile(&self, op: &GateOp) -> CvtlResult<CompiledOp> {
        match (op.gate, op.target) {
            (Gate::Beamsplitter { theta, phi }, ModeTarget::Pair(first, second)) => {
                check_mode(first)?;
                check_mode(second)?;
                Ok(CompiledOp::Blocks {
                    first,
                    second,
                    blocks: beamsplitter_blocks(theta, phi, self.cutoff),
                })
            }
            (gate, ModeTarget::Single(mode)) => {
                check_mode(mode)?;
                let matrix = gate.single_mode_matrix(self.cutoff).ok_or_else(|| {
                    CvtlError::Config(format!("gate {} needs two target modes", gate.name()))
                })?;
                Ok(CompiledOp::Single { mode, matrix })
            }
            (gate, ModeTarget::Pair(..)) => Err(CvtlError::Config(format!(
                "gate {} acts on a single mode",
                gate.name()
            ))),
        }
    }

    pub fn compile_all(&self, ops: &[GateOp]) -> CvtlResult<Vec<CompiledOp>> {
        ops.iter().map(|op| self.compile(op)).collect()
    }

    /// Run a complete program starting from vacuum.
    pub fn run(&self, program: &PhotonicProgram) -> CvtlResult<FockState> {
        let compiled = self.compile_all(&program.ops)?;
        self.run_compiled(FockState::vacuum(self.cutoff), &compiled)
    }

    /// Apply already compiled operations to a state.
    pub fn run_compiled(&self, mut state: FockState, compiled: &[CompiledOp]) -> CvtlResult<FockState> {
        for op in compiled {
            op.apply(&mut state)?;
        }
        Ok(state)
    }

    /// Evolve every sample of a batch: its own preparation, then the shared layers.
    pub fn evolve_batch(
        &self,
        preparations: &[[GateOp; PREPARATION_GATES]],
        layers: &[GateOp],
        parallel: bool,
    ) -> CvtlResult<FockBatch> {
        let compiled_layers = self.compile_all(layers)?;
        debug!(
            batch = preparations.len(),
            layer_gates = compiled_layers.len(),
            cutoff = self.cutoff,
            parallel,
            "evolving batch"
        );

        let evolve_one = |prep: &[GateOp; PREPARATION_GATES]| -> CvtlResult<FockState> {
            let compiled_prep = self.compile_all(prep)?;
            let prepared = self.run_compiled(FockState::vacuum(self.cutoff), &compiled_prep)?;
            self.run_compiled(prepared, &compiled_layers)
        };

        let states: Vec<FockState> = if parallel {
            preparations.par_iter().map(evolve_one).collect::<CvtlResult<_>>()?
        } else {
            preparations.iter().map(evolve_one).collect::<CvtlResult<_>>()?
        };

        FockBatch::from_states(&states)
    }
}

fn check_mode(mode: usize) -> CvtlResult<()> {
    if mode >= MODES {
        return Err(CvtlError::Dimension {
            what: "mode index",
            expected: MODES,
            actual: mode,
        });
    }
    Ok(())
}
