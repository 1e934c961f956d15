//! Layer composition for the pre-trained photonic circuit
//!
//! A program is the ordered list of gate operations applied to the vacuum:
//! two state-preparation displacements followed by ten gates per layer.
//! Programs are rebuilt from the parameters on every forward pass.

use num_complex::Complex64;
use tracing::debug;

use crate::config::GateClips;
use crate::error::{CvtlError, CvtlResult};
use crate::quantum::gate::{clip, Gate, GateOp};
use crate::quantum::parameters::{GateParameters, ParameterKind as P};

/// Gates emitted for each layer.
pub const GATES_PER_LAYER: usize = 10;

/// Gates emitted for state preparation.
pub const PREPARATION_GATES: usize = 2;

/// Ordered sequence of gate operations on the two-mode register
#[derive(Debug, Clone, PartialEq)]
pub struct PhotonicProgram {
    pub ops: Vec<GateOp>,
}

impl PhotonicProgram {
    pub fn new() -> Self {
        PhotonicProgram { ops: Vec::new() }
    }

    /// Get the number of gates in the program
    pub fn gate_count(&self) -> usize {
        self.ops.len()
    }

    pub fn push(&mut self, op: GateOp) {
        self.ops.push(op);
    }

    pub fn extend<I: IntoIterator<Item = GateOp>>(&mut self, ops: I) {
        self.ops.extend(ops);
    }
}

impl Default for PhotonicProgram {
    fn default() -> Self {
        Self::new()
    }
}

/// Displacements preparing the coherent input `|alpha⟩ ⊗ |beta⟩` from vacuum.
pub fn state_preparation(alpha: Complex64, beta: Complex64) -> [GateOp; PREPARATION_GATES] {
    [
        GateOp::single(Gate::displacement_from(alpha), 0),
        GateOp::single(Gate::displacement_from(beta), 1),
    ]
}

/// The ten gates of layer `layer`, with magnitudes saturated to the clip bounds.
pub fn compose_layer(params: &GateParameters, layer: usize, clips: &GateClips) -> [GateOp; GATES_PER_LAYER] {
    let p = |kind: P| params.get(kind, layer);

    [
        GateOp::pair(Gate::Beamsplitter { theta: p(P::Theta1), phi: p(P::Phi1) }, 0, 1),
        GateOp::single(Gate::Rotation { phi: p(P::R1) }, 0),
        GateOp::single(
            Gate::Squeezing { r: clip(p(P::Sqr1), clips.sq_clip), phi: p(P::Sqphi1) },
            0,
        ),
        GateOp::single(
            Gate::Squeezing { r: clip(p(P::Sqr2), clips.sq_clip), phi: p(P::Sqphi2) },
            1,
        ),
        GateOp::pair(Gate::Beamsplitter { theta: p(P::Theta2), phi: p(P::Phi2) }, 0, 1),
        GateOp::single(Gate::Rotation { phi: p(P::R2) }, 0),
        GateOp::single(
            Gate::Displacement { r: clip(p(P::Dr1), clips.disp_clip), phi: p(P::Dphi1) },
            0,
        ),
        GateOp::single(
            Gate::Displacement { r: clip(p(P::Dr2), clips.disp_clip), phi: p(P::Dphi2) },
            1,
        ),
        GateOp::single(Gate::Kerr { kappa: clip(p(P::Kappa1), clips.kerr_clip) }, 0),
        GateOp::single(Gate::Kerr { kappa: clip(p(P::Kappa2), clips.kerr_clip) }, 1),
    ]
}

/// All layer gates for the first `q_depth` layers, in application order.
pub fn compose_layers(params: &GateParameters, q_depth: usize, clips: &GateClips) -> CvtlResult<Vec<GateOp>> {
    if q_depth > params.depth() {
        return Err(CvtlError::Config(format!(
            "q_depth {} exceeds the {} layers available",
            q_depth,
            params.depth()
        )));
    }

    let mut ops = Vec::with_capacity(GATES_PER_LAYER * q_depth);
    for layer in 0..q_depth {
        ops.extend(compose_layer(params, layer, clips));
    }
    debug!(q_depth, gates = ops.len(), "composed quantum layers");
    Ok(ops)
}

/// Full program for one input: state preparation then `q_depth` layers.
pub fn build_program(
    params: &GateParameters,
    q_depth: usize,
    clips: &GateClips,
    alpha: Complex64,
    beta: Complex64,
) -> CvtlResult<PhotonicProgram> {
    let mut program = PhotonicProgram::new();
    program.extend(state_preparation(alpha, beta));
    program.extend(compose_layers(params, q_depth, clips)?);
    Ok(program)
}
