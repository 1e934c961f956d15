//! Noisy coherent-state inputs
//!
//! Every class is one fixed pair of coherent-state amplitudes. A batch
//! always holds the seven classes in label order; only the displacement
//! noise changes between draws.

use num_complex::Complex64;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{CvtlError, CvtlResult};
use crate::quantum::circuit::{state_preparation, PREPARATION_GATES};
use crate::quantum::gate::GateOp;

/// Number of classes, and therefore the batch size.
pub const NUM_CLASSES: usize = 7;

/// Complex displacement amplitudes of the two input modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoherentInput {
    pub alpha: Complex64,
    pub beta: Complex64,
}

impl CoherentInput {
    pub fn new(alpha: Complex64, beta: Complex64) -> Self {
        CoherentInput { alpha, beta }
    }

    /// Displacement gates preparing this input from vacuum.
    pub fn preparation(&self) -> [GateOp; PREPARATION_GATES] {
        state_preparation(self.alpha, self.beta)
    }
}

/// One batch of inputs with their labels
#[derive(Debug, Clone, PartialEq)]
pub struct InputBatch {
    pub inputs: Vec<CoherentInput>,
    pub labels: Vec<usize>,
}

impl InputBatch {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn preparations(&self) -> Vec<[GateOp; PREPARATION_GATES]> {
        self.inputs.iter().map(CoherentInput::preparation).collect()
    }
}

/// The fixed labels `0..NUM_CLASSES`.
pub fn class_labels() -> Vec<usize> {
    (0..NUM_CLASSES).collect()
}

/// Source of noisy batches built around seven base descriptors
#[derive(Debug, Clone)]
pub struct CoherentStateDataset {
    base: [CoherentInput; NUM_CLASSES],
    noise: Option<Normal<f64>>,
}

impl CoherentStateDataset {
    /// Base descriptors scaled by `alpha`, with Gaussian noise of std-dev `noise_scale`.
    pub fn new(alpha: f64, noise_scale: f64) -> CvtlResult<Self> {
        let noise = if noise_scale > 0.0 {
            Some(Normal::new(0.0, noise_scale).map_err(|e| {
                CvtlError::Config(format!("invalid noise_scale {}: {}", noise_scale, e))
            })?)
        } else {
            None
        };

        Ok(CoherentStateDataset {
            base: base_descriptors(alpha),
            noise,
        })
    }

    /// The noiseless descriptor of each class.
    pub fn base(&self) -> &[CoherentInput; NUM_CLASSES] {
        &self.base
    }

    /// The noiseless batch.
    pub fn clean_batch(&self) -> InputBatch {
        InputBatch {
            inputs: self.base.to_vec(),
            labels: class_labels(),
        }
    }

    /// Draws a batch with fresh, independent noise on the real and imaginary
    /// part of both amplitudes of every class.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> InputBatch {
        let inputs = match &self.noise {
            Some(normal) => self
                .base
                .iter()
                .map(|input| {
                    let mut perturb = |z: Complex64| {
                        Complex64::new(z.re + normal.sample(rng), z.im + normal.sample(rng))
                    };
                    let alpha = perturb(input.alpha);
                    let beta = perturb(input.beta);
                    CoherentInput { alpha, beta }
                })
                .collect(),
            None => self.base.to_vec(),
        };

        InputBatch {
            inputs,
            labels: class_labels(),
        }
    }
}

/// Seven descriptors with pairwise distinct per-mode magnitudes.
fn base_descriptors(a: f64) -> [CoherentInput; NUM_CLASSES] {
    let c = |re: f64, im: f64| Complex64::new(re, im);
    let half = a / 2.0;
    [
        CoherentInput::new(c(a, 0.0), c(0.0, 0.0)),
        CoherentInput::new(c(0.0, 0.0), c(a, 0.0)),
        CoherentInput::new(c(a, 0.0), c(a, 0.0)),
        CoherentInput::new(c(-a, 0.0), c(0.0, -half)),
        CoherentInput::new(c(0.0, half), c(-a, 0.0)),
        CoherentInput::new(c(-half, 0.0), c(0.0, half)),
        CoherentInput::new(c(0.0, 0.0), c(0.0, 0.0)),
    ]
}
