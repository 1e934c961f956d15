// src/quantum/state.rs
//! Two-mode pure states in the truncated Fock basis
//!
//! A [`FockState`] stores the amplitudes `⟨n₀, n₁|ψ⟩` for
//! `n₀, n₁ < cutoff`. A [`FockBatch`] stacks one state per sample along a
//! leading batch axis, the layout the feature extractor consumes.

use std::fmt::{self, Display};

use ndarray::{s, Array2, Array3, ArrayView2};
use num_complex::Complex64;

use crate::error::{CvtlError, CvtlResult};
use crate::quantum::gate::PhotonBlock;

/// Number of optical modes in the register.
pub const MODES: usize = 2;

/// Pure two-mode state
#[derive(Clone, Debug, PartialEq)]
pub struct FockState {
    amplitudes: Array2<Complex64>,
}

impl FockState {
    /// Create a state from a `cutoff × cutoff` amplitude array
    pub fn new(amplitudes: Array2<Complex64>) -> CvtlResult<Self> {
        let (rows, cols) = amplitudes.dim();
        if rows != cols {
            return Err(CvtlError::Dimension {
                what: "two-mode amplitude array",
                expected: rows,
                actual: cols,
            });
        }
        Ok(FockState { amplitudes })
    }

    /// The two-mode vacuum `|0, 0⟩`
    pub fn vacuum(cutoff: usize) -> Self {
        let mut amplitudes = Array2::zeros((cutoff, cutoff));
        amplitudes[[0, 0]] = Complex64::new(1.0, 0.0);
        FockState { amplitudes }
    }

    pub fn cutoff(&self) -> usize {
        self.amplitudes.nrows()
    }

    pub fn amplitudes(&self) -> &Array2<Complex64> {
        &self.amplitudes
    }

    /// Probability mass retained inside the truncated basis.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|a| a.norm_sqr()).sum()
    }

    /// Photon-number probabilities `|⟨n₀, n₁|ψ⟩|²`.
    pub fn probabilities(&self) -> Array2<f64> {
        self.amplitudes.mapv(|a| a.norm_sqr())
    }

    /// Mean photon number of one mode.
    pub fn mean_photon(&self, mode: usize) -> f64 {
        self.amplitudes
            .indexed_iter()
            .map(|((n0, n1), a)| {
                let n = if mode == 0 { n0 } else { n1 };
                n as f64 * a.norm_sqr()
            })
            .sum()
    }

    /// Applies a single-mode matrix to `mode`.
    pub fn apply_single(&mut self, mode: usize, matrix: &Array2<Complex64>) -> CvtlResult<()> {
        if matrix.dim() != self.amplitudes.dim() {
            return Err(CvtlError::Dimension {
                what: "single-mode gate matrix",
                expected: self.cutoff(),
                actual: matrix.nrows(),
            });
        }

        self.amplitudes = match mode {
            0 => matrix.dot(&self.amplitudes),
            1 => self.amplitudes.dot(&matrix.t()),
            _ => {
                return Err(CvtlError::Dimension {
                    what: "mode index",
                    expected: MODES,
                    actual: mode,
                })
            }
        };
        Ok(())
    }

    /// Applies a photon-number-conserving two-mode gate given by its blocks.
    ///
    /// `first` is the mode playing the role of `a` in the block basis.
    pub fn apply_blocks(&mut self, first: usize, second: usize, blocks: &[PhotonBlock]) -> CvtlResult<()> {
        if first >= MODES || second >= MODES || first == second {
            return Err(CvtlError::Dimension {
                what: "two-mode gate targets",
                expected: MODES,
                actual: first.max(second),
            });
        }

        let cutoff = self.cutoff();
        let swapped = first == 1;
        let index = |n: usize, total: usize| if swapped { [total - n, n] } else { [n, total - n] };

        for block in blocks {
            let width = block.matrix.nrows();
            let gathered: Vec<Complex64> = (0..width)
                .map(|j| self.amplitudes[index(block.lo + j, block.total)])
                .collect();
            for i in 0..width {
                let value: Complex64 = block
                    .matrix
                    .row(i)
                    .iter()
                    .zip(gathered.iter())
                    .map(|(u, v)| u * v)
                    .sum();
                let [n0, n1] = index(block.lo + i, block.total);
                debug_assert!(n0 < cutoff && n1 < cutoff);
                self.amplitudes[[n0, n1]] = value;
            }
        }
        Ok(())
    }
}

impl Display for FockState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "two-mode state (cutoff {}):", self.cutoff())?;

        let threshold = 1e-10;
        for ((n0, n1), amp) in self.amplitudes.indexed_iter() {
            let prob = amp.norm_sqr();
            if prob > threshold {
                writeln!(
                    f,
                    "  ({:.6}{:+.6}i) |{}, {}⟩ [{:.1}%]",
                    amp.re,
                    amp.im,
                    n0,
                    n1,
                    prob * 100.0
                )?;
            }
        }
        Ok(())
    }
}

/// Evolved states of a whole batch, indexed `(sample, n₀, n₁)`
#[derive(Clone, Debug)]
pub struct FockBatch {
    amplitudes: Array3<Complex64>,
}

impl FockBatch {
    /// Stack states of equal cutoff.
    pub fn from_states(states: &[FockState]) -> CvtlResult<Self> {
        let cutoff = states.first().map(FockState::cutoff).unwrap_or(0);
        let mut amplitudes = Array3::zeros((states.len(), cutoff, cutoff));
        for (i, state) in states.iter().enumerate() {
            if state.cutoff() != cutoff {
                return Err(CvtlError::Dimension {
                    what: "batch state cutoff",
                    expected: cutoff,
                    actual: state.cutoff(),
                });
            }
            amplitudes.slice_mut(s![i, .., ..]).assign(state.amplitudes());
        }
        Ok(FockBatch { amplitudes })
    }

    pub fn batch_size(&self) -> usize {
        self.amplitudes.shape()[0]
    }

    pub fn cutoff(&self) -> usize {
        self.amplitudes.shape()[1]
    }

    pub fn amplitudes(&self) -> &Array3<Complex64> {
        &self.amplitudes
    }

    /// Amplitudes of one sample.
    pub fn sample(&self, index: usize) -> ArrayView2<'_, Complex64> {
        self.amplitudes.slice(s![index, .., ..])
    }
}
