// src/quantum/gate.rs
//! Continuous-variable gates in the truncated Fock basis
//!
//! Gates are plain data: a [`Gate`] carries its numeric parameters and a
//! [`GateOp`] binds it to the modes it acts on. The simulator turns each
//! gate into matrices over the photon-number basis `|0⟩ … |cutoff-1⟩`.
//! Every matrix element is the exact element of the infinite-dimensional
//! operator; truncation only drops rows and columns.

use std::fmt;

use ndarray::Array2;
use num_complex::Complex64;

/// Common complex numbers used by the gate matrices
pub mod constants {
    use num_complex::Complex64;

    /// The imaginary unit i
    pub const I: Complex64 = Complex64::new(0.0, 1.0);

    pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);

    pub const ONE: Complex64 = Complex64::new(1.0, 0.0);
}

use constants::{I, ONE, ZERO};

/// Hard saturation of `value` to `[-bound, bound]`.
///
/// Saturating an already saturated value returns it unchanged.
pub fn clip(value: f64, bound: f64) -> f64 {
    value.max(-bound).min(bound)
}

/// Elementary gates of the two-mode photonic circuit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    /// `exp(θ(e^{iφ} a b† − e^{−iφ} a† b))` on a pair of modes
    Beamsplitter { theta: f64, phi: f64 },

    /// `exp(iφ n)`
    Rotation { phi: f64 },

    /// `exp((z* a² − z a†²)/2)` with `z = r e^{iφ}`
    Squeezing { r: f64, phi: f64 },

    /// `exp(α a† − α* a)` with `α = r e^{iφ}`
    Displacement { r: f64, phi: f64 },

    /// `exp(iκ n²)`
    Kerr { kappa: f64 },
}

impl Gate {
    /// Displacement by a complex amplitude.
    pub fn displacement_from(alpha: Complex64) -> Self {
        Gate::Displacement {
            r: alpha.norm(),
            phi: alpha.arg(),
        }
    }

    /// Number of modes the gate acts on.
    pub fn mode_count(&self) -> usize {
        match self {
            Gate::Beamsplitter { .. } => 2,
            _ => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gate::Beamsplitter { .. } => "BS",
            Gate::Rotation { .. } => "R",
            Gate::Squeezing { .. } => "S",
            Gate::Displacement { .. } => "D",
            Gate::Kerr { .. } => "K",
        }
    }

    /// Matrix of a single-mode gate in the truncated basis.
    ///
    /// Returns `None` for two-mode gates, see [`beamsplitter_blocks`].
    pub fn single_mode_matrix(&self, cutoff: usize) -> Option<Array2<Complex64>> {
        match *self {
            Gate::Beamsplitter { .. } => None,
            Gate::Rotation { phi } => Some(diagonal(cutoff, |n| phi * n as f64)),
            Gate::Kerr { kappa } => Some(diagonal(cutoff, |n| kappa * (n * n) as f64)),
            Gate::Displacement { r, phi } => Some(displacement_matrix(r, phi, cutoff)),
            Gate::Squeezing { r, phi } => Some(squeezing_matrix(r, phi, cutoff)),
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Beamsplitter { theta, phi } => write!(f, "BS({:.4}, {:.4})", theta, phi),
            Gate::Rotation { phi } => write!(f, "R({:.4})", phi),
            Gate::Squeezing { r, phi } => write!(f, "S({:.4}, {:.4})", r, phi),
            Gate::Displacement { r, phi } => write!(f, "D({:.4}, {:.4})", r, phi),
            Gate::Kerr { kappa } => write!(f, "K({:.4})", kappa),
        }
    }
}

/// Modes a gate is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeTarget {
    Single(usize),
    Pair(usize, usize),
}

/// A gate bound to its target modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateOp {
    pub gate: Gate,
    pub target: ModeTarget,
}

impl GateOp {
    pub fn single(gate: Gate, mode: usize) -> Self {
        GateOp {
            gate,
            target: ModeTarget::Single(mode),
        }
    }

    pub fn pair(gate: Gate, first: usize, second: usize) -> Self {
        GateOp {
            gate,
            target: ModeTarget::Pair(first, second),
        }
    }
}

impl fmt::Display for GateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            ModeTarget::Single(m) => write!(f, "{} | q[{}]", self.gate, m),
            ModeTarget::Pair(a, b) => write!(f, "{} | (q[{}], q[{}])", self.gate, a, b),
        }
    }
}

/// One total-photon-number block of a beam-splitter.
///
/// `matrix[[i, j]]` maps `|lo + j, N − lo − j⟩` to `|lo + i, N − lo − i⟩`,
/// restricted to the indices representable under the cutoff.
#[derive(Debug, Clone)]
pub struct PhotonBlock {
    pub total: usize,
    pub lo: usize,
    pub matrix: Array2<Complex64>,
}

/// Beam-splitter matrices for every total photon number below `2 * cutoff - 1`.
///
/// The beam-splitter conserves total photon number, so each block is the
/// exponential of the generator restricted to that (finite) block.
pub fn beamsplitter_blocks(theta: f64, phi: f64, cutoff: usize) -> Vec<PhotonBlock> {
    let forward = Complex64::from_polar(theta, phi);
    let backward = -Complex64::from_polar(theta, -phi);
    let max_total = 2 * cutoff.saturating_sub(1);
    let mut blocks = Vec::with_capacity(max_total + 1);

    for total in 0..=max_total {
        let dim = total + 1;
        let mut generator = Array2::<Complex64>::zeros((dim, dim));
        for n in 0..dim {
            // a b† |n, N-n⟩
            if n > 0 {
                let amp = ((n * (total - n + 1)) as f64).sqrt();
                generator[[n - 1, n]] += forward * amp;
            }
            // a† b |n, N-n⟩
            if n < total {
                let amp = (((n + 1) * (total - n)) as f64).sqrt();
                generator[[n + 1, n]] += backward * amp;
            }
        }

        let full = expm(&generator);
        let lo = total.saturating_sub(cutoff - 1);
        let hi = total.min(cutoff - 1);
        let matrix = full.slice(ndarray::s![lo..=hi, lo..=hi]).to_owned();
        blocks.push(PhotonBlock { total, lo, matrix });
    }

    blocks
}

fn diagonal<F>(cutoff: usize, phase: F) -> Array2<Complex64>
where
    F: Fn(usize) -> f64,
{
    let mut matrix = Array2::zeros((cutoff, cutoff));
    for n in 0..cutoff {
        matrix[[n, n]] = (I * phase(n)).exp();
    }
    matrix
}

/// Displacement matrix through the lower-index recurrence.
fn displacement_matrix(r: f64, phi: f64, cutoff: usize) -> Array2<Complex64> {
    let sqrt: Vec<f64> = (0..cutoff).map(|n| (n as f64).sqrt()).collect();
    let alpha = Complex64::from_polar(r, phi);
    let mut d = Array2::<Complex64>::zeros((cutoff, cutoff));

    d[[0, 0]] = ONE * (-0.5 * r * r).exp();
    for m in 1..cutoff {
        d[[m, 0]] = alpha / sqrt[m] * d[[m - 1, 0]];
    }
    for m in 0..cutoff {
        for n in 1..cutoff {
            let mut value = -alpha.conj() / sqrt[n] * d[[m, n - 1]];
            if m > 0 {
                value += sqrt[m] / sqrt[n] * d[[m - 1, n - 1]];
            }
            d[[m, n]] = value;
        }
    }

    d
}

/// Squeezing matrix through the two-step recurrence; only even `m + n` survive.
fn squeezing_matrix(r: f64, phi: f64, cutoff: usize) -> Array2<Complex64> {
    let sqrt: Vec<f64> = (0..cutoff).map(|n| (n as f64).sqrt()).collect();
    let phase_tanh = Complex64::from_polar(r.tanh(), phi);
    let sech = 1.0 / r.cosh();
    let mut s = Array2::<Complex64>::zeros((cutoff, cutoff));

    s[[0, 0]] = ONE * sech.sqrt();
    for m in (2..cutoff).step_by(2) {
        s[[m, 0]] = sqrt[m - 1] / sqrt[m] * -phase_tanh * s[[m - 2, 0]];
    }
    for m in 0..cutoff {
        for n in 1..cutoff {
            if (m + n) % 2 != 0 {
                continue;
            }
            let mut value = ZERO;
            if n >= 2 {
                value += sqrt[n - 1] / sqrt[n] * phase_tanh.conj() * s[[m, n - 2]];
            }
            if m >= 1 {
                value += sqrt[m] / sqrt[n] * sech * s[[m - 1, n - 1]];
            }
            s[[m, n]] = value;
        }
    }

    s
}

/// Matrix exponential by scaling and squaring of a truncated Taylor series.
pub(crate) fn expm(a: &Array2<Complex64>) -> Array2<Complex64> {
    const TAYLOR_TERMS: usize = 24;

    let dim = a.nrows();
    let norm = a
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|z| z.norm()).sum::<f64>())
        .fold(0.0, f64::max);
    let squarings = if norm > 0.5 {
        (norm / 0.5).log2().ceil() as i32
    } else {
        0
    };

    let scaled = a.mapv(|z| z / 2f64.powi(squarings));
    let identity = Array2::from_diag(&ndarray::Array1::from_elem(dim, ONE));
    let mut result = identity.clone();
    let mut term = identity;
    for k in 1..=TAYLOR_TERMS {
        term = term.dot(&scaled).mapv(|z| z / k as f64);
        result = result + &term;
    }
    for _ in 0..squarings {
        result = result.dot(&result);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_unitary(m: &Array2<Complex64>, tol: f64) -> bool {
        let adj = m.t().mapv(|z| z.conj());
        let product = adj.dot(m);
        product.indexed_iter().all(|((i, j), z)| {
            let target = if i == j { ONE } else { ZERO };
            (z - target).norm() < tol
        })
    }

    #[test]
    fn test_expm_of_zero_is_identity() {
        let zero = Array2::<Complex64>::zeros((3, 3));
        let e = expm(&zero);
        assert!(is_unitary(&e, 1e-14));
        assert_eq!(e[[1, 1]], ONE);
    }

    #[test]
    fn test_expm_phase() {
        let mut a = Array2::<Complex64>::zeros((1, 1));
        a[[0, 0]] = I * 2.5;
        let e = expm(&a);
        assert!((e[[0, 0]] - (I * 2.5).exp()).norm() < 1e-12);
    }

    #[test]
    fn test_full_beamsplitter_blocks_are_unitary() {
        // Blocks with total < cutoff are complete and therefore unitary.
        let blocks = beamsplitter_blocks(0.9, 0.4, 6);
        for block in blocks.iter().filter(|b| b.total < 6) {
            assert_eq!(block.lo, 0);
            assert!(is_unitary(&block.matrix, 1e-10));
        }
        assert_eq!(blocks.len(), 11);
    }

    #[test]
    fn test_fifty_fifty_single_photon() {
        let blocks = beamsplitter_blocks(std::f64::consts::FRAC_PI_4, 0.0, 4);
        let one = &blocks[1].matrix;
        let half = std::f64::consts::FRAC_1_SQRT_2;
        for z in one.iter() {
            assert!((z.norm() - half).abs() < 1e-12);
        }
    }
}
