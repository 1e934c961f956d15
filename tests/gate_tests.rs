// tests/gate_tests.rs
//! Tests for the truncated Fock-basis gates

use ndarray::Array2;
use num_complex::Complex64;
use proptest::prelude::*;

use cvtl::quantum::gate::constants::{I, ONE, ZERO};
use cvtl::quantum::gate::*;
use cvtl::quantum::state::FockState;

fn approx_eq(a: Complex64, b: Complex64, tol: f64) -> bool {
    (a - b).norm() < tol
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// `U†U` restricted to the leading `k × k` block.
fn leading_gram(m: &Array2<Complex64>, k: usize) -> Array2<Complex64> {
    let adj = m.t().mapv(|z| z.conj());
    let product = adj.dot(m);
    product.slice(ndarray::s![..k, ..k]).to_owned()
}

#[test]
fn test_rotation_and_kerr_are_diagonal_phases() {
    let rot = Gate::Rotation { phi: 0.3 }.single_mode_matrix(5).unwrap();
    let kerr = Gate::Kerr { kappa: 0.2 }.single_mode_matrix(5).unwrap();

    for n in 0..5 {
        assert!(approx_eq(rot[[n, n]], (I * 0.3 * n as f64).exp(), 1e-14));
        assert!(approx_eq(kerr[[n, n]], (I * 0.2 * (n * n) as f64).exp(), 1e-14));
        for m in 0..5 {
            if m != n {
                assert_eq!(rot[[m, n]], ZERO);
                assert_eq!(kerr[[m, n]], ZERO);
            }
        }
    }
}

#[test]
fn test_displacement_of_vacuum_is_coherent_state() {
    let alpha = Complex64::new(0.8, -0.6);
    let d = Gate::displacement_from(alpha).single_mode_matrix(15).unwrap();

    for n in 0..15 {
        let expected = (-0.5 * alpha.norm_sqr()).exp() * alpha.powu(n as u32) / factorial(n).sqrt();
        assert!(approx_eq(d[[n, 0]], expected, 1e-12), "n = {}", n);
    }
}

#[test]
fn test_displacement_is_unitary_on_low_photon_numbers() {
    let d = Gate::Displacement { r: 0.7, phi: 1.1 }.single_mode_matrix(40).unwrap();
    let gram = leading_gram(&d, 6);
    for ((i, j), z) in gram.indexed_iter() {
        let target = if i == j { ONE } else { ZERO };
        assert!(approx_eq(*z, target, 1e-10), "entry ({}, {}) = {}", i, j, z);
    }
}

#[test]
fn test_squeezed_vacuum_amplitudes() {
    let (r, phi) = (0.4, 0.9);
    let s = Gate::Squeezing { r, phi }.single_mode_matrix(12).unwrap();
    let phase_tanh = Complex64::from_polar(r.tanh(), phi);

    for k in 0..6 {
        let expected = (1.0 / r.cosh()).sqrt()
            * (-phase_tanh).powu(k as u32)
            * (factorial(2 * k).sqrt() / (2f64.powi(k as i32) * factorial(k)));
        assert!(approx_eq(s[[2 * k, 0]], expected, 1e-12), "k = {}", k);
        // odd photon numbers are never populated from vacuum
        assert_eq!(s[[2 * k + 1, 0]], ZERO);
    }
}

#[test]
fn test_squeezing_is_unitary_on_low_photon_numbers() {
    let s = Gate::Squeezing { r: 0.3, phi: -0.4 }.single_mode_matrix(50).unwrap();
    let gram = leading_gram(&s, 5);
    for ((i, j), z) in gram.indexed_iter() {
        let target = if i == j { ONE } else { ZERO };
        assert!(approx_eq(*z, target, 1e-9), "entry ({}, {}) = {}", i, j, z);
    }
}

#[test]
fn test_beamsplitter_has_no_single_mode_matrix() {
    let bs = Gate::Beamsplitter { theta: 0.1, phi: 0.0 };
    assert!(bs.single_mode_matrix(4).is_none());
    assert_eq!(bs.mode_count(), 2);
}

#[test]
fn test_hong_ou_mandel_dip() {
    // |1,1⟩ through a balanced beam-splitter never leaves one photon per mode
    let cutoff = 4;
    let mut amplitudes = Array2::zeros((cutoff, cutoff));
    amplitudes[[1, 1]] = ONE;
    let mut state = FockState::new(amplitudes).unwrap();

    let blocks = beamsplitter_blocks(std::f64::consts::FRAC_PI_4, 0.0, cutoff);
    state.apply_blocks(0, 1, &blocks).unwrap();

    let probs = state.probabilities();
    assert!(probs[[1, 1]] < 1e-12);
    assert!((probs[[2, 0]] - 0.5).abs() < 1e-10);
    assert!((probs[[0, 2]] - 0.5).abs() < 1e-10);
}

#[test]
fn test_gate_display() {
    let op = GateOp::pair(Gate::Beamsplitter { theta: 0.5, phi: 0.25 }, 0, 1);
    assert_eq!(op.to_string(), "BS(0.5000, 0.2500) | (q[0], q[1])");
    let op = GateOp::single(Gate::Kerr { kappa: -0.1 }, 1);
    assert_eq!(op.to_string(), "K(-0.1000) | q[1]");
}

#[test]
fn test_clip_saturates_at_bounds() {
    assert_eq!(clip(7.5, 5.0), 5.0);
    assert_eq!(clip(-7.5, 5.0), -5.0);
    assert_eq!(clip(0.3, 1.0), 0.3);
}

proptest! {
    #[test]
    fn prop_clip_is_idempotent(value in -1e6f64..1e6, bound in 0.0f64..100.0) {
        let once = clip(value, bound);
        prop_assert_eq!(clip(once, bound), once);
        prop_assert!(once.abs() <= bound);
    }

    #[test]
    fn prop_out_of_range_values_hit_the_boundary(excess in 1e-9f64..1e6, bound in 0.0f64..100.0) {
        prop_assert_eq!(clip(bound + excess, bound), bound);
        prop_assert_eq!(clip(-bound - excess, bound), -bound);
    }
}
