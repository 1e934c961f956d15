// tests/feature_tests.rs
//! Tests for feature extraction from evolved states

use ndarray::{Array2, Axis};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;

use cvtl::config::{ExperimentConfig, GateClips};
use cvtl::error::CvtlError;
use cvtl::machine_learning::dataset::CoherentStateDataset;
use cvtl::machine_learning::features::FeatureExtractor;
use cvtl::quantum::circuit::compose_layers;
use cvtl::quantum::parameters::GateParameters;
use cvtl::quantum::state::{FockBatch, FockState};
use cvtl::simulators::FockSimulator;

fn evolved_batch(cutoff: usize, q_depth: usize, noise: f64, seed: u64) -> FockBatch {
    let mut rng = StdRng::seed_from_u64(seed);
    let params = GateParameters::random(q_depth, 0.1, &mut rng).unwrap();
    let layers = compose_layers(&params, q_depth, &GateClips::default()).unwrap();
    let batch = CoherentStateDataset::new(1.4, noise).unwrap().sample(&mut rng);
    FockSimulator::new(cutoff)
        .evolve_batch(&batch.preparations(), &layers, false)
        .unwrap()
}

#[test]
fn test_sub_space_features_have_unit_mass() {
    let states = evolved_batch(11, 2, 0.3, 4);
    let extractor = FeatureExtractor::new(11, 4, true).unwrap();
    let features = extractor.extract(&states).unwrap();

    assert_eq!(features.batch_size(), 7);
    assert_eq!(features.feature_count(), 16);
    for row in features.features.axis_iter(Axis(0)) {
        let mass: f64 = row.iter().map(|f| f * f).sum();
        assert!((mass - 1.0).abs() < 1e-5, "mass {}", mass);
        assert!(row.iter().all(|&f| f >= 0.0));
    }
    for image in features.images.axis_iter(Axis(0)) {
        assert!((image.sum() - 1.0).abs() < 1e-5);
    }
}

#[test]
fn test_full_space_features_are_unscaled() {
    let states = evolved_batch(7, 1, 0.0, 2);
    let extractor = FeatureExtractor::new(7, 3, false).unwrap();
    let features = extractor.extract(&states).unwrap();

    assert_eq!(features.feature_count(), 49);
    for (i, row) in features.features.axis_iter(Axis(0)).enumerate() {
        for (f, a) in row.iter().zip(states.sample(i).iter()) {
            assert_eq!(*f, a.norm());
        }
    }
}

#[test]
fn test_images_keep_full_state() {
    let states = evolved_batch(9, 0, 0.0, 1);
    let extractor = FeatureExtractor::new(9, 4, true).unwrap();
    let features = extractor.extract(&states).unwrap();

    assert_eq!(features.images.dim(), (7, 4, 4));
    assert_eq!(features.full_images.dim(), (7, 9, 9));
}

#[test]
fn test_feature_count_follows_configuration() {
    let config = ExperimentConfig::default();
    let extractor = FeatureExtractor::from_config(&config).unwrap();
    assert_eq!(extractor.feature_count(), config.im_dim * config.im_dim);

    let config = ExperimentConfig {
        sub_space: false,
        ..ExperimentConfig::default()
    };
    let extractor = FeatureExtractor::from_config(&config).unwrap();
    assert_eq!(extractor.feature_count(), config.cutoff * config.cutoff);
}

#[test]
fn test_empty_block_is_numerical_instability() {
    let mut amplitudes = Array2::zeros((6, 6));
    amplitudes[[5, 5]] = Complex64::new(1.0, 0.0);
    let batch = FockBatch::from_states(&[FockState::new(amplitudes).unwrap()]).unwrap();

    let extractor = FeatureExtractor::new(6, 4, true).unwrap();
    assert!(matches!(
        extractor.extract(&batch),
        Err(CvtlError::NumericalInstability { .. })
    ));
}

#[test]
fn test_cutoff_mismatch_is_rejected() {
    let states = evolved_batch(8, 0, 0.0, 3);
    let extractor = FeatureExtractor::new(9, 4, true).unwrap();
    assert!(matches!(extractor.extract(&states), Err(CvtlError::Dimension { .. })));
}

#[test]
fn test_im_dim_above_cutoff_is_rejected() {
    assert!(FeatureExtractor::new(5, 6, true).is_err());
    assert!(FeatureExtractor::new(5, 0, true).is_err());
}
