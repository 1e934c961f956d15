// tests/training_tests.rs
//! End-to-end tests for the training loop and checkpoints

use rand::rngs::StdRng;
use rand::SeedableRng;

use cvtl::checkpoint::{self, CLASSIFIER_FILE, QUANTUM_FILE};
use cvtl::config::ExperimentConfig;
use cvtl::context::ExecutionContext;
use cvtl::machine_learning::dataset::CoherentStateDataset;
use cvtl::machine_learning::prelude::*;
use cvtl::quantum::parameters::GateParameters;
use cvtl::training::{Phase, Trainer};
use cvtl::CvtlError;

fn quick_config() -> ExperimentConfig {
    ExperimentConfig {
        cutoff: 7,
        im_dim: 3,
        q_depth: 2,
        num_epochs: 10,
        num_test_batches: 4,
        dump: 5,
        seed: Some(2024),
        parallel: false,
        ..ExperimentConfig::default()
    }
}

fn random_params(depth: usize, seed: u64) -> GateParameters {
    let mut rng = StdRng::seed_from_u64(seed);
    GateParameters::random(depth, 0.1, &mut rng).unwrap()
}

fn trainer(config: ExperimentConfig, params: &GateParameters) -> Trainer {
    let ctx = ExecutionContext::from_config(&config);
    Trainer::new(config, params, ctx).unwrap()
}

#[test]
fn test_noiseless_inputs_are_learned_without_circuit() {
    let config = ExperimentConfig {
        cutoff: 11,
        im_dim: 4,
        q_depth: 0,
        c_depth: 1,
        sub_space: true,
        noise_scale: 0.0,
        num_epochs: 1000,
        num_test_batches: 5,
        dump: 250,
        step: 0.05,
        seed: Some(1),
        parallel: false,
        ..ExperimentConfig::default()
    };
    let mut trainer = trainer(config, &GateParameters::zeros(0));
    let summary = trainer.run().unwrap();

    assert_eq!(summary.train.iterations, 1000);
    assert_eq!(summary.test.iterations, 5);
    assert!(
        summary.test.mean_accuracy >= 6.0 / 7.0 - 1e-12,
        "test accuracy {}",
        summary.test.mean_accuracy
    );
    assert!(summary.test.mean_loss < summary.train.reports[0].running_loss);
}

#[test]
fn test_overwhelming_noise_drops_toward_chance() {
    let config = ExperimentConfig {
        cutoff: 11,
        im_dim: 4,
        q_depth: 0,
        noise_scale: 3.0,
        num_epochs: 200,
        num_test_batches: 50,
        dump: 100,
        step: 0.05,
        seed: Some(5),
        parallel: false,
        ..ExperimentConfig::default()
    };
    let mut trainer = trainer(config, &GateParameters::zeros(0));
    let summary = trainer.run().unwrap();

    assert!(summary.test.mean_accuracy < 0.3, "test accuracy {}", summary.test.mean_accuracy);
}

#[test]
fn test_noise_beyond_cutoff_is_numerical_instability() {
    let config = ExperimentConfig {
        cutoff: 11,
        im_dim: 4,
        q_depth: 0,
        noise_scale: 140.0,
        num_epochs: 10,
        num_test_batches: 1,
        dump: 5,
        seed: Some(5),
        parallel: false,
        ..ExperimentConfig::default()
    };
    let mut trainer = trainer(config, &GateParameters::zeros(0));
    assert!(matches!(trainer.run(), Err(CvtlError::NumericalInstability { .. })));
}

#[test]
fn test_reports_every_dump_iterations() {
    let mut trainer = trainer(quick_config(), &random_params(3, 1));
    let train = trainer.train_phase().unwrap();

    assert_eq!(train.phase, Phase::Train);
    let iterations: Vec<usize> = train.reports.iter().map(|r| r.iteration).collect();
    assert_eq!(iterations, vec![5, 10]);
    assert!((train.reports[1].running_loss - train.mean_loss).abs() < 1e-12);

    let test = trainer.test_phase().unwrap();
    assert_eq!(test.phase, Phase::Test);
    assert_eq!(test.iterations, 4);
    assert!(test.reports.is_empty());
}

#[test]
fn test_test_phase_leaves_classifier_untouched() {
    let mut trainer = trainer(quick_config(), &random_params(2, 4));
    let before = trainer.model().classifier().get_parameters();
    trainer.test_phase().unwrap();
    assert_eq!(trainer.model().classifier().get_parameters(), before);
}

#[test]
fn test_same_seed_reproduces_run() {
    let params = random_params(2, 8);
    let first = trainer(quick_config(), &params).run().unwrap();
    let second = trainer(quick_config(), &params).run().unwrap();

    assert_eq!(first.seed, 2024);
    assert_eq!(first.train.mean_loss, second.train.mean_loss);
    assert_eq!(first.train.mean_accuracy, second.train.mean_accuracy);
    assert_eq!(first.test.mean_loss, second.test.mean_loss);
}

#[test]
fn test_checkpoint_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = quick_config();
    let params = random_params(2, 10);

    let mut trainer = trainer(config.clone(), &params).with_checkpoint_dir(dir.path());
    let summary = trainer.run().unwrap();
    assert_eq!(summary.checkpoint.as_deref(), Some(dir.path()));
    assert!(dir.path().join(CLASSIFIER_FILE).exists());
    assert!(!dir.path().join(QUANTUM_FILE).exists());

    let restored = checkpoint::load(dir.path()).unwrap();
    assert!(restored.quantum.is_none());
    assert_eq!(
        restored.classifier.get_parameters(),
        trainer.model().classifier().get_parameters()
    );

    let model = TransferModel::with_classifier(&config, &params, restored.classifier).unwrap();
    let clean = CoherentStateDataset::new(config.alpha, 0.0).unwrap().clean_batch();
    assert_eq!(
        model.evaluate(&clean, false).unwrap(),
        trainer.model().evaluate(&clean, false).unwrap()
    );
}

#[test]
fn test_fine_tuned_checkpoint_keeps_circuit() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExperimentConfig {
        fine_tune: true,
        q_depth: 1,
        num_epochs: 2,
        num_test_batches: 1,
        ..quick_config()
    };
    let params = random_params(1, 12);

    let mut trainer = trainer(config, &params).with_checkpoint_dir(dir.path());
    trainer.run().unwrap();

    let restored = checkpoint::load(dir.path()).unwrap();
    let tuned = restored.quantum.unwrap();
    assert_eq!(&tuned, trainer.model().gate_parameters());
    assert_ne!(tuned, params);
}

#[test]
fn test_frozen_run_replaces_fine_tuned_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let params = random_params(2, 14);
    let tuned_config = ExperimentConfig {
        fine_tune: true,
        num_epochs: 2,
        num_test_batches: 1,
        ..quick_config()
    };
    trainer(tuned_config, &params)
        .with_checkpoint_dir(dir.path())
        .run()
        .unwrap();
    assert!(dir.path().join(QUANTUM_FILE).exists());

    let mut frozen = trainer(quick_config(), &params).with_checkpoint_dir(dir.path());
    frozen.run().unwrap();
    assert!(!dir.path().join(QUANTUM_FILE).exists());

    let restored = checkpoint::load(dir.path()).unwrap();
    assert!(restored.quantum.is_none());
    assert_eq!(
        restored.classifier.get_parameters(),
        frozen.model().classifier().get_parameters()
    );
}

#[test]
fn test_restore_adopts_fine_tuned_depth() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExperimentConfig {
        fine_tune: true,
        q_depth: 1,
        num_epochs: 2,
        num_test_batches: 1,
        ..quick_config()
    };
    let mut tuned = trainer(config, &random_params(1, 16)).with_checkpoint_dir(dir.path());
    tuned.run().unwrap();

    let mut deeper = quick_config();
    assert_eq!(deeper.q_depth, 2);
    let model = checkpoint::load(dir.path())
        .unwrap()
        .restore(&mut deeper, Some(random_params(3, 1)), false)
        .unwrap();
    assert_eq!(deeper.q_depth, 1);
    assert_eq!(model.gate_parameters(), tuned.model().gate_parameters());

    let mut explicit = quick_config();
    let result = checkpoint::load(dir.path())
        .unwrap()
        .restore(&mut explicit, None, true);
    assert!(matches!(result, Err(CvtlError::Config(_))));
}

#[test]
fn test_restore_needs_circuit_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let config = quick_config();
    let params = random_params(2, 18);
    trainer(config.clone(), &params)
        .with_checkpoint_dir(dir.path())
        .run()
        .unwrap();

    let mut missing = config.clone();
    assert!(matches!(
        checkpoint::load(dir.path()).unwrap().restore(&mut missing, None, false),
        Err(CvtlError::Config(_))
    ));

    let mut supplied = config;
    let model = checkpoint::load(dir.path())
        .unwrap()
        .restore(&mut supplied, Some(params.clone()), false)
        .unwrap();
    assert_eq!(supplied.q_depth, 2);
    assert_eq!(model.gate_parameters(), &params);
}

#[test]
fn test_depth_beyond_parameter_file_fails_fast() {
    let config = ExperimentConfig {
        q_depth: 5,
        ..quick_config()
    };
    let ctx = ExecutionContext::from_config(&config);
    let result = Trainer::new(config, &random_params(3, 1), ctx);
    assert!(matches!(result, Err(CvtlError::Config(_))));
}

#[test]
fn test_small_cutoff_fails_fast() {
    let config = ExperimentConfig {
        cutoff: 2,
        im_dim: 2,
        ..quick_config()
    };
    let ctx = ExecutionContext::from_config(&config);
    let result = Trainer::new(config, &random_params(2, 1), ctx);
    assert!(matches!(result, Err(CvtlError::Config(_))));
}

#[test]
fn test_missing_checkpoint_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = checkpoint::load(&dir.path().join("absent"));
    assert!(matches!(result, Err(CvtlError::Io { .. })));
}

#[test]
fn test_mismatched_checkpoint_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = quick_config();
    let params = random_params(2, 3);
    let mut trainer = trainer(config.clone(), &params).with_checkpoint_dir(dir.path());
    trainer.run().unwrap();

    let restored = checkpoint::load(dir.path()).unwrap();
    let wider = ExperimentConfig {
        im_dim: 4,
        ..config
    };
    assert!(matches!(
        TransferModel::with_classifier(&wider, &params, restored.classifier),
        Err(CvtlError::Dimension { .. })
    ));
}
