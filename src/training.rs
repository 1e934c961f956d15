//! Training loop
//!
//! A run is a train phase of `num_epochs` noisy batches with updates, a test
//! phase of `num_test_batches` noisy batches without updates, then an
//! optional checkpoint write. Each phase keeps its own running averages.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::info;

use crate::checkpoint;
use crate::config::ExperimentConfig;
use crate::context::ExecutionContext;
use crate::error::CvtlResult;
use crate::machine_learning::dataset::CoherentStateDataset;
use crate::machine_learning::optimizer::{build_optimizer, Optimizer};
use crate::machine_learning::quantum::{BatchMetrics, TransferModel};
use crate::quantum::parameters::GateParameters;

/// Which loop a report or summary belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Test,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Train => write!(f, "train"),
            Phase::Test => write!(f, "test"),
        }
    }
}

/// Running loss and accuracy averages of one phase
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    loss_sum: f64,
    accuracy_sum: f64,
    count: usize,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metrics: BatchMetrics) {
        self.loss_sum += metrics.loss;
        self.accuracy_sum += metrics.accuracy;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean loss over the recorded iterations; zero before the first one.
    pub fn mean_loss(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.loss_sum / self.count as f64
        }
    }

    pub fn mean_accuracy(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.accuracy_sum / self.count as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One periodic progress line
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub phase: Phase,
    /// One-based iteration number
    pub iteration: usize,
    pub running_loss: f64,
    pub running_accuracy: f64,
    /// Wall-clock time of this iteration alone
    pub elapsed: Duration,
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} iteration {}: running loss {:.4}, running accuracy {:.4}, time {:.3}s",
            self.phase,
            self.iteration,
            self.running_loss,
            self.running_accuracy,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Aggregate result of one phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub iterations: usize,
    pub mean_loss: f64,
    pub mean_accuracy: f64,
    pub reports: Vec<ProgressReport>,
}

impl fmt::Display for PhaseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} iterations, loss {:.4}, accuracy {:.4}",
            self.phase, self.iterations, self.mean_loss, self.mean_accuracy
        )
    }
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub train: PhaseSummary,
    pub test: PhaseSummary,
    /// Seed that reproduces the run
    pub seed: u64,
    pub checkpoint: Option<PathBuf>,
}

/// Drives the train and test phases of one experiment
#[derive(Debug)]
pub struct Trainer {
    config: ExperimentConfig,
    model: TransferModel,
    dataset: CoherentStateDataset,
    ctx: ExecutionContext,
    classifier_optimizer: Box<dyn Optimizer>,
    quantum_optimizer: Option<Box<dyn Optimizer>>,
    checkpoint_dir: Option<PathBuf>,
}

impl Trainer {
    /// Builds a fresh model around `params` and sets up the optimizers.
    pub fn new(config: ExperimentConfig, params: &GateParameters, mut ctx: ExecutionContext) -> CvtlResult<Self> {
        config.validate()?;
        let model = TransferModel::new(&config, params, &mut ctx)?;
        Self::from_model(config, model, ctx)
    }

    /// Uses an already built model, e.g. one restored from a checkpoint.
    pub fn from_model(config: ExperimentConfig, model: TransferModel, ctx: ExecutionContext) -> CvtlResult<Self> {
        config.validate()?;
        let dataset = CoherentStateDataset::new(config.alpha, config.noise_scale)?;
        let classifier_optimizer = build_optimizer(config.optimizer, config.step);
        let quantum_optimizer = if config.fine_tune {
            Some(build_optimizer(config.optimizer, config.step))
        } else {
            None
        };

        Ok(Trainer {
            config,
            model,
            dataset,
            ctx,
            classifier_optimizer,
            quantum_optimizer,
            checkpoint_dir: None,
        })
    }

    /// Write a checkpoint into `dir` at the end of [`Trainer::run`].
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    pub fn model(&self) -> &TransferModel {
        &self.model
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.ctx.seed()
    }

    /// Runs a single update on a fresh noisy batch.
    pub fn train_iteration(&mut self) -> CvtlResult<BatchMetrics> {
        let batch = self.dataset.sample(self.ctx.rng());
        let parallel = self.ctx.parallel();
        let quantum_optimizer = self
            .quantum_optimizer
            .as_mut()
            .map(|optimizer| &mut **optimizer as &mut dyn Optimizer);
        self.model
            .train_step(&batch, &mut *self.classifier_optimizer, quantum_optimizer, parallel)
    }

    /// Evaluates a fresh noisy batch without updating anything.
    pub fn test_iteration(&mut self) -> CvtlResult<BatchMetrics> {
        let batch = self.dataset.sample(self.ctx.rng());
        self.model.evaluate(&batch, self.ctx.parallel())
    }

    /// `num_epochs` update steps.
    pub fn train_phase(&mut self) -> CvtlResult<PhaseSummary> {
        self.phase(Phase::Train, self.config.num_epochs)
    }

    /// `num_test_batches` evaluation steps.
    pub fn test_phase(&mut self) -> CvtlResult<PhaseSummary> {
        self.phase(Phase::Test, self.config.num_test_batches)
    }

    fn phase(&mut self, phase: Phase, iterations: usize) -> CvtlResult<PhaseSummary> {
        let mut stats = RunningStats::new();
        let mut reports = Vec::new();

        for index in 0..iterations {
            let started = Instant::now();
            let metrics = match phase {
                Phase::Train => self.train_iteration()?,
                Phase::Test => self.test_iteration()?,
            };
            stats.record(metrics);

            let iteration = index + 1;
            if iteration % self.config.dump == 0 {
                let report = ProgressReport {
                    phase,
                    iteration,
                    running_loss: stats.mean_loss(),
                    running_accuracy: stats.mean_accuracy(),
                    elapsed: started.elapsed(),
                };
                info!(
                    phase = %phase,
                    iteration,
                    loss = report.running_loss,
                    accuracy = report.running_accuracy,
                    secs = report.elapsed.as_secs_f64(),
                    "progress"
                );
                reports.push(report);
            }
        }

        let summary = PhaseSummary {
            phase,
            iterations: stats.count(),
            mean_loss: stats.mean_loss(),
            mean_accuracy: stats.mean_accuracy(),
            reports,
        };
        info!(
            phase = %phase,
            iterations = summary.iterations,
            loss = summary.mean_loss,
            accuracy = summary.mean_accuracy,
            "phase finished"
        );
        Ok(summary)
    }

    /// Train phase, test phase, then the checkpoint write when a directory is set.
    pub fn run(&mut self) -> CvtlResult<RunSummary> {
        info!(seed = self.ctx.seed(), "starting run");
        let train = self.train_phase()?;
        let test = self.test_phase()?;

        let checkpoint = match &self.checkpoint_dir {
            Some(dir) => Some(checkpoint::save(dir, &self.model)?),
            None => None,
        };

        Ok(RunSummary {
            train,
            test,
            seed: self.ctx.seed(),
            checkpoint,
        })
    }
}
