//! Experiment configuration
//!
//! All recognized options live in [`ExperimentConfig`]. A configuration is
//! usually read from a JSON file and then patched by command-line flags;
//! [`ExperimentConfig::validate`] must pass before any stage is built.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CvtlError, CvtlResult};

/// Maximum number of quantum layers a parameter file can describe.
pub const MAX_Q_DEPTH: usize = 25;

/// Smallest Fock cutoff the feature extractor accepts.
pub const MIN_CUTOFF: usize = 3;

/// Optimizer used for the gradient updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Adaptive moment estimation
    #[default]
    Adam,
    /// Plain gradient descent
    Sgd,
}

/// Gate-magnitude saturation bounds applied on every forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateClips {
    pub disp_clip: f64,
    pub sq_clip: f64,
    pub kerr_clip: f64,
}

impl Default for GateClips {
    fn default() -> Self {
        GateClips {
            disp_clip: 5.0,
            sq_clip: 5.0,
            kerr_clip: 1.0,
        }
    }
}

/// Full configuration surface of an experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Truncation dimension of the photon-number basis per mode
    pub cutoff: usize,
    /// Edge length of the sub-space block used for features
    pub im_dim: usize,
    /// Number of quantum layers composed
    pub q_depth: usize,
    /// Number of classical dense layers
    pub c_depth: usize,
    /// Renormalized sub-space feature extraction
    pub sub_space: bool,
    /// Let the quantum parameters receive gradient updates
    pub fine_tune: bool,
    /// Standard deviation of the additive displacement noise
    pub noise_scale: f64,
    /// Magnitude of the base coherent-state displacements
    pub alpha: f64,
    pub num_epochs: usize,
    pub num_test_batches: usize,
    /// Report every `dump` iterations
    pub dump: usize,
    /// Learning rate
    pub step: f64,
    #[serde(flatten)]
    pub clips: GateClips,
    /// Standard deviation of the initial classifier weights
    pub init_std: f64,
    pub optimizer: OptimizerKind,
    /// Finite-difference step used when fine-tuning the circuit
    pub fd_epsilon: f64,
    /// Seed for every random draw of the run
    pub seed: Option<u64>,
    /// Evolve batch samples on the rayon pool
    pub parallel: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            cutoff: 11,
            im_dim: 4,
            q_depth: MAX_Q_DEPTH,
            c_depth: 1,
            sub_space: true,
            fine_tune: false,
            noise_scale: 0.3,
            alpha: 1.4,
            num_epochs: 1000,
            num_test_batches: 100,
            dump: 100,
            step: 0.01,
            clips: GateClips::default(),
            init_std: 0.1,
            optimizer: OptimizerKind::Adam,
            fd_epsilon: 1e-4,
            seed: None,
            parallel: true,
        }
    }
}

impl ExperimentConfig {
    /// Reads a configuration from a JSON file; missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CvtlResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| CvtlError::io(path, e))?;
        let config: ExperimentConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Edge length of the amplitude block the features are taken from.
    pub fn feature_edge(&self) -> usize {
        if self.sub_space {
            self.im_dim
        } else {
            self.cutoff
        }
    }

    /// Number of features handed to the classifier.
    pub fn feature_count(&self) -> usize {
        let edge = self.feature_edge();
        edge * edge
    }

    /// Checks every option and fails on the first invalid one.
    pub fn validate(&self) -> CvtlResult<()> {
        if self.cutoff < MIN_CUTOFF {
            return Err(CvtlError::Config(format!(
                "cutoff must be at least {}, got {}",
                MIN_CUTOFF, self.cutoff
            )));
        }
        if self.im_dim == 0 || self.im_dim > self.cutoff {
            return Err(CvtlError::Config(format!(
                "im_dim must lie in [1, cutoff={}], got {}",
                self.cutoff, self.im_dim
            )));
        }
        if self.q_depth > MAX_Q_DEPTH {
            return Err(CvtlError::Config(format!(
                "q_depth must be at most {}, got {}",
                MAX_Q_DEPTH, self.q_depth
            )));
        }
        if self.c_depth == 0 {
            return Err(CvtlError::Config("c_depth must be at least 1".to_string()));
        }
        if self.dump == 0 {
            return Err(CvtlError::Config("dump must be at least 1".to_string()));
        }
        if !self.noise_scale.is_finite() || self.noise_scale < 0.0 {
            return Err(CvtlError::Config(format!(
                "noise_scale must be a finite non-negative number, got {}",
                self.noise_scale
            )));
        }
        if !self.alpha.is_finite() {
            return Err(CvtlError::Config(format!("alpha must be finite, got {}", self.alpha)));
        }

        let positive = [
            ("step", self.step),
            ("init_std", self.init_std),
            ("fd_epsilon", self.fd_epsilon),
            ("disp_clip", self.clips.disp_clip),
            ("sq_clip", self.clips.sq_clip),
            ("kerr_clip", self.clips.kerr_clip),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CvtlError::Config(format!(
                    "{} must be a finite positive number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
