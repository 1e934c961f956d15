//! Feature extraction from evolved states
//!
//! With sub-space mode on, each sample keeps the leading `im_dim × im_dim`
//! amplitude block and rescales it to unit probability mass. Mass outside
//! the block is discarded before rescaling, so the features describe the
//! state conditioned on landing inside the block. With sub-space mode off
//! the full `cutoff × cutoff` magnitudes are used unchanged.

use ndarray::{s, Array2, Array3, Axis};
use num_complex::Complex64;

use crate::config::ExperimentConfig;
use crate::error::{CvtlError, CvtlResult};
use crate::quantum::state::FockBatch;

/// Features of one batch plus the images used for visualization
#[derive(Debug, Clone)]
pub struct FeatureBatch {
    /// One row of non-negative magnitudes per sample
    pub features: Array2<f64>,
    /// Squared magnitudes of the (renormalized) block used for the features
    pub images: Array3<f64>,
    /// Squared magnitudes of the whole truncated state
    pub full_images: Array3<f64>,
}

impl FeatureBatch {
    pub fn batch_size(&self) -> usize {
        self.features.nrows()
    }

    pub fn feature_count(&self) -> usize {
        self.features.ncols()
    }
}

/// Turns evolved states into classifier inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureExtractor {
    cutoff: usize,
    im_dim: usize,
    sub_space: bool,
}

impl FeatureExtractor {
    pub fn new(cutoff: usize, im_dim: usize, sub_space: bool) -> CvtlResult<Self> {
        if im_dim == 0 || im_dim > cutoff {
            return Err(CvtlError::Config(format!(
                "im_dim must lie in [1, {}], got {}",
                cutoff, im_dim
            )));
        }
        Ok(FeatureExtractor {
            cutoff,
            im_dim,
            sub_space,
        })
    }

    pub fn from_config(config: &ExperimentConfig) -> CvtlResult<Self> {
        Self::new(config.cutoff, config.im_dim, config.sub_space)
    }

    /// Edge of the block the features come from.
    pub fn edge(&self) -> usize {
        if self.sub_space {
            self.im_dim
        } else {
            self.cutoff
        }
    }

    /// Number of features per sample.
    pub fn feature_count(&self) -> usize {
        self.edge() * self.edge()
    }

    /// The (possibly renormalized) amplitude block of every sample.
    pub fn project(&self, batch: &FockBatch) -> CvtlResult<Array3<Complex64>> {
        if batch.cutoff() != self.cutoff {
            return Err(CvtlError::Dimension {
                what: "evolved state cutoff",
                expected: self.cutoff,
                actual: batch.cutoff(),
            });
        }

        if !self.sub_space {
            return Ok(batch.amplitudes().to_owned());
        }

        let edge = self.im_dim;
        let mut block = batch.amplitudes().slice(s![.., ..edge, ..edge]).to_owned();
        for (index, mut sample) in block.axis_iter_mut(Axis(0)).enumerate() {
            let mass: Complex64 = sample.iter().map(|a| a * a.conj()).sum();
            let norm = mass.norm().sqrt();
            if !norm.is_finite() || norm == 0.0 {
                return Err(CvtlError::NumericalInstability {
                    stage: "feature extraction",
                    detail: format!("sample {} has block norm {}", index, norm),
                });
            }
            sample.mapv_inplace(|a| a / norm);
        }
        Ok(block)
    }

    /// Features and images for a batch of evolved states.
    pub fn extract(&self, batch: &FockBatch) -> CvtlResult<FeatureBatch> {
        let block = self.project(batch)?;
        let samples = block.shape()[0];
        let edge = self.edge();

        let magnitudes = block.mapv(|a| a.norm());
        let features = magnitudes
            .into_shape((samples, edge * edge))
            .map_err(|e| CvtlError::NumericalInstability {
                stage: "feature extraction",
                detail: e.to_string(),
            })?;

        if let Some(bad) = features.iter().find(|v| !v.is_finite()) {
            return Err(CvtlError::NumericalInstability {
                stage: "feature extraction",
                detail: format!("non-finite feature {}", bad),
            });
        }

        Ok(FeatureBatch {
            features,
            images: block.mapv(|a| a.norm_sqr()),
            full_images: batch.amplitudes().mapv(|a| a.norm_sqr()),
        })
    }
}
