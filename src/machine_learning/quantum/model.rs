//! Hybrid transfer-learning model
//!
//! A [`TransferModel`] chains the pre-trained photonic circuit, the feature
//! extractor and a dense classifier head. The circuit parameters are frozen
//! unless fine-tuning is switched on, in which case their gradients come
//! from central finite differences of the batch loss.

use ndarray::Array2;
use tracing::{debug, trace};

use crate::config::{ExperimentConfig, GateClips};
use crate::context::ExecutionContext;
use crate::error::{CvtlError, CvtlResult};
use crate::machine_learning::core::{ArchitecturalModel, ClassifierSnapshot, DenseClassifier, Model};
use crate::machine_learning::dataset::{InputBatch, NUM_CLASSES};
use crate::machine_learning::features::{FeatureBatch, FeatureExtractor};
use crate::machine_learning::loss::{accuracy, one_hot, LossFunction, SoftmaxCrossEntropy};
use crate::machine_learning::optimizer::Optimizer;
use crate::quantum::circuit::compose_layers;
use crate::quantum::parameters::GateParameters;
use crate::simulators::FockSimulator;

/// Everything a forward pass produced for one batch
#[derive(Debug, Clone)]
pub struct ForwardPass {
    pub features: FeatureBatch,
    /// Raw class logits, one row per sample
    pub logits: Array2<f64>,
}

/// Loss and accuracy of one batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchMetrics {
    pub loss: f64,
    pub accuracy: f64,
}

/// Pre-trained circuit plus trainable classifier
#[derive(Debug, Clone)]
pub struct TransferModel {
    params: GateParameters,
    clips: GateClips,
    simulator: FockSimulator,
    extractor: FeatureExtractor,
    classifier: DenseClassifier,
    fine_tune: bool,
    fd_epsilon: f64,
}

impl TransferModel {
    /// Builds the model with a freshly initialized classifier.
    ///
    /// `params` may describe more layers than `config.q_depth`; only the
    /// leading ones are kept.
    pub fn new(config: &ExperimentConfig, params: &GateParameters, ctx: &mut ExecutionContext) -> CvtlResult<Self> {
        let extractor = FeatureExtractor::from_config(config)?;
        let classifier = DenseClassifier::new(
            extractor.feature_count(),
            config.c_depth,
            NUM_CLASSES,
            config.init_std,
            ctx.rng(),
        )?;
        Self::with_classifier(config, params, classifier)
    }

    /// Builds the model around an existing classifier, e.g. one restored from a checkpoint.
    pub fn with_classifier(
        config: &ExperimentConfig,
        params: &GateParameters,
        classifier: DenseClassifier,
    ) -> CvtlResult<Self> {
        config.validate()?;
        let extractor = FeatureExtractor::from_config(config)?;

        let (inputs, outputs) = classifier.dimensions();
        if inputs != extractor.feature_count() {
            return Err(CvtlError::Dimension {
                what: "classifier input width",
                expected: extractor.feature_count(),
                actual: inputs,
            });
        }
        if outputs != NUM_CLASSES {
            return Err(CvtlError::Dimension {
                what: "classifier output width",
                expected: NUM_CLASSES,
                actual: outputs,
            });
        }

        let params = params.truncated(config.q_depth)?;
        debug!(
            q_depth = params.depth(),
            features = extractor.feature_count(),
            classifier = %classifier.architecture_description(),
            fine_tune = config.fine_tune,
            "built transfer model"
        );

        Ok(TransferModel {
            params,
            clips: config.clips,
            simulator: FockSimulator::new(config.cutoff),
            extractor,
            classifier,
            fine_tune: config.fine_tune,
            fd_epsilon: config.fd_epsilon,
        })
    }

    pub fn gate_parameters(&self) -> &GateParameters {
        &self.params
    }

    pub fn classifier(&self) -> &DenseClassifier {
        &self.classifier
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn fine_tune(&self) -> bool {
        self.fine_tune
    }

    pub fn classifier_snapshot(&self) -> ClassifierSnapshot {
        self.classifier.to_snapshot()
    }

    /// Evolves the batch and extracts its features.
    pub fn features(&self, batch: &InputBatch, parallel: bool) -> CvtlResult<FeatureBatch> {
        self.features_with(&self.params, batch, parallel)
    }

    fn features_with(&self, params: &GateParameters, batch: &InputBatch, parallel: bool) -> CvtlResult<FeatureBatch> {
        let layers = compose_layers(params, params.depth(), &self.clips)?;
        let states = self
            .simulator
            .evolve_batch(&batch.preparations(), &layers, parallel)?;
        self.extractor.extract(&states)
    }

    /// Full forward pass: circuit, features, logits.
    pub fn forward(&self, batch: &InputBatch, parallel: bool) -> CvtlResult<ForwardPass> {
        let features = self.features(batch, parallel)?;
        let cache = self.classifier.forward_batch(&features.features)?;
        Ok(ForwardPass {
            logits: cache.logits().clone(),
            features,
        })
    }

    /// Loss and accuracy of a batch without touching any parameter.
    pub fn evaluate(&self, batch: &InputBatch, parallel: bool) -> CvtlResult<BatchMetrics> {
        let pass = self.forward(batch, parallel)?;
        metrics(&pass.logits, &batch.labels)
    }

    /// One gradient update on a batch.
    ///
    /// Returns the metrics measured before the update. `quantum_optimizer`
    /// is only used when fine-tuning is on.
    pub fn train_step(
        &mut self,
        batch: &InputBatch,
        classifier_optimizer: &mut dyn Optimizer,
        quantum_optimizer: Option<&mut dyn Optimizer>,
        parallel: bool,
    ) -> CvtlResult<BatchMetrics> {
        let features = self.features(batch, parallel)?;
        let cache = self.classifier.forward_batch(&features.features)?;
        let batch_metrics = metrics(cache.logits(), &batch.labels)?;

        let targets = one_hot(&batch.labels, NUM_CLASSES);
        let grad_logits = SoftmaxCrossEntropy.calculate_gradients(cache.logits(), &targets);
        let classifier_grads = self.classifier.backward(&cache, &grad_logits)?;

        // Circuit gradients are taken at the same classifier weights
        let quantum_update = match (self.fine_tune, quantum_optimizer) {
            (true, Some(optimizer)) => Some((self.quantum_gradients(batch, parallel)?, optimizer)),
            _ => None,
        };

        let mut weights = self.classifier.get_parameters();
        classifier_optimizer.update(&mut weights, &classifier_grads)?;
        self.classifier.set_parameters(&weights)?;

        if let Some((grads, optimizer)) = quantum_update {
            let mut flat = self.params.to_flat();
            optimizer.update(&mut flat, &grads)?;
            self.params.set_flat(&flat)?;
        }

        Ok(batch_metrics)
    }

    /// Central finite-difference gradient of the batch loss with respect to
    /// every circuit parameter, in kind-major order.
    pub fn quantum_gradients(&self, batch: &InputBatch, parallel: bool) -> CvtlResult<Vec<f64>> {
        let base = self.params.to_flat();
        let eps = self.fd_epsilon;
        let mut shifted = self.params.clone();
        let mut gradients = Vec::with_capacity(base.len());

        for index in 0..base.len() {
            let mut probe = base.clone();

            probe[index] = base[index] + eps;
            shifted.set_flat(&probe)?;
            let loss_plus = self.loss_with(&shifted, batch, parallel)?;

            probe[index] = base[index] - eps;
            shifted.set_flat(&probe)?;
            let loss_minus = self.loss_with(&shifted, batch, parallel)?;

            gradients.push((loss_plus - loss_minus) / (2.0 * eps));
        }
        trace!(count = gradients.len(), "finite-difference circuit gradients");
        Ok(gradients)
    }

    fn loss_with(&self, params: &GateParameters, batch: &InputBatch, parallel: bool) -> CvtlResult<f64> {
        let features = self.features_with(params, batch, parallel)?;
        let cache = self.classifier.forward_batch(&features.features)?;
        Ok(metrics(cache.logits(), &batch.labels)?.loss)
    }
}

/// Mean softmax cross-entropy and accuracy of a batch of logits.
pub fn metrics(logits: &Array2<f64>, labels: &[usize]) -> CvtlResult<BatchMetrics> {
    if logits.nrows() != labels.len() {
        return Err(CvtlError::Dimension {
            what: "label count",
            expected: logits.nrows(),
            actual: labels.len(),
        });
    }

    if let Some(bad) = logits.iter().find(|v| !v.is_finite()) {
        return Err(CvtlError::NumericalInstability {
            stage: "classifier",
            detail: format!("non-finite logit {}", bad),
        });
    }

    let targets = one_hot(labels, logits.ncols());
    let loss = SoftmaxCrossEntropy.calculate_loss(logits, &targets);
    if !loss.is_finite() {
        return Err(CvtlError::NumericalInstability {
            stage: "loss",
            detail: format!("batch loss is {}", loss),
        });
    }

    Ok(BatchMetrics {
        loss,
        accuracy: accuracy(logits, labels),
    })
}
