//! Model checkpoint persistence
//!
//! A checkpoint is a directory holding `classifier.json` and, for
//! fine-tuned runs, `quantum.json` in the parameter-file format.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ExperimentConfig;
use crate::error::{CvtlError, CvtlResult};
use crate::machine_learning::core::{ClassifierSnapshot, DenseClassifier};
use crate::machine_learning::quantum::TransferModel;
use crate::quantum::parameters::GateParameters;

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const QUANTUM_FILE: &str = "quantum.json";

/// On-disk form of the classifier head
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRecord {
    /// Input width followed by the output width of every layer
    pub widths: Vec<usize>,
    #[serde(flatten)]
    pub snapshot: ClassifierSnapshot,
}

impl ClassifierRecord {
    pub fn from_snapshot(snapshot: ClassifierSnapshot) -> Self {
        let input = snapshot
            .layers
            .first()
            .and_then(|layer| layer.weights.first())
            .map(Vec::len)
            .unwrap_or(0);
        let widths = std::iter::once(input)
            .chain(snapshot.layers.iter().map(|layer| layer.biases.len()))
            .collect();
        ClassifierRecord { widths, snapshot }
    }

    /// Rebuilds the classifier, checking the recorded widths against the weights.
    pub fn to_classifier(&self) -> CvtlResult<DenseClassifier> {
        let rebuilt = ClassifierRecord::from_snapshot(self.snapshot.clone());
        if rebuilt.widths != self.widths {
            return Err(CvtlError::Parameters(format!(
                "checkpoint widths {:?} do not match its weights {:?}",
                self.widths, rebuilt.widths
            )));
        }
        Ok(DenseClassifier::from_snapshot(&self.snapshot)?)
    }
}

/// Parameters restored from a checkpoint directory
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub classifier: DenseClassifier,
    /// Fine-tuned circuit parameters, when the run trained them
    pub quantum: Option<GateParameters>,
}

impl Checkpoint {
    /// Rebuilds the model held by this checkpoint.
    ///
    /// Fine-tuned circuit parameters take precedence over `fallback`. Unless
    /// `keep_depth` is set, `config.q_depth` is taken from the fine-tuned
    /// circuit, which was saved already truncated to the depth it trained at.
    pub fn restore(
        self,
        config: &mut ExperimentConfig,
        fallback: Option<GateParameters>,
        keep_depth: bool,
    ) -> CvtlResult<TransferModel> {
        let params = match (self.quantum, fallback) {
            (Some(tuned), _) => {
                if !keep_depth {
                    config.q_depth = tuned.depth();
                } else if config.q_depth > tuned.depth() {
                    return Err(CvtlError::Config(format!(
                        "q_depth {} exceeds the {} fine-tuned layers stored in the checkpoint",
                        config.q_depth,
                        tuned.depth()
                    )));
                }
                tuned
            }
            (None, Some(params)) => params,
            (None, None) => {
                return Err(CvtlError::Config(
                    "checkpoint holds no circuit parameters and none were supplied".to_string(),
                ))
            }
        };
        TransferModel::with_classifier(config, &params, self.classifier)
    }
}

/// Writes the trained parameters of `model` into `dir`, creating it if needed.
pub fn save(dir: &Path, model: &TransferModel) -> CvtlResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| CvtlError::io(dir, e))?;

    let record = ClassifierRecord::from_snapshot(model.classifier_snapshot());
    let classifier_path = dir.join(CLASSIFIER_FILE);
    let text = serde_json::to_string_pretty(&record)?;
    fs::write(&classifier_path, text).map_err(|e| CvtlError::io(&classifier_path, e))?;

    let quantum_path = dir.join(QUANTUM_FILE);
    if model.fine_tune() {
        model.gate_parameters().to_json_file(&quantum_path)?;
    } else if quantum_path.exists() {
        // frozen runs must not leave an earlier fine-tuned circuit behind
        fs::remove_file(&quantum_path).map_err(|e| CvtlError::io(&quantum_path, e))?;
    }

    info!(dir = %dir.display(), fine_tune = model.fine_tune(), "checkpoint written");
    Ok(dir.to_path_buf())
}

/// Reads a checkpoint directory written by [`save`].
pub fn load(dir: &Path) -> CvtlResult<Checkpoint> {
    let classifier_path = dir.join(CLASSIFIER_FILE);
    let text = fs::read_to_string(&classifier_path).map_err(|e| CvtlError::io(&classifier_path, e))?;
    let record: ClassifierRecord = serde_json::from_str(&text)?;
    let classifier = record.to_classifier()?;

    let quantum_path = dir.join(QUANTUM_FILE);
    let quantum = if quantum_path.exists() {
        Some(GateParameters::from_json_file(&quantum_path)?)
    } else {
        None
    };

    Ok(Checkpoint { classifier, quantum })
}
