//! Gate parameter store
//!
//! The pre-trained circuit is described by sixteen real vectors, one entry
//! per layer. On disk they are a JSON array of sixteen numeric arrays in the
//! fixed order given by [`ParameterKind::ALL`].

use std::fs;
use std::path::Path;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::MAX_Q_DEPTH;
use crate::error::{CvtlError, CvtlResult};

/// Number of parameter vectors describing one layer.
pub const PARAMETER_KINDS: usize = 16;

/// The sixteen per-layer gate parameters, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    R1,
    R2,
    Theta1,
    Phi1,
    Theta2,
    Phi2,
    Sqr1,
    Sqphi1,
    Sqr2,
    Sqphi2,
    Dr1,
    Dphi1,
    Dr2,
    Dphi2,
    Kappa1,
    Kappa2,
}

impl ParameterKind {
    /// File order of the parameter vectors.
    pub const ALL: [ParameterKind; PARAMETER_KINDS] = [
        ParameterKind::R1,
        ParameterKind::R2,
        ParameterKind::Theta1,
        ParameterKind::Phi1,
        ParameterKind::Theta2,
        ParameterKind::Phi2,
        ParameterKind::Sqr1,
        ParameterKind::Sqphi1,
        ParameterKind::Sqr2,
        ParameterKind::Sqphi2,
        ParameterKind::Dr1,
        ParameterKind::Dphi1,
        ParameterKind::Dr2,
        ParameterKind::Dphi2,
        ParameterKind::Kappa1,
        ParameterKind::Kappa2,
    ];

    /// Position of this vector in the parameter file.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ParameterKind::R1 => "r1",
            ParameterKind::R2 => "r2",
            ParameterKind::Theta1 => "theta1",
            ParameterKind::Phi1 => "phi1",
            ParameterKind::Theta2 => "theta2",
            ParameterKind::Phi2 => "phi2",
            ParameterKind::Sqr1 => "sqr1",
            ParameterKind::Sqphi1 => "sqphi1",
            ParameterKind::Sqr2 => "sqr2",
            ParameterKind::Sqphi2 => "sqphi2",
            ParameterKind::Dr1 => "dr1",
            ParameterKind::Dphi1 => "dphi1",
            ParameterKind::Dr2 => "dr2",
            ParameterKind::Dphi2 => "dphi2",
            ParameterKind::Kappa1 => "kappa1",
            ParameterKind::Kappa2 => "kappa2",
        }
    }
}

/// Per-layer gate parameters of the photonic circuit.
///
/// Every vector has the same length, equal to the number of layers the
/// circuit applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct GateParameters {
    values: Vec<Vec<f64>>,
}

impl GateParameters {
    /// Builds a store from sixteen vectors of equal length.
    pub fn new(values: Vec<Vec<f64>>) -> CvtlResult<Self> {
        if values.len() != PARAMETER_KINDS {
            return Err(CvtlError::Parameters(format!(
                "expected {} parameter vectors, got {}",
                PARAMETER_KINDS,
                values.len()
            )));
        }

        let depth = values[0].len();
        for (kind, vector) in ParameterKind::ALL.iter().zip(values.iter()) {
            if vector.len() != depth {
                return Err(CvtlError::Parameters(format!(
                    "vector {} has length {}, expected {}",
                    kind.name(),
                    vector.len(),
                    depth
                )));
            }
            if let Some(bad) = vector.iter().find(|v| !v.is_finite()) {
                return Err(CvtlError::Parameters(format!(
                    "vector {} contains non-finite value {}",
                    kind.name(),
                    bad
                )));
            }
        }

        Ok(GateParameters { values })
    }

    /// All-zero parameters for `depth` layers.
    pub fn zeros(depth: usize) -> Self {
        GateParameters {
            values: vec![vec![0.0; depth]; PARAMETER_KINDS],
        }
    }

    /// Normally distributed parameters, useful when no pre-trained file is at hand.
    pub fn random<R: Rng + ?Sized>(depth: usize, std_dev: f64, rng: &mut R) -> CvtlResult<Self> {
        let normal = Normal::new(0.0, std_dev)
            .map_err(|e| CvtlError::Parameters(format!("invalid standard deviation: {}", e)))?;
        let values = (0..PARAMETER_KINDS)
            .map(|_| (0..depth).map(|_| normal.sample(rng)).collect())
            .collect();
        Ok(GateParameters { values })
    }

    /// Loads a parameter file (JSON array of sixteen arrays).
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CvtlResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| CvtlError::io(path, e))?;
        let params: GateParameters = serde_json::from_str(&text)?;
        debug!(path = %path.display(), depth = params.depth(), "loaded gate parameters");
        Ok(params)
    }

    /// Writes the parameters in the parameter-file format.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> CvtlResult<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|e| CvtlError::io(path, e))
    }

    /// Number of layers described.
    pub fn depth(&self) -> usize {
        self.values[0].len()
    }

    /// Keeps the first `q_depth` layers.
    ///
    /// Fails when the store describes fewer layers than requested.
    pub fn truncated(&self, q_depth: usize) -> CvtlResult<Self> {
        if q_depth > MAX_Q_DEPTH {
            return Err(CvtlError::Config(format!(
                "q_depth must be at most {}, got {}",
                MAX_Q_DEPTH, q_depth
            )));
        }
        if q_depth > self.depth() {
            return Err(CvtlError::Config(format!(
                "q_depth {} exceeds the {} layers available in the parameter file",
                q_depth,
                self.depth()
            )));
        }
        if q_depth < self.depth() {
            warn!(
                available = self.depth(),
                q_depth, "parameter file describes more layers than are applied"
            );
        }

        Ok(GateParameters {
            values: self.values.iter().map(|v| v[..q_depth].to_vec()).collect(),
        })
    }

    /// Value of one parameter in one layer.
    pub fn get(&self, kind: ParameterKind, layer: usize) -> f64 {
        self.values[kind.index()][layer]
    }

    /// The whole vector for one parameter.
    pub fn vector(&self, kind: ParameterKind) -> &[f64] {
        &self.values[kind.index()]
    }

    /// Total number of scalar parameters.
    pub fn len(&self) -> usize {
        PARAMETER_KINDS * self.depth()
    }

    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// Parameters flattened kind-major, the layout used for fine-tuning.
    pub fn to_flat(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }

    /// Replaces every value from a kind-major flat vector.
    pub fn set_flat(&mut self, flat: &[f64]) -> CvtlResult<()> {
        if flat.len() != self.len() {
            return Err(CvtlError::Dimension {
                what: "flat gate parameters",
                expected: self.len(),
                actual: flat.len(),
            });
        }

        let depth = self.depth();
        for (vector, chunk) in self.values.iter_mut().zip(flat.chunks(depth.max(1))) {
            vector.copy_from_slice(chunk);
        }
        Ok(())
    }
}

impl TryFrom<Vec<Vec<f64>>> for GateParameters {
    type Error = CvtlError;

    fn try_from(values: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        GateParameters::new(values)
    }
}

impl From<GateParameters> for Vec<Vec<f64>> {
    fn from(params: GateParameters) -> Self {
        params.values
    }
}
