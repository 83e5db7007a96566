//! Scoring artifacts: the optional transform and classification capabilities.
//!
//! Each artifact slot (feature selector, scaler, classifier) is loaded
//! independently at startup. A slot that fails to load stays empty and the
//! pipeline degrades around it; a load failure never prevents the service
//! from starting. Artifacts are immutable after startup and shared across
//! requests without locking.
//!
//! The concrete artifacts here are JSON documents exported from the training
//! pipeline (kept-index selector, standard scaler, logistic regression). The
//! pipeline only sees the `TransformStage` / `Classifier` traits, so other
//! backends can be swapped in at that seam.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::Config;

/// Error raised by a transform or predict call.
///
/// These never escape the scoring pipeline; they are logged at the stage
/// boundary and the pipeline carries on with the best available input.
#[derive(Debug, Clone)]
pub struct ArtifactError {
    message: String,
}

impl ArtifactError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ArtifactError {}

/// A vector-to-vector transform step (selector, scaler).
///
/// Output length may differ from input length: the selector reduces
/// dimensionality, the scaler preserves it.
pub trait TransformStage: Send + Sync {
    /// Stage name used in logs.
    fn name(&self) -> &'static str;

    fn apply(&self, input: &[f64]) -> Result<Vec<f64>, ArtifactError>;
}

/// A classification step producing per-class probabilities for one sample.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Class-probability row. Shape interpretation is the pipeline's job.
    fn predict(&self, input: &[f64]) -> Result<Vec<f64>, ArtifactError>;
}

// ============ JSON artifact implementations ============

/// Keeps a fixed subset of feature indices, dropping the rest.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexSelector {
    /// Expected input arity.
    pub n_features: usize,
    /// Indices to keep, in output order.
    pub keep: Vec<usize>,
}

impl TransformStage for IndexSelector {
    fn name(&self) -> &'static str {
        "feature_selector"
    }

    fn apply(&self, input: &[f64]) -> Result<Vec<f64>, ArtifactError> {
        if input.len() != self.n_features {
            return Err(ArtifactError::new(format!(
                "selector expects {} features, got {}",
                self.n_features,
                input.len()
            )));
        }
        self.keep
            .iter()
            .map(|&i| {
                input.get(i).copied().ok_or_else(|| {
                    ArtifactError::new(format!("selector index {} out of range", i))
                })
            })
            .collect()
    }
}

/// Per-feature standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl TransformStage for StandardScaler {
    fn name(&self) -> &'static str {
        "scaler"
    }

    fn apply(&self, input: &[f64]) -> Result<Vec<f64>, ArtifactError> {
        if input.len() != self.mean.len() || self.mean.len() != self.scale.len() {
            return Err(ArtifactError::new(format!(
                "scaler expects {} features, got {}",
                self.mean.len(),
                input.len()
            )));
        }
        Ok(input
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(&x, (&m, &s))| {
                // Zero-variance features pass through centered, same as the
                // training-side scaler.
                let s = if s == 0.0 { 1.0 } else { s };
                (x - m) / s
            })
            .collect())
    }
}

/// Logistic-regression classifier.
///
/// One coefficient row means binary classification and yields the usual
/// `[1 - p, p]` pair; multiple rows yield a softmax distribution.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    /// One row of weights per class (a single row for binary models).
    pub coefficients: Vec<Vec<f64>>,
    /// One intercept per coefficient row.
    pub intercepts: Vec<f64>,
}

impl LogisticModel {
    fn dot(&self, row: usize, input: &[f64]) -> Result<f64, ArtifactError> {
        let weights = &self.coefficients[row];
        if weights.len() != input.len() {
            return Err(ArtifactError::new(format!(
                "classifier expects {} features, got {}",
                weights.len(),
                input.len()
            )));
        }
        let z: f64 = weights.iter().zip(input).map(|(w, x)| w * x).sum();
        Ok(z + self.intercepts.get(row).copied().unwrap_or(0.0))
    }
}

impl Classifier for LogisticModel {
    fn name(&self) -> &'static str {
        "classifier"
    }

    fn predict(&self, input: &[f64]) -> Result<Vec<f64>, ArtifactError> {
        if self.coefficients.is_empty() || self.coefficients.len() != self.intercepts.len() {
            return Err(ArtifactError::new("classifier has malformed weights"));
        }
        if self.coefficients.len() == 1 {
            let z = self.dot(0, input)?;
            let p = 1.0 / (1.0 + (-z).exp());
            return Ok(vec![1.0 - p, p]);
        }
        // Multi-class: softmax over class scores, shifted for stability.
        let scores: Vec<f64> = (0..self.coefficients.len())
            .map(|row| self.dot(row, input))
            .collect::<Result<_, _>>()?;
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|z| (z - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        Ok(exps.into_iter().map(|e| e / sum).collect())
    }
}

// ============ Artifact set & loading ============

/// The full set of optional scoring artifacts, loaded once at startup.
///
/// Any subset may be present, including none.
#[derive(Clone, Default)]
pub struct ArtifactSet {
    pub selector: Option<Arc<dyn TransformStage>>,
    pub scaler: Option<Arc<dyn TransformStage>>,
    pub classifier: Option<Arc<dyn Classifier>>,
}

impl ArtifactSet {
    /// Load all artifact slots from the configured model directory.
    ///
    /// Each slot loads independently; a missing or unreadable file leaves
    /// that slot empty and is logged, never propagated.
    pub async fn load(config: &Config) -> Self {
        let selector = load_json_artifact::<IndexSelector>(&config.selector_path())
            .await
            .map(|a| Arc::new(a) as Arc<dyn TransformStage>);
        let scaler = load_json_artifact::<StandardScaler>(&config.scaler_path())
            .await
            .map(|a| Arc::new(a) as Arc<dyn TransformStage>);
        let classifier = load_json_artifact::<LogisticModel>(&config.classifier_path())
            .await
            .map(|a| Arc::new(a) as Arc<dyn Classifier>);

        tracing::info!(
            selector = selector.is_some(),
            scaler = scaler.is_some(),
            classifier = classifier.is_some(),
            "Scoring artifacts loaded"
        );

        Self {
            selector,
            scaler,
            classifier,
        }
    }
}

/// Load one JSON artifact, logging the outcome.
///
/// A missing file is an expected state (the stage is simply disabled); a
/// present-but-unparseable file is logged as an error. Both leave the slot
/// empty.
async fn load_json_artifact<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("Artifact {} not present, stage disabled", path.display());
            return None;
        }
        Err(e) => {
            tracing::error!("Failed to read artifact {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(artifact) => {
            tracing::info!("Loaded artifact {}", path.display());
            Some(artifact)
        }
        Err(e) => {
            tracing::error!("Failed to parse artifact {}: {}", path.display(), e);
            None
        }
    }
}
