//! The scoring pipeline: feature extraction, the optional transform chain,
//! classification with fallback, risk bucketing and audit.
//!
//! The pipeline is infallible from the caller's perspective. Every internal
//! failure is absorbed at its stage boundary and the pipeline degrades to
//! the next-best source, down to a fixed neutral probability. Availability
//! of a (possibly lower-confidence) decision wins over failing the request.

use std::sync::Arc;

use chrono::Utc;

use crate::artifacts::ArtifactSet;
use crate::audit::AuditSink;
use crate::fallback::FallbackTable;
use crate::features::FeatureExtractor;
use crate::models::{
    AuditRecord, RiskLevel, ScoringResult, VerificationRequest, VerificationStatus,
};

/// Map a probability in [0, 1] to a risk bucket.
///
/// Half-open intervals; boundary values belong to the upper bucket, so 0.33
/// is Medium and 0.67 is High.
pub fn classify_risk(probability: f64) -> RiskLevel {
    if probability < 0.33 {
        RiskLevel::Low
    } else if probability < 0.67 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Resolve a classifier's class-probability row to the fraud probability.
///
/// Resolution priority, fixed by the classifier's training contract:
/// a two-class pair takes the positive-class entry, a single column takes
/// that entry, a longer multi-class row takes the last entry. An empty row
/// or a NaN entry is malformed and yields `None`.
fn resolve_probability(row: &[f64]) -> Option<f64> {
    let p = match row.len() {
        0 => return None,
        1 => row[0],
        2 => row[1],
        _ => row[row.len() - 1],
    };
    if p.is_nan() {
        return None;
    }
    Some(p)
}

impl ScoringResult {
    /// Build the full result from a raw probability.
    ///
    /// The probability is clamped to [0, 1] first; artifacts returning
    /// out-of-range values must not leak past this point.
    pub fn from_probability(probability: f64) -> Self {
        let probability = probability.clamp(0.0, 1.0);
        let risk_level = classify_risk(probability);
        Self {
            probability,
            risk_level,
            confidence: 1.0 - probability,
            status: if risk_level == RiskLevel::High {
                VerificationStatus::Flagged
            } else {
                VerificationStatus::Verified
            },
        }
    }
}

/// Orchestrates one verification decision.
///
/// Holds the process-wide artifact set and fallback table behind `Arc`s;
/// requests share them read-only with no locking on the hot path. The audit
/// sink is the only shared mutable collaborator and serializes its own
/// writes.
#[derive(Clone)]
pub struct ScoringPipeline {
    extractor: FeatureExtractor,
    artifacts: Arc<ArtifactSet>,
    fallback: Arc<FallbackTable>,
    audit: AuditSink,
}

impl ScoringPipeline {
    pub fn new(artifacts: Arc<ArtifactSet>, fallback: Arc<FallbackTable>, audit: AuditSink) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            artifacts,
            fallback,
            audit,
        }
    }

    /// Score a request and append the decision to the audit trail.
    ///
    /// Always returns a result; the audit write is best-effort.
    pub fn verify(&self, req: &VerificationRequest) -> ScoringResult {
        let result = self.score(req);
        self.audit.record(AuditRecord {
            timestamp: Utc::now(),
            name: req.name.clone(),
            document_type: req.document_type,
            document_number: req.document_number.clone(),
            risk_level: result.risk_level,
            probability_pct: result.probability * 100.0,
        });
        result
    }

    /// Run the scoring stages without touching the audit trail.
    ///
    /// Deterministic for a fixed artifact set and fallback table.
    pub fn score(&self, req: &VerificationRequest) -> ScoringResult {
        let mut vector = self.extractor.extract(req);

        // Selector before scaler: the selector may change the vector length
        // and the scaler was trained on its output.
        for stage in [&self.artifacts.selector, &self.artifacts.scaler] {
            let Some(stage) = stage else { continue };
            match stage.apply(&vector) {
                Ok(out) => vector = out,
                // Carry the pre-stage vector forward; a broken stage must
                // not take the pipeline down.
                Err(e) => tracing::warn!("Transform stage {} failed: {}", stage.name(), e),
            }
        }

        let probability = self.classify_or_fallback(&vector, &req.document_number);
        ScoringResult::from_probability(probability)
    }

    /// Primary classification, degrading to the lookup table.
    ///
    /// The feature vector is discarded on the fallback path; the table is
    /// keyed on the raw document number alone.
    fn classify_or_fallback(&self, vector: &[f64], document_number: &str) -> f64 {
        let Some(classifier) = &self.artifacts.classifier else {
            tracing::debug!("No classifier loaded, using fallback lookup");
            return self.fallback.lookup(document_number);
        };
        match classifier.predict(vector) {
            Ok(row) => match resolve_probability(&row) {
                Some(p) => p,
                None => {
                    tracing::error!(
                        "Classifier returned malformed output (arity {}), using fallback",
                        row.len()
                    );
                    self.fallback.lookup(document_number)
                }
            },
            Err(e) => {
                tracing::error!("Classifier prediction failed: {}, using fallback", e);
                self.fallback.lookup(document_number)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ArtifactError, Classifier, TransformStage};
    use crate::models::DocumentType;
    use std::collections::HashMap;

    struct FixedClassifier(Vec<f64>);

    impl Classifier for FixedClassifier {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn predict(&self, _input: &[f64]) -> Result<Vec<f64>, ArtifactError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn predict(&self, _input: &[f64]) -> Result<Vec<f64>, ArtifactError> {
            Err(ArtifactError::new("boom"))
        }
    }

    struct FailingStage;

    impl TransformStage for FailingStage {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn apply(&self, _input: &[f64]) -> Result<Vec<f64>, ArtifactError> {
            Err(ArtifactError::new("boom"))
        }
    }

    struct HalvingStage;

    impl TransformStage for HalvingStage {
        fn name(&self) -> &'static str {
            "halving"
        }
        fn apply(&self, input: &[f64]) -> Result<Vec<f64>, ArtifactError> {
            Ok(input[..input.len() / 2].to_vec())
        }
    }

    /// Classifier that reports the arity of its input, for asserting what
    /// the transform chain actually delivered.
    struct AritySpy;

    impl Classifier for AritySpy {
        fn name(&self) -> &'static str {
            "arity-spy"
        }
        fn predict(&self, input: &[f64]) -> Result<Vec<f64>, ArtifactError> {
            Ok(vec![input.len() as f64 / 100.0])
        }
    }

    fn pipeline(artifacts: ArtifactSet, fallback: FallbackTable) -> ScoringPipeline {
        ScoringPipeline::new(Arc::new(artifacts), Arc::new(fallback), AuditSink::disabled())
    }

    fn request(doc: &str) -> VerificationRequest {
        VerificationRequest {
            name: "John Doe".to_string(),
            document_number: doc.to_string(),
            address: "123 Main St".to_string(),
            document_type: DocumentType::Passport,
        }
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(classify_risk(0.0), RiskLevel::Low);
        assert_eq!(classify_risk(0.329), RiskLevel::Low);
        assert_eq!(classify_risk(0.33), RiskLevel::Medium);
        assert_eq!(classify_risk(0.669), RiskLevel::Medium);
        assert_eq!(classify_risk(0.67), RiskLevel::High);
        assert_eq!(classify_risk(1.0), RiskLevel::High);
    }

    #[test]
    fn shape_priority_pair_single_multiclass() {
        assert_eq!(resolve_probability(&[0.2, 0.8]), Some(0.8));
        assert_eq!(resolve_probability(&[0.4]), Some(0.4));
        assert_eq!(resolve_probability(&[0.1, 0.2, 0.7]), Some(0.7));
        assert_eq!(resolve_probability(&[]), None);
        assert_eq!(resolve_probability(&[f64::NAN, f64::NAN]), None);
    }

    #[test]
    fn no_artifacts_empty_table_yields_neutral_medium() {
        let p = pipeline(ArtifactSet::default(), FallbackTable::default());
        let result = p.verify(&request("123456789"));
        assert_eq!(result.probability, 0.50);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.status, VerificationStatus::Verified);
        assert_eq!(result.confidence, 0.50);
    }

    #[test]
    fn absent_classifier_uses_fallback_entry() {
        let mut entries = HashMap::new();
        entries.insert("DOC-9".to_string(), 0.9);
        let p = pipeline(ArtifactSet::default(), FallbackTable::from_entries(entries));
        let result = p.verify(&request("DOC-9"));
        assert_eq!(result.probability, 0.9);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.status, VerificationStatus::Flagged);
    }

    #[test]
    fn failing_classifier_degrades_to_fallback() {
        let mut entries = HashMap::new();
        entries.insert("DOC-1".to_string(), 0.1);
        let artifacts = ArtifactSet {
            classifier: Some(Arc::new(FailingClassifier)),
            ..Default::default()
        };
        let p = pipeline(artifacts, FallbackTable::from_entries(entries));
        let result = p.verify(&request("DOC-1"));
        assert_eq!(result.probability, 0.1);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn malformed_classifier_output_degrades_to_fallback() {
        let artifacts = ArtifactSet {
            classifier: Some(Arc::new(FixedClassifier(vec![]))),
            ..Default::default()
        };
        let p = pipeline(artifacts, FallbackTable::default());
        assert_eq!(p.verify(&request("x")).probability, 0.50);
    }

    #[test]
    fn out_of_range_probability_is_clamped() {
        let artifacts = ArtifactSet {
            classifier: Some(Arc::new(FixedClassifier(vec![-0.5, 1.5]))),
            ..Default::default()
        };
        let p = pipeline(artifacts, FallbackTable::default());
        let result = p.verify(&request("x"));
        assert_eq!(result.probability, 1.0);
        assert_eq!(result.risk_level, RiskLevel::High);

        let artifacts = ArtifactSet {
            classifier: Some(Arc::new(FixedClassifier(vec![-2.0]))),
            ..Default::default()
        };
        let p = pipeline(artifacts, FallbackTable::default());
        assert_eq!(p.verify(&request("x")).probability, 0.0);
    }

    #[test]
    fn failing_stage_carries_prestage_vector_forward() {
        let artifacts = ArtifactSet {
            selector: Some(Arc::new(FailingStage)),
            scaler: Some(Arc::new(FailingStage)),
            classifier: Some(Arc::new(AritySpy)),
            ..Default::default()
        };
        let p = pipeline(artifacts, FallbackTable::default());
        // Both stages fail, so the spy sees the raw 12-feature vector.
        assert_eq!(p.verify(&request("x")).probability, 0.12);
    }

    #[test]
    fn selector_output_feeds_scaler() {
        let artifacts = ArtifactSet {
            selector: Some(Arc::new(HalvingStage)),
            scaler: Some(Arc::new(HalvingStage)),
            classifier: Some(Arc::new(AritySpy)),
            ..Default::default()
        };
        let p = pipeline(artifacts, FallbackTable::default());
        // 12 -> 6 -> 3 features.
        assert_eq!(p.verify(&request("x")).probability, 0.03);
    }

    #[test]
    fn absent_stages_pass_vector_through() {
        let artifacts = ArtifactSet {
            classifier: Some(Arc::new(AritySpy)),
            ..Default::default()
        };
        let p = pipeline(artifacts, FallbackTable::default());
        assert_eq!(p.verify(&request("x")).probability, 0.12);
    }

    #[test]
    fn identical_input_scores_identically() {
        let mut entries = HashMap::new();
        entries.insert("DOC-2".to_string(), 0.42);
        let p = pipeline(ArtifactSet::default(), FallbackTable::from_entries(entries));
        let req = request("DOC-2");
        assert_eq!(p.score(&req), p.score(&req));
    }
}
