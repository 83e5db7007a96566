/// Scenario tests for the scoring pipeline's degradation policy.
/// The pipeline must return a valid result no matter which artifact slots
/// are missing or broken.
use std::collections::HashMap;
use std::sync::Arc;

use kyc_verify_api::artifacts::{
    ArtifactError, ArtifactSet, Classifier, IndexSelector, LogisticModel, StandardScaler,
    TransformStage,
};
use kyc_verify_api::audit::AuditSink;
use kyc_verify_api::fallback::FallbackTable;
use kyc_verify_api::features::{FeatureExtractor, FEATURE_COUNT};
use kyc_verify_api::models::{
    DocumentType, RiskLevel, VerificationRequest, VerificationStatus,
};
use kyc_verify_api::scoring::ScoringPipeline;

fn john_doe() -> VerificationRequest {
    VerificationRequest {
        name: "John Doe".to_string(),
        document_number: "123456789".to_string(),
        address: "123 Main St".to_string(),
        document_type: DocumentType::Passport,
    }
}

fn pipeline(artifacts: ArtifactSet, fallback: FallbackTable) -> ScoringPipeline {
    ScoringPipeline::new(Arc::new(artifacts), Arc::new(fallback), AuditSink::disabled())
}

struct PanickyClassifier;

impl Classifier for PanickyClassifier {
    fn name(&self) -> &'static str {
        "panicky"
    }
    fn predict(&self, _input: &[f64]) -> Result<Vec<f64>, ArtifactError> {
        Err(ArtifactError::new("model file corrupted"))
    }
}

#[test]
fn john_doe_reference_vector() {
    let extractor = FeatureExtractor::new();
    let features = extractor.extract(&john_doe());
    assert_eq!(
        features,
        vec![8.0, 9.0, 11.0, 1.0, 8.0, 0.0, 0.0, 1.0, 3.0, 2.0, 1.0, 0.0]
    );
}

#[test]
fn bare_pipeline_returns_neutral_medium() {
    let p = pipeline(ArtifactSet::default(), FallbackTable::default());
    let result = p.verify(&john_doe());
    assert_eq!(result.probability, 0.50);
    assert_eq!(result.risk_level, RiskLevel::Medium);
    assert_eq!(result.status, VerificationStatus::Verified);
}

#[test]
fn erroring_classifier_still_produces_result() {
    let artifacts = ArtifactSet {
        classifier: Some(Arc::new(PanickyClassifier)),
        ..Default::default()
    };
    let p = pipeline(artifacts, FallbackTable::default());
    let result = p.verify(&john_doe());
    assert!(result.probability >= 0.0 && result.probability <= 1.0);
    assert_eq!(result.probability, 0.50);
}

#[test]
fn fallback_entry_is_bucketed() {
    let mut entries = HashMap::new();
    entries.insert("123456789".to_string(), 0.75);
    let p = pipeline(ArtifactSet::default(), FallbackTable::from_entries(entries));
    let result = p.verify(&john_doe());
    assert_eq!(result.probability, 0.75);
    assert_eq!(result.risk_level, RiskLevel::High);
    assert_eq!(result.status, VerificationStatus::Flagged);
}

#[test]
fn full_artifact_stack_scores_deterministically() {
    // A selector that keeps every feature, an identity-adjacent scaler and
    // a binary logistic model, all via the real JSON-backed artifact types.
    let selector = IndexSelector {
        n_features: FEATURE_COUNT,
        keep: (0..FEATURE_COUNT).collect(),
    };
    let scaler = StandardScaler {
        mean: vec![5.0; FEATURE_COUNT],
        scale: vec![3.0; FEATURE_COUNT],
    };
    let classifier = LogisticModel {
        coefficients: vec![vec![0.25; FEATURE_COUNT]],
        intercepts: vec![-0.5],
    };
    let artifacts = ArtifactSet {
        selector: Some(Arc::new(selector) as Arc<dyn TransformStage>),
        scaler: Some(Arc::new(scaler) as Arc<dyn TransformStage>),
        classifier: Some(Arc::new(classifier) as Arc<dyn Classifier>),
    };
    let p = pipeline(artifacts, FallbackTable::default());

    let first = p.score(&john_doe());
    let second = p.score(&john_doe());
    assert_eq!(first, second);
    assert!(first.probability >= 0.0 && first.probability <= 1.0);
    assert!((first.confidence - (1.0 - first.probability)).abs() < 1e-12);
}

#[test]
fn arity_mismatched_scaler_is_skipped_not_fatal() {
    // Selector halves the vector; the scaler still expects 12 features and
    // errors, so the classifier sees the selector's 6-feature output.
    let selector = IndexSelector {
        n_features: FEATURE_COUNT,
        keep: (0..6).collect(),
    };
    let scaler = StandardScaler {
        mean: vec![0.0; FEATURE_COUNT],
        scale: vec![1.0; FEATURE_COUNT],
    };
    let classifier = LogisticModel {
        coefficients: vec![vec![0.0; 6]],
        intercepts: vec![0.0],
    };
    let artifacts = ArtifactSet {
        selector: Some(Arc::new(selector) as Arc<dyn TransformStage>),
        scaler: Some(Arc::new(scaler) as Arc<dyn TransformStage>),
        classifier: Some(Arc::new(classifier) as Arc<dyn Classifier>),
    };
    let p = pipeline(artifacts, FallbackTable::default());
    let result = p.verify(&john_doe());
    // Zero weights and intercept: sigmoid(0) = 0.5 from the classifier, not
    // the fallback path.
    assert_eq!(result.probability, 0.5);
    assert_eq!(result.risk_level, RiskLevel::Medium);
}

#[test]
fn fallback_ignores_transformed_vector() {
    // With no classifier, the fallback is keyed on the raw document number
    // regardless of what the transform chain produced.
    let selector = IndexSelector {
        n_features: FEATURE_COUNT,
        keep: vec![0],
    };
    let mut entries = HashMap::new();
    entries.insert("123456789".to_string(), 0.2);
    let artifacts = ArtifactSet {
        selector: Some(Arc::new(selector) as Arc<dyn TransformStage>),
        ..Default::default()
    };
    let p = pipeline(artifacts, FallbackTable::from_entries(entries));
    assert_eq!(p.verify(&john_doe()).probability, 0.2);
}
