//! Feature extraction for fraud-risk scoring.
//!
//! Derives the fixed 12-feature vector the scoring artifacts were trained
//! against. The order and length here are a contract with those artifacts:
//! any change invalidates every trained selector, scaler and classifier.

use std::collections::HashSet;

use crate::models::{DocumentType, VerificationRequest};

/// Number of features produced per request.
pub const FEATURE_COUNT: usize = 12;

/// Extracts the model input vector from a verification request.
///
/// Pure and total: the same request always yields the same vector, and no
/// input (empty strings, unicode, anything) makes it fail.
#[derive(Clone)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the 12-element feature vector.
    ///
    /// Lengths are counted in characters, not bytes, so multibyte input
    /// scores the same as its visual length suggests.
    pub fn extract(&self, req: &VerificationRequest) -> Vec<f64> {
        let mut features = Vec::with_capacity(FEATURE_COUNT);

        features.push(req.name.chars().count() as f64);
        features.push(req.document_number.chars().count() as f64);
        features.push(req.address.chars().count() as f64);

        let all_digits =
            !req.document_number.is_empty() && req.document_number.chars().all(|c| c.is_ascii_digit());
        features.push(if all_digits { 1.0 } else { 0.0 });

        let distinct: HashSet<char> = req.document_number.chars().collect();
        features.push(distinct.len() as f64);

        // One-hot over the known document types. OTHER stays all zero, and
        // PASSPORT and UTILITY deliberately share a slot: the training data
        // never distinguished them.
        features.push(if req.document_type == DocumentType::Aadhar { 1.0 } else { 0.0 });
        features.push(if req.document_type == DocumentType::Pan { 1.0 } else { 0.0 });
        features.push(
            if matches!(req.document_type, DocumentType::Passport | DocumentType::Utility) {
                1.0
            } else {
                0.0
            },
        );

        features.push(req.address.split_whitespace().count() as f64);
        features.push(req.name.split_whitespace().count() as f64);
        features.push(if req.name.chars().any(|c| c.is_uppercase()) { 1.0 } else { 0.0 });
        features.push(if req.name.chars().any(|c| c.is_ascii_digit()) { 1.0 } else { 0.0 });

        features
    }

    /// Number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Feature names, in extraction order.
    pub fn feature_names(&self) -> Vec<&'static str> {
        vec![
            "name_len",
            "doc_len",
            "address_len",
            "doc_all_digits",
            "doc_distinct_chars",
            "type_aadhar",
            "type_pan",
            "type_passport_or_utility",
            "address_words",
            "name_words",
            "name_has_upper",
            "name_has_digit",
        ]
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
