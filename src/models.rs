use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============ Domain Models ============

/// Accepted identity document types.
///
/// Unknown strings deserialize to `Other`, which contributes nothing to the
/// document-type one-hot features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    Passport,
    Aadhar,
    Pan,
    Utility,
    #[serde(other)]
    Other,
}

impl DocumentType {
    /// Canonical uppercase name, as logged in the audit trail.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Passport => "PASSPORT",
            DocumentType::Aadhar => "AADHAR",
            DocumentType::Pan => "PAN",
            DocumentType::Utility => "UTILITY",
            DocumentType::Other => "OTHER",
        }
    }
}

/// A single identity-verification request.
///
/// Immutable once received; all scoring features derive from these four
/// fields and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Full name as submitted.
    pub name: String,
    /// Document number, matched verbatim against the fallback table.
    #[serde(rename = "documentNumber")]
    pub document_number: String,
    /// Free-form address. Optional in the payload, empty string when absent.
    #[serde(default)]
    pub address: String,
    /// Type of the identity document.
    #[serde(rename = "documentType")]
    pub document_type: DocumentType,
}

/// Discrete fraud-risk bucket derived from a continuous probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verification outcome reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Verified,
    Flagged,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Verified => f.write_str("Verified"),
            VerificationStatus::Flagged => f.write_str("Flagged"),
        }
    }
}

/// Result of one pass through the scoring pipeline.
///
/// `probability` and `confidence` are fractions in [0, 1]; the HTTP layer
/// converts them to percentages for the response payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringResult {
    /// Fraud probability in [0, 1].
    pub probability: f64,
    /// Risk bucket for `probability`.
    pub risk_level: RiskLevel,
    /// `1.0 - probability`.
    pub confidence: f64,
    /// `Flagged` iff `risk_level` is `High`.
    pub status: VerificationStatus,
}

/// One audit-trail row, appended per completed verification.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub document_type: DocumentType,
    pub document_number: String,
    pub risk_level: RiskLevel,
    /// Fraud probability as a percentage (0-100), matching the legacy log.
    pub probability_pct: f64,
}

// ============ API Response Models ============

/// Nested verification details in the response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationDetails {
    #[serde(rename = "documentAuthenticity")]
    pub document_authenticity: String,
    #[serde(rename = "addressVerification")]
    pub address_verification: String,
    #[serde(rename = "anomalyScore")]
    pub anomaly_score: String,
}

/// Response payload for a single verification.
///
/// Probability and confidence are expressed as percentages (0-100) to stay
/// wire-compatible with the previous backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub status: VerificationStatus,
    pub id: String,
    pub timestamp: String,
    pub name: String,
    #[serde(rename = "documentNumber")]
    pub document_number: String,
    #[serde(rename = "fraudProbability")]
    pub fraud_probability: f64,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub details: VerificationDetails,
    pub message: String,
}

// ============ Batch Models ============

/// Request payload for batch verification.
///
/// Rows are raw JSON values so that one malformed row fails that row only,
/// mirroring how the legacy file-upload path reported per-row errors.
#[derive(Debug, Deserialize)]
pub struct BatchVerificationRequest {
    pub requests: Vec<serde_json::Value>,
}

/// Outcome of one batch row.
#[derive(Debug, Serialize)]
pub struct BatchResultItem {
    /// Zero-based index of the row in the submitted batch.
    pub row: usize,
    /// Correlation id, unique per row even within the same millisecond.
    #[serde(rename = "correlationId")]
    pub correlation_id: Uuid,
    #[serde(flatten)]
    pub result: Option<VerificationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response payload for batch verification.
#[derive(Debug, Serialize)]
pub struct BatchVerificationResponse {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchResultItem>,
}
