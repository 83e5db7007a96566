use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::artifacts::ArtifactSet;
use crate::errors::AppError;
use crate::fallback::FallbackTable;
use crate::models::*;
use crate::scoring::ScoringPipeline;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// The scoring pipeline, cheap to clone per request.
    pub pipeline: ScoringPipeline,
    /// Loaded artifact slots, for the status endpoint.
    pub artifacts: Arc<ArtifactSet>,
    /// Fallback lookup table, for the status endpoint.
    pub fallback: Arc<FallbackTable>,
}

/// Health check endpoint.
///
/// Returns the service status and version. Kept outside rate limiting so
/// platform probes always get through.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "kyc-verify-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /
///
/// Service status: which scoring artifacts are loaded and whether the
/// fallback table has rows.
pub async fn home(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "KYC API running",
        "model": if state.artifacts.classifier.is_some() { "Loaded" } else { "Not Loaded" },
        "scaler": if state.artifacts.scaler.is_some() { "Loaded" } else { "Not Loaded" },
        "selector": if state.artifacts.selector.is_some() { "Loaded" } else { "Not Loaded" },
        "fallback_table": if state.fallback.is_empty() { "Empty" } else { "Available" },
    }))
}

/// POST /api/v1/verify
///
/// Scores one verification request. The pipeline always produces a result,
/// so this handler is infallible once the payload has deserialized.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerificationRequest>,
) -> Json<VerificationResponse> {
    tracing::info!(
        document_type = request.document_type.as_str(),
        "POST /verify"
    );
    let result = state.pipeline.verify(&request);
    Json(build_response(&request, result))
}

/// POST /api/v1/verify/batch
///
/// Scores a batch of requests row by row. A malformed row fails only that
/// row; valid rows still score.
pub async fn verify_batch(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<BatchVerificationRequest>,
) -> Result<Json<BatchVerificationResponse>, AppError> {
    if batch.requests.is_empty() {
        return Err(AppError::BadRequest("Batch contains no rows".to_string()));
    }
    tracing::info!(rows = batch.requests.len(), "POST /verify/batch");

    let mut results = Vec::with_capacity(batch.requests.len());
    let mut successful = 0;
    for (row, value) in batch.requests.into_iter().enumerate() {
        let item = match serde_json::from_value::<VerificationRequest>(value) {
            Ok(request) => {
                let result = state.pipeline.verify(&request);
                successful += 1;
                BatchResultItem {
                    row,
                    correlation_id: Uuid::new_v4(),
                    result: Some(build_response(&request, result)),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!("Batch row {} malformed: {}", row, e);
                BatchResultItem {
                    row,
                    correlation_id: Uuid::new_v4(),
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        };
        results.push(item);
    }

    let total = results.len();
    Ok(Json(BatchVerificationResponse {
        total,
        successful,
        failed: total - successful,
        results,
    }))
}

/// Assemble the wire response for one scored request.
///
/// Probability and confidence go out as percentages for compatibility with
/// the previous backend's consumers.
fn build_response(request: &VerificationRequest, result: ScoringResult) -> VerificationResponse {
    let now = Utc::now();
    let probability_pct = result.probability * 100.0;
    VerificationResponse {
        status: result.status,
        id: format!("VER{}", now.timestamp_millis()),
        timestamp: now.to_rfc3339(),
        name: request.name.clone(),
        document_number: request.document_number.clone(),
        fraud_probability: probability_pct,
        risk_level: result.risk_level,
        confidence: result.confidence * 100.0,
        details: VerificationDetails {
            document_authenticity: "Valid".to_string(),
            address_verification: if request.address.len() > 10 {
                "Verified".to_string()
            } else {
                "Pending".to_string()
            },
            anomaly_score: format!("{:.2}", probability_pct),
        },
        message: "KYC processed successfully.".to_string(),
    }
}
