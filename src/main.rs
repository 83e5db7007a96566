mod api;
mod artifacts;
mod audit;
mod config;
mod core;
mod errors;
mod fallback;
mod features;
mod handlers;
mod models;
mod scoring;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::artifacts::ArtifactSet;
use crate::audit::AuditSink;
use crate::config::Config;
use crate::fallback::FallbackTable;
use crate::scoring::ScoringPipeline;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the scoring artifacts, the fallback
/// table and the audit writer, then starts the Axum server. A missing
/// artifact or an empty fallback table is an expected startup state: the
/// pipeline degrades around whatever is absent.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kyc_verify_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Load artifact slots; each failure leaves its slot empty
    let artifacts = Arc::new(ArtifactSet::load(&config).await);

    // Load the fallback table; missing file is created empty
    let fallback = Arc::new(FallbackTable::load(&config.fallback_csv).await);

    // Spawn the single audit writer
    let audit = AuditSink::spawn(config.audit_log.clone());

    // Build application state
    let pipeline = ScoringPipeline::new(artifacts.clone(), fallback.clone(), audit);
    let app_state = Arc::new(handlers::AppState {
        pipeline,
        artifacts,
        fallback,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/", get(handlers::home))
        .route("/api/v1/verify", post(handlers::verify))
        .route("/api/v1/verify/batch", post(handlers::verify_batch))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload (prevents memory exhaustion)
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check bypassing rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
