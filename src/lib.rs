//! KYC Verification API Library
//!
//! This library provides the core functionality for the KYC fraud-scoring
//! API: deterministic feature extraction, the optional transform and
//! classification artifacts, the fallback probability table, the scoring
//! pipeline with its degradation policy, the append-only audit trail, and
//! the HTTP handlers.
//!
//! # Modules
//!
//! - `api`: API-layer namespace.
//! - `core`: Domain-layer namespace.
//! - `artifacts`: Optional scoring capabilities and their loader.
//! - `audit`: Single-writer append-only audit log.
//! - `config`: Configuration management.
//! - `errors`: Error handling types for the HTTP surface.
//! - `fallback`: Document-keyed fallback probability table.
//! - `features`: Feature extraction.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `scoring`: The scoring pipeline and risk bucketing.

pub mod api;
pub mod core;

// Re-export primary modules for shared use in tests and other binaries
pub mod artifacts;
pub mod audit;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod features;
pub mod handlers;
pub mod models;
pub mod scoring;
