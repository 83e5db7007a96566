use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Runtime configuration, sourced from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Directory holding the exported scoring artifacts.
    pub model_dir: PathBuf,
    /// Fallback probability table (CSV export of the graph model).
    pub fallback_csv: PathBuf,
    /// Append-only audit log.
    pub audit_log: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            model_dir: std::env::var("MODEL_DIR")
                .unwrap_or_else(|_| "model".to_string())
                .into(),
            fallback_csv: std::env::var("FALLBACK_CSV")
                .unwrap_or_else(|_| "gnn_output.csv".to_string())
                .and_not_empty("FALLBACK_CSV")?,
            audit_log: std::env::var("AUDIT_LOG")
                .unwrap_or_else(|_| "kyc_audit_log.csv".to_string())
                .and_not_empty("AUDIT_LOG")?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Model directory: {}", config.model_dir.display());
        tracing::debug!("Fallback CSV: {}", config.fallback_csv.display());
        tracing::debug!("Audit log: {}", config.audit_log.display());
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn selector_path(&self) -> PathBuf {
        self.model_dir.join("feature_selector.json")
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join("scaler.json")
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.model_dir.join("best_model.json")
    }
}

trait NonEmptyPath {
    fn and_not_empty(self, var: &str) -> anyhow::Result<PathBuf>;
}

impl NonEmptyPath for String {
    fn and_not_empty(self, var: &str) -> anyhow::Result<PathBuf> {
        if self.trim().is_empty() {
            anyhow::bail!("{} cannot be empty", var);
        }
        Ok(Path::new(&self).to_path_buf())
    }
}
