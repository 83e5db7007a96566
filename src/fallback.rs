//! Secondary scoring source: a precomputed document-number → probability
//! table, consulted when the classifier is unavailable or fails.
//!
//! The table is produced offline by the graph-model stage and exported as a
//! two-column CSV. It is loaded once at startup, shared read-only, and
//! replaced only by a process restart.

use std::collections::HashMap;
use std::path::Path;

/// Neutral probability returned when the table cannot answer.
pub const NEUTRAL_PROBABILITY: f64 = 0.50;

/// Expected CSV header of the fallback export.
const FALLBACK_HEADER: &str = "Document_Number,GNN_Fraud_Probability";

/// Exact-match lookup table from document number to fraud probability.
///
/// Lookups never fail: an empty table or a missing key resolves to the
/// neutral default. Matching is verbatim on the string form of the document
/// number; no trimming, case folding or fuzzy matching.
#[derive(Debug, Clone, Default)]
pub struct FallbackTable {
    entries: HashMap<String, f64>,
}

impl FallbackTable {
    /// Build a table from known entries. Used by tests and reload tooling.
    pub fn from_entries(entries: HashMap<String, f64>) -> Self {
        Self { entries }
    }

    /// Load the table from the fallback CSV.
    ///
    /// A missing file is created empty (header only) so the next offline
    /// export has somewhere to land; an empty or unreadable file yields an
    /// empty table. Rows that do not parse are skipped with a warning.
    /// None of these conditions is an error: an empty table is a valid
    /// startup state.
    pub async fn load(path: &Path) -> Self {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Fallback CSV {} missing, creating empty", path.display());
                if let Err(e) =
                    tokio::fs::write(path, format!("{}\n", FALLBACK_HEADER)).await
                {
                    tracing::error!("Could not create fallback CSV {}: {}", path.display(), e);
                }
                return Self::default();
            }
            Err(e) => {
                tracing::error!("Failed to read fallback CSV {}: {}", path.display(), e);
                return Self::default();
            }
        };

        let mut entries = HashMap::new();
        for (lineno, line) in content.lines().enumerate() {
            if lineno == 0 || line.trim().is_empty() {
                continue; // header
            }
            let Some((doc, prob)) = line.split_once(',') else {
                tracing::warn!("Fallback CSV line {} malformed, skipping", lineno + 1);
                continue;
            };
            match prob.trim().parse::<f64>() {
                Ok(p) => {
                    entries.insert(doc.to_string(), p);
                }
                Err(_) => {
                    tracing::warn!("Fallback CSV line {} has bad probability, skipping", lineno + 1);
                }
            }
        }

        if entries.is_empty() {
            tracing::warn!("Fallback table is empty");
        } else {
            tracing::info!("Loaded fallback table with {} entries", entries.len());
        }
        Self { entries }
    }

    /// Probability for a document number, or the neutral default.
    pub fn lookup(&self, document_number: &str) -> f64 {
        match self.entries.get(document_number) {
            Some(&p) => p,
            None => NEUTRAL_PROBABILITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
