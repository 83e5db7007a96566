//! Append-only audit trail of scoring decisions.
//!
//! All appends funnel through a single writer task fed by a bounded channel,
//! so concurrent requests can never interleave or tear a row. Recording is
//! best-effort by contract: a full queue or a failed write is logged and the
//! request proceeds unaffected.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::models::AuditRecord;

/// CSV header written once when the log file is first created.
const AUDIT_HEADER: &str = "Timestamp,Name,ID_Type,Document_Number,Fraud_Risk,Fraud_Probability";

/// Queue depth between request handlers and the writer task.
const QUEUE_CAPACITY: usize = 1024;

/// Cloneable handle to the audit writer.
#[derive(Clone)]
pub struct AuditSink {
    tx: Option<mpsc::Sender<AuditRecord>>,
}

impl AuditSink {
    /// Spawn the writer task appending to `path` and return a handle to it.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(writer_task(path, rx));
        Self { tx: Some(tx) }
    }

    /// A sink that drops every record. For tests and offline tooling.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Enqueue a record for appending.
    ///
    /// Never blocks and never fails the caller: an unavailable or saturated
    /// writer drops the record with a warning.
    pub fn record(&self, record: AuditRecord) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(record) {
            tracing::warn!("Could not enqueue audit record: {}", e);
        }
    }
}

/// Serialize one record as a CSV row.
fn format_row(record: &AuditRecord) -> String {
    format!(
        "{},{},{},{},{},{}\n",
        csv_field(&record.timestamp.to_rfc3339()),
        csv_field(&record.name),
        record.document_type.as_str(),
        csv_field(&record.document_number),
        record.risk_level,
        record.probability_pct,
    )
}

/// Quote a field if it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// The single writer: opens the log in append mode, writes the header when
/// the file is new, then drains the channel one record at a time.
async fn writer_task(path: PathBuf, mut rx: mpsc::Receiver<AuditRecord>) {
    let is_new = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta.len() == 0,
        Err(_) => true,
    };

    let mut file = match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) => {
            tracing::error!("Could not open audit log {}: {}", path.display(), e);
            // Keep draining so senders see a live channel; records are lost
            // but requests stay unaffected.
            while rx.recv().await.is_some() {}
            return;
        }
    };

    if is_new {
        if let Err(e) = file.write_all(format!("{}\n", AUDIT_HEADER).as_bytes()).await {
            tracing::error!("Could not write audit header: {}", e);
        }
    }
    tracing::info!("Audit log ready at {}", path.display());

    while let Some(record) = rx.recv().await {
        let row = format_row(&record);
        if let Err(e) = file.write_all(row.as_bytes()).await {
            tracing::warn!("Could not write audit record: {}", e);
            continue;
        }
        // Flush per record: a crash loses at most the in-flight row.
        if let Err(e) = file.flush().await {
            tracing::warn!("Could not flush audit log: {}", e);
        }
    }
}
