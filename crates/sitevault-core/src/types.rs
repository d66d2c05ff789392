//! Core types for SiteVault
//!
//! Defines the value, table and run-report types shared between the backup
//! engine and its consumers. These are the only types that cross the
//! boundary between the generic dumper and a concrete database driver.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single column value read from a table row.
///
/// The dumper renders values itself rather than relying on a driver's
/// generic string escape, so every variant carries enough type information
/// to produce a safe SQL literal.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Integer value
    Integer(i64),
    /// Floating point value
    Real(f64),
    /// Text value
    Text(String),
    /// Binary blob
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Render the value as a SQL literal safe for inclusion in an
    /// INSERT statement.
    ///
    /// Text is single-quoted with embedded quotes doubled; blobs are
    /// emitted as `X'..'` hex literals; NULL stays the bare keyword.
    /// Non-finite reals have no SQL spelling: infinities become the
    /// overflowing literal `9e999` and NaN becomes NULL, so a dump
    /// always replays.
    pub fn render(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Integer(v) => v.to_string(),
            SqlValue::Real(v) if v.is_nan() => "NULL".to_string(),
            SqlValue::Real(v) if v.is_infinite() => {
                if *v > 0.0 { "9e999" } else { "-9e999" }.to_string()
            }
            SqlValue::Real(v) => v.to_string(),
            SqlValue::Text(t) => format!("'{}'", t.replace('\'', "''")),
            SqlValue::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
                format!("X'{}'", hex)
            }
        }
    }
}

/// A table visible to the dumper: its name and the creation statement
/// exactly as reported by the database engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    /// Table name
    pub name: String,
    /// `CREATE TABLE ...` statement as reported by the engine
    pub create_statement: String,
}

/// Outcome of one pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StageOutcome {
    /// Stage completed
    Ok {
        /// Human-readable summary (counts, artifact path)
        detail: String,
    },
    /// Stage failed; later stages still ran
    Failed {
        /// Error text captured at the stage boundary
        error: String,
    },
}

impl StageOutcome {
    /// Build a successful outcome
    pub fn ok(detail: impl Into<String>) -> Self {
        Self::Ok { detail: detail.into() }
    }

    /// Build a failed outcome
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed { error: error.to_string() }
    }

    /// Whether the stage completed
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// A deletion the retention manager attempted but could not complete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDeletion {
    /// Path of the file that could not be removed
    pub path: PathBuf,
    /// Error text from the failed removal
    pub error: String,
}

/// Record of one pipeline run.
///
/// The pipeline is best-effort, so a run can partially fail without the
/// orchestrator returning an error; this report is what makes such runs
/// diagnosable. One report is appended per run to `backup-runs.jsonl` in
/// the backup storage directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Date stamp shared by both artifacts (`YYYY-MM-DD`)
    pub date: String,
    /// File archive stage outcome
    pub archive: StageOutcome,
    /// Database dump stage outcome
    pub dump: StageOutcome,
    /// Retention stage outcome
    pub prune: StageOutcome,
    /// Deletions the retention stage could not complete
    pub failed_deletions: Vec<FailedDeletion>,
}

impl RunReport {
    /// Whether every stage completed and every deletion succeeded
    pub fn is_success(&self) -> bool {
        self.archive.is_ok()
            && self.dump.is_ok()
            && self.prune.is_ok()
            && self.failed_deletions.is_empty()
    }
}
