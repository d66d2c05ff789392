//! Configuration module for SiteVault
//!
//! Defines the configuration structure driving every backup run. The
//! binary loads it from a TOML file plus `SITEVAULT_*` environment
//! variables; defaults mirror the fixed constants of the original
//! deployment (7-day retention, daily at midnight).

use std::path::PathBuf;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{Error, Result};

/// Default retention window in days
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// Default time-of-day anchor for the daily trigger
pub const DEFAULT_ANCHOR_TIME: &str = "00:00";

/// Default trigger name for the daily backup registration
pub const DEFAULT_TRIGGER_NAME: &str = "daily-backup";

/// Backup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Whether backups are enabled
    pub enabled: bool,
    /// Root of the file tree to snapshot
    pub site_root: PathBuf,
    /// Directory holding all backup artifacts
    pub storage_dir: PathBuf,
    /// Path of the SQLite database to dump
    pub database_path: PathBuf,
    /// Maximum artifact age in days before deletion
    pub retention_days: u64,
    /// Compression level for the file archive (0-9)
    pub compression_level: u32,
    /// Time of day the daily trigger fires, `HH:MM`
    pub anchor_time: String,
    /// Name of the daily trigger registration
    pub trigger_name: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            site_root: PathBuf::from("."),
            storage_dir: PathBuf::from("backups"),
            database_path: PathBuf::from("site.db"),
            retention_days: DEFAULT_RETENTION_DAYS,
            compression_level: 6,
            anchor_time: DEFAULT_ANCHOR_TIME.to_string(),
            trigger_name: DEFAULT_TRIGGER_NAME.to_string(),
        }
    }
}

impl BackupConfig {
    /// Validates the configuration
    #[instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Result<()> {
        debug!("🔧 Validating backup configuration");

        if self.retention_days == 0 {
            return Err(Error::config("Retention window must be at least 1 day"));
        }

        if self.compression_level > 9 {
            return Err(Error::config(format!(
                "Compression level must be 0-9, got {}",
                self.compression_level
            )));
        }

        if self.trigger_name.is_empty() {
            return Err(Error::config("Trigger name cannot be empty"));
        }

        self.anchor()?;

        debug!("✅ Backup configuration is valid");
        Ok(())
    }

    /// Parse the configured anchor time-of-day
    pub fn anchor(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.anchor_time, "%H:%M").map_err(|e| {
            Error::config(format!(
                "Invalid anchor time {:?} (expected HH:MM): {}",
                self.anchor_time, e
            ))
        })
    }
}
