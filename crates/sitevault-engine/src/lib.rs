//! SiteVault Backup Engine
//!
//! Provides the full-site backup pipeline for SiteVault, including:
//! - File-tree archival (tar.gz snapshot of the site root)
//! - Database dumps (compressed SQL statements)
//! - Age-based retention of stored artifacts
//! - Daily trigger scheduling
//!
//! The pipeline runs its three stages strictly in order — archive, dump,
//! prune — and is deliberately best-effort: a failed stage is logged and
//! recorded in the run report, and the remaining stages still run. A lock
//! file per storage directory prevents two pipelines from racing on the
//! same dated artifact names.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use tracing::{error, info, instrument, warn};

pub mod archiver;
pub mod database;
pub mod retention;
pub mod scheduler;
pub mod storage;

pub use sitevault_core::{BackupConfig, Error, HostHooks, Result, RunReport, StageOutcome};

use database::SqliteSource;
use scheduler::BackupScheduler;
use storage::RunGuard;

/// The backup pipeline orchestrator.
///
/// Constructed once at process start with an explicit configuration;
/// every invocation of [`BackupEngine::run_once`] is one `BackupRun`
/// producing the two dated artifacts and applying retention.
#[derive(Debug)]
pub struct BackupEngine {
    config: BackupConfig,
}

impl BackupEngine {
    /// Create a new engine from a validated configuration
    pub fn new(config: BackupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine's configuration
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Destination of the file archive for a given date stamp
    pub fn archive_path(&self, date: &str) -> PathBuf {
        self.config.storage_dir.join(format!("files_{}.tar.gz", date))
    }

    /// Destination of the database dump for a given date stamp
    pub fn dump_path(&self, date: &str) -> PathBuf {
        self.config.storage_dir.join(format!("database_{}.sql.gz", date))
    }

    /// Run one backup pipeline pass: archive, dump, prune.
    ///
    /// Stages run in that fixed order and never short-circuit each other;
    /// each stage's failure is captured into the returned [`RunReport`]
    /// and logged at the stage boundary. Artifacts of a same-day rerun
    /// overwrite the earlier ones by filename collision.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<RunReport> {
        if !self.config.enabled {
            info!("🔕 Backups are disabled in configuration");
            return Err(Error::config("Backups are disabled"));
        }

        storage::ensure_storage_dir(&self.config.storage_dir)?;
        let _guard = RunGuard::acquire(&self.config.storage_dir)?;

        let started_at = Utc::now();
        let date = Local::now().format("%Y-%m-%d").to_string();
        info!("💾 Starting backup run {}", date);

        let archive = match archiver::archive(
            &self.config.site_root,
            &self.archive_path(&date),
            self.config.compression_level,
        ) {
            Ok(stats) => StageOutcome::ok(format!(
                "{} files archived, {} skipped",
                stats.files, stats.skipped
            )),
            Err(e) => {
                error!("❌ Archive stage failed: {}", e);
                StageOutcome::failed(e)
            }
        };

        let dump = match SqliteSource::open(&self.config.database_path)
            .and_then(|source| database::dump(&source, &self.dump_path(&date)))
        {
            Ok(stats) => StageOutcome::ok(format!(
                "{} tables, {} rows dumped",
                stats.tables, stats.rows
            )),
            Err(e) => {
                error!("❌ Dump stage failed: {}", e);
                StageOutcome::failed(e)
            }
        };

        let (prune, failed_deletions) = match retention::prune(
            &self.config.storage_dir,
            self.config.retention_days,
            SystemTime::now(),
        ) {
            Ok(outcome) => (
                StageOutcome::ok(format!(
                    "{} files deleted, {} failures",
                    outcome.deleted.len(),
                    outcome.failed.len()
                )),
                outcome.failed,
            ),
            Err(e) => {
                error!("❌ Retention stage failed: {}", e);
                (StageOutcome::failed(e), Vec::new())
            }
        };

        let report = RunReport {
            started_at,
            date,
            archive,
            dump,
            prune,
            failed_deletions,
        };

        if let Err(e) = storage::append_run_report(&self.config.storage_dir, &report) {
            warn!("⚠️ Failed to append run report: {}", e);
        }

        if report.is_success() {
            info!("✅ Backup run completed successfully");
        } else {
            warn!("⚠️ Backup run completed with failures");
        }
        Ok(report)
    }
}

/// The engine plus its scheduler, wired up as the explicit interface the
/// hosting process calls into.
#[derive(Debug)]
pub struct BackupService {
    engine: Arc<BackupEngine>,
    scheduler: BackupScheduler,
}

impl BackupService {
    /// Build the service from a configuration
    pub fn new(config: BackupConfig) -> Result<Self> {
        let engine = Arc::new(BackupEngine::new(config)?);
        let scheduler = BackupScheduler::new(Arc::clone(&engine));
        Ok(Self { engine, scheduler })
    }

    /// The underlying pipeline orchestrator
    pub fn engine(&self) -> &Arc<BackupEngine> {
        &self.engine
    }

    /// The trigger registry
    pub fn scheduler(&self) -> &BackupScheduler {
        &self.scheduler
    }
}

#[async_trait]
impl HostHooks for BackupService {
    async fn on_activate(&self) -> Result<()> {
        if !self.engine.config().enabled {
            info!("🔕 Backups are disabled; trigger not registered");
            return Ok(());
        }
        self.scheduler
            .ensure_scheduled(&self.engine.config().trigger_name)?;
        Ok(())
    }

    async fn on_deactivate(&self) -> Result<()> {
        self.scheduler.unschedule(&self.engine.config().trigger_name);
        Ok(())
    }

    async fn on_trigger(&self) -> Result<RunReport> {
        self.engine.run_once().await
    }

    fn render_status(&self) -> Result<String> {
        let storage_dir = &self.engine.config().storage_dir;
        if !storage_dir.is_dir() {
            return Ok("No backups found.".to_string());
        }

        let files = retention::list_backup_files(storage_dir)?;
        if files.is_empty() {
            return Ok("No backups found.".to_string());
        }

        let mut status = String::new();
        for file in files {
            let modified: DateTime<Local> = file.modified.into();
            status.push_str(&format!(
                "{} - {}\n",
                file.name,
                modified.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        Ok(status)
    }
}
