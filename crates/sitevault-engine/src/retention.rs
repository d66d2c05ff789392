//! Retention management for SiteVault
//!
//! Applies the retention window to the backup storage directory: every
//! regular file whose age meets or exceeds the configured number of days
//! is deleted, regardless of whether it is an archive, a dump, or the
//! run log that shares the directory. Non-file entries are left
//! untouched, and a failed deletion never aborts the scan — failures are
//! collected per file and surfaced in the run report.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, instrument, warn};

use sitevault_core::{FailedDeletion, Result};

const SECONDS_PER_DAY: u64 = 86_400;

/// Outcome of one retention pass
#[derive(Debug, Clone, Default)]
pub struct PruneOutcome {
    /// Files successfully deleted
    pub deleted: Vec<std::path::PathBuf>,
    /// Files matching the threshold that could not be deleted
    pub failed: Vec<FailedDeletion>,
}

/// Delete every regular file in `directory` whose age relative to `now`
/// is at least `max_age_days` days. Idempotent: a second pass with no new
/// files deletes nothing.
#[instrument(level = "debug", skip_all, fields(directory = %directory.display(), max_age_days))]
pub fn prune(directory: &Path, max_age_days: u64, now: SystemTime) -> Result<PruneOutcome> {
    info!(
        "🗑 Pruning backups older than {} days in {:?}",
        max_age_days, directory
    );

    let threshold = Duration::from_secs(max_age_days * SECONDS_PER_DAY);
    let mut outcome = PruneOutcome::default();

    for entry in fs::read_dir(directory)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("⚠️ Skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        // file_type() does not follow symlinks: a symlink into the
        // directory is not a regular file and stays untouched.
        match entry.file_type() {
            Ok(file_type) if file_type.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                warn!("⚠️ Could not read type of {:?}: {}", path, e);
                continue;
            }
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!("⚠️ Could not read mtime of {:?}: {}", path, e);
                continue;
            }
        };

        // Files with an mtime in the future have a zero age.
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age < threshold {
            debug!("⏳ Keeping {:?} (age {:?})", path, age);
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!("🗑 Removed old backup {:?}", path);
                outcome.deleted.push(path);
            }
            Err(e) => {
                warn!("⚠️ Failed to remove {:?}: {}", path, e);
                outcome.failed.push(FailedDeletion {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "✅ Retention pass removed {} files ({} failures)",
        outcome.deleted.len(),
        outcome.failed.len()
    );
    Ok(outcome)
}

/// A backup artifact visible to the presentation surface
#[derive(Debug, Clone)]
pub struct BackupFileInfo {
    /// File name within the storage directory
    pub name: String,
    /// Last modification time
    pub modified: SystemTime,
    /// File size in bytes
    pub size: u64,
}

/// List the backup artifacts (`.gz` files) in `storage_dir`, oldest
/// first. Bookkeeping files such as the run log and the lock file are
/// not artifacts and are excluded.
pub fn list_backup_files(storage_dir: &Path) -> Result<Vec<BackupFileInfo>> {
    let mut backups = Vec::new();

    for entry in fs::read_dir(storage_dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().is_some_and(|ext| ext == "gz") {
            let metadata = entry.metadata()?;
            backups.push(BackupFileInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                modified: metadata.modified()?,
                size: metadata.len(),
            });
        }
    }

    backups.sort_by_key(|f| f.modified);
    Ok(backups)
}
