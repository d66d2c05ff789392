//! Storage-directory helpers for SiteVault
//!
//! Owns everything about the backup storage directory that is not an
//! artifact: lazy creation with 0755 permissions, the lock file guarding
//! against concurrent pipeline runs, and the append-only run log that
//! makes best-effort failures diagnosable.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use sitevault_core::{Error, Result, RunReport};

/// Lock file name guarding a storage directory against concurrent runs
pub const LOCK_FILE: &str = ".sitevault.lock";

/// Append-only run log within the storage directory.
///
/// The retention window applies uniformly to every regular file in the
/// storage directory, this log included: after a gap longer than the
/// window, the first new run prunes the stale log and starts a fresh
/// one. Diagnostics older than the artifacts they describe are not
/// kept around.
pub const RUN_LOG_FILE: &str = "backup-runs.jsonl";

/// Create the storage directory if needed (recursively, 0755 on unix)
pub fn ensure_storage_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        info!("📂 Creating backup storage directory at {:?}", path);
        fs::create_dir_all(path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
        }
    } else if !path.is_dir() {
        return Err(Error::InvalidPath(path.to_path_buf()));
    }

    Ok(())
}

/// Mutual-exclusion guard for one pipeline run.
///
/// Backed by a `create_new` lock file in the storage directory, so a
/// manual run and the scheduled run can never race on the same dated
/// artifact names. Released on drop.
#[derive(Debug)]
pub struct RunGuard {
    path: PathBuf,
}

impl RunGuard {
    /// Acquire the lock for `storage_dir`, failing with [`Error::Busy`]
    /// if another run already holds it.
    pub fn acquire(storage_dir: &Path) -> Result<Self> {
        let path = storage_dir.join(LOCK_FILE);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => {
                debug!("🔒 Acquired run lock {:?}", path);
                Ok(Self { path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(Error::Busy(storage_dir.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("⚠️ Failed to release run lock {:?}: {}", self.path, e);
        } else {
            debug!("🔓 Released run lock {:?}", self.path);
        }
    }
}

/// Append one run report as a JSON line to the storage directory's run log
pub fn append_run_report(storage_dir: &Path, report: &RunReport) -> Result<()> {
    let line = serde_json::to_string(report)?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(storage_dir.join(RUN_LOG_FILE))?;
    writeln!(file, "{}", line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sitevault_core::StageOutcome;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_storage_dir_creates_recursively() {
        let dir = tempdir().unwrap();
        let storage = dir.path().join("nested/backups");

        assert!(ensure_storage_dir(&storage).is_ok());
        assert!(storage.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&storage).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_ensure_storage_dir_rejects_file() {
        let dir = tempdir().unwrap();
        let not_a_dir = dir.path().join("backups");
        fs::write(&not_a_dir, b"oops").unwrap();

        assert!(matches!(
            ensure_storage_dir(&not_a_dir),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_run_guard_is_exclusive_until_dropped() {
        let dir = tempdir().unwrap();

        let guard = RunGuard::acquire(dir.path()).unwrap();
        assert!(matches!(
            RunGuard::acquire(dir.path()),
            Err(Error::Busy(_))
        ));

        drop(guard);
        assert!(RunGuard::acquire(dir.path()).is_ok());
    }

    #[test]
    fn test_append_run_report_accumulates_lines() {
        let dir = tempdir().unwrap();
        let report = RunReport {
            started_at: Utc::now(),
            date: "2025-01-01".to_string(),
            archive: StageOutcome::ok("2 files"),
            dump: StageOutcome::ok("1 table"),
            prune: StageOutcome::ok("0 deleted"),
            failed_deletions: Vec::new(),
        };

        append_run_report(dir.path(), &report).unwrap();
        append_run_report(dir.path(), &report).unwrap();

        let log = fs::read_to_string(dir.path().join(RUN_LOG_FILE)).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: RunReport = serde_json::from_str(line).unwrap();
            assert!(parsed.is_success());
        }
    }
}
