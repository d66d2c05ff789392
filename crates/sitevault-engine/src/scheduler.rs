//! Scheduled backup functionality for SiteVault
//!
//! Holds the named daily-trigger registrations. Registration is
//! idempotent: an existing trigger is left untouched, never rescheduled
//! or duplicated. Each trigger sleeps until the configured time-of-day
//! anchor, fires the backup pipeline, and repeats the next day.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, instrument};

use sitevault_core::{Error, Result};

use crate::BackupEngine;

/// Manages scheduled backup trigger registrations
#[derive(Debug)]
pub struct BackupScheduler {
    engine: Arc<BackupEngine>,
    triggers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl BackupScheduler {
    /// Create a new scheduler driving `engine`
    pub fn new(engine: Arc<BackupEngine>) -> Self {
        Self {
            engine,
            triggers: Mutex::new(HashMap::new()),
        }
    }

    /// Register the named daily trigger if it is not already registered.
    ///
    /// Returns `true` if a new registration was created, `false` if the
    /// trigger already existed (which is left untouched).
    #[instrument(level = "debug", skip(self))]
    pub fn ensure_scheduled(&self, name: &str) -> Result<bool> {
        let anchor = self.engine.config().anchor()?;
        let mut triggers = self
            .triggers
            .lock()
            .map_err(|_| Error::scheduling("Trigger registry poisoned"))?;

        if triggers.contains_key(name) {
            debug!("⏰ Trigger {} already registered, leaving it untouched", name);
            return Ok(false);
        }

        let engine = Arc::clone(&self.engine);
        let trigger = name.to_string();
        let handle = tokio::spawn(async move {
            loop {
                let wait = until_next_fire(Local::now(), anchor);
                debug!("⏳ Trigger {} sleeping for {:?}", trigger, wait);
                time::sleep(wait).await;

                info!("⏰ Trigger {} fired, running backup pipeline", trigger);
                if let Err(e) = engine.run_once().await {
                    error!("❌ Scheduled backup failed: {}", e);
                }
            }
        });

        triggers.insert(name.to_string(), handle);
        info!("⏰ Registered daily trigger {} (anchor {})", name, anchor);
        Ok(true)
    }

    /// Remove the named trigger registration if present.
    ///
    /// Returns `true` if a registration was removed; no-op otherwise.
    #[instrument(level = "debug", skip(self))]
    pub fn unschedule(&self, name: &str) -> bool {
        let mut triggers = match self.triggers.lock() {
            Ok(triggers) => triggers,
            Err(poisoned) => poisoned.into_inner(),
        };

        match triggers.remove(name) {
            Some(handle) => {
                handle.abort();
                info!("🛑 Unregistered trigger {}", name);
                true
            }
            None => false,
        }
    }

    /// Whether the named trigger is currently registered
    pub fn is_scheduled(&self, name: &str) -> bool {
        self.triggers
            .lock()
            .map(|triggers| triggers.contains_key(name))
            .unwrap_or(false)
    }
}

impl Drop for BackupScheduler {
    fn drop(&mut self) {
        if let Ok(triggers) = self.triggers.get_mut() {
            for handle in triggers.values() {
                handle.abort();
            }
        }
    }
}

/// Time remaining until the next occurrence of `anchor`, strictly after
/// `now`: a trigger firing exactly at the anchor waits a full day.
fn until_next_fire(now: DateTime<Local>, anchor: NaiveTime) -> Duration {
    let today = now.date_naive().and_time(anchor);
    let target = if today > now.naive_local() {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (target - now.naive_local()).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sitevault_core::BackupConfig;

    // Registration never touches the filesystem, so default paths are fine.
    fn test_engine() -> Arc<BackupEngine> {
        Arc::new(BackupEngine::new(BackupConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_ensure_scheduled_is_idempotent() {
        let scheduler = BackupScheduler::new(test_engine());

        assert!(scheduler.ensure_scheduled("daily-backup").unwrap());
        assert!(!scheduler.ensure_scheduled("daily-backup").unwrap());
        assert!(scheduler.is_scheduled("daily-backup"));
    }

    #[tokio::test]
    async fn test_unschedule_removes_registration() {
        let scheduler = BackupScheduler::new(test_engine());

        scheduler.ensure_scheduled("daily-backup").unwrap();
        assert!(scheduler.unschedule("daily-backup"));
        assert!(!scheduler.is_scheduled("daily-backup"));

        // Second removal is a no-op.
        assert!(!scheduler.unschedule("daily-backup"));
    }

    #[test]
    fn test_until_next_fire_before_anchor() {
        let now = Local.with_ymd_and_hms(2025, 1, 1, 18, 0, 0).unwrap();
        let anchor = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        assert_eq!(until_next_fire(now, anchor), Duration::from_secs(2 * 3600));
    }

    #[test]
    fn test_until_next_fire_after_anchor_waits_for_tomorrow() {
        let now = Local.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let anchor = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert_eq!(until_next_fire(now, anchor), Duration::from_secs(12 * 3600));
    }

    #[test]
    fn test_until_next_fire_at_anchor_is_a_full_day() {
        let now = Local.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let anchor = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert_eq!(until_next_fire(now, anchor), Duration::from_secs(24 * 3600));
    }
}
