//! SiteVault Core Library
//!
//! Fundamental types, traits and configuration shared across the SiteVault
//! workspace.
//!
//! # Features
//! - Backup configuration with validation
//! - Error handling (`Error` / `Result`)
//! - Host lifecycle and database capability traits
//! - Run reports for diagnosing best-effort pipeline runs
//!
//! # Examples
//! ```rust
//! use sitevault_core::{BackupConfig, Result};
//!
//! fn example() -> Result<()> {
//!     let config = BackupConfig::default();
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::BackupConfig;
pub use error::{Error, Result};
pub use traits::{HostHooks, TableSource};
pub use types::{FailedDeletion, RunReport, SqlValue, StageOutcome, TableDef};
