// =============================================================================
// SiteVault - Clap Module
// =============================================================================
//
// Description:
//   Command line interface for the SiteVault backup engine. Covers one-shot
//   runs, the scheduled daemon mode, and the read-only artifact listing
//   used as the presentation surface.
//
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Returns the current version of the crate with extra info if supplied
///
/// Set the environment variable `SITEVAULT_VERSION_EXTRA` to any UTF-8
/// string to include it in parenthesis after the SemVer version. A common
/// value are git commit hashes.
pub fn version() -> String {
    let cargo_pkg_version = env!("CARGO_PKG_VERSION");

    match option_env!("SITEVAULT_VERSION_EXTRA") {
        Some(x) => format!("{} ({})", cargo_pkg_version, x),
        None => cargo_pkg_version.to_owned(),
    }
}

/// SiteVault - Unattended daily full-site backups
///
/// Snapshots a file tree into a tar.gz archive and a database into a
/// compressed SQL dump, enforcing an age-based retention window.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[clap(about, version, name = "sitevault")]
pub struct Args {
    /// Path to configuration file
    #[clap(short, long, help = "Path to configuration file", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommands for different operations
    #[clap(subcommand)]
    pub command: Commands,
}

/// Available commands for SiteVault
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run one backup pipeline pass immediately
    Run,

    /// Register the daily trigger and keep running until interrupted
    Schedule,

    /// List stored backup artifacts with their modification times
    List,

    /// Render the status view shown on the host dashboard
    Status,
}

/// Parse command line arguments into structured data
pub fn parse() -> Args {
    Args::parse()
}
