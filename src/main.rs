// =============================================================================
// SiteVault - Main Entry Point
// =============================================================================
//
// Description:
//   Entry point for the SiteVault backup daemon and CLI. Loads the backup
//   configuration from a TOML file plus SITEVAULT_* environment variables,
//   initialises structured logging, and dispatches to the backup engine:
//   one-shot runs, the scheduled daily trigger, and the read-only artifact
//   listing.
//
// Architecture:
//   • Tokio runtime with the engine's scheduler tasks
//   • Configuration via figment (TOML + environment variables)
//   • Structured logging with tracing
//
// =============================================================================

use std::path::PathBuf;

use chrono::{DateTime, Local};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sitevault_core::{BackupConfig, HostHooks, StageOutcome};
use sitevault_engine::{retention, BackupService};

mod clap;

/// Default configuration file consulted when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "sitevault.toml";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = clap::parse();
    if let Err(e) = run(args).await {
        error!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn run(args: clap::Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config)?;
    let service = BackupService::new(config)?;

    match args.command {
        clap::Commands::Run => {
            info!("💾 Running one backup pipeline pass");
            let report = service.on_trigger().await?;
            println!("Backup run {}", report.date);
            println!("  archive: {}", describe(&report.archive));
            println!("  dump:    {}", describe(&report.dump));
            println!("  prune:   {}", describe(&report.prune));
            for failed in &report.failed_deletions {
                println!("  failed deletion: {} ({})", failed.path.display(), failed.error);
            }
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        clap::Commands::Schedule => {
            service.on_activate().await?;
            info!("🚀 SiteVault scheduler running, press Ctrl-C to stop");
            signal::ctrl_c().await?;
            service.on_deactivate().await?;
            info!("🛑 SiteVault scheduler stopped");
        }
        clap::Commands::List => {
            let storage_dir = &service.engine().config().storage_dir;
            if !storage_dir.is_dir() {
                println!("No backups found.");
                return Ok(());
            }
            for file in retention::list_backup_files(storage_dir)? {
                let modified: DateTime<Local> = file.modified.into();
                println!(
                    "{}  {}  {} bytes",
                    file.name,
                    modified.format("%Y-%m-%d %H:%M:%S"),
                    file.size
                );
            }
        }
        clap::Commands::Status => {
            print!("{}", service.render_status()?);
        }
    }

    Ok(())
}

/// Load the backup configuration from TOML plus prefixed environment
/// variables; a missing file falls back to defaults.
fn load_config(path: Option<PathBuf>) -> Result<BackupConfig, figment::Error> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("SITEVAULT_"))
        .extract()
}

fn describe(outcome: &StageOutcome) -> String {
    match outcome {
        StageOutcome::Ok { detail } => format!("ok ({})", detail),
        StageOutcome::Failed { error } => format!("FAILED: {}", error),
    }
}
