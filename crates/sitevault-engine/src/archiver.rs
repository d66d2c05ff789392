//! File-tree archiver for SiteVault
//!
//! Walks the site root and writes a gzip-compressed tar archive containing
//! every regular file under its root-relative path, so the archive can be
//! extracted at any root. Directories are not materialized as entries;
//! symlinks and special files are skipped and counted.
//!
//! Walk policy: an unreadable entry or a per-file read failure is skipped
//! and logged rather than aborting the whole run; only a failure to create
//! or finish the archive itself fails the operation.

use std::fs;
use std::io::BufWriter;
use std::path::Path;

use flate2::{write::GzEncoder, Compression};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use sitevault_core::{Error, Result};

/// Counters describing one archive run
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveStats {
    /// Regular files stored in the archive
    pub files: usize,
    /// Entries skipped (unreadable, symlink or special file)
    pub skipped: usize,
}

/// Archive every regular file under `source_root` into a tar.gz at
/// `destination`, creating parent directories as needed and overwriting
/// any existing archive at that path.
#[instrument(level = "debug", skip_all, fields(source = %source_root.display(), destination = %destination.display()))]
pub fn archive(
    source_root: &Path,
    destination: &Path,
    compression_level: u32,
) -> Result<ArchiveStats> {
    info!("📦 Archiving {:?} to {:?}", source_root, destination);

    if !source_root.is_dir() {
        return Err(Error::InvalidPath(source_root.to_path_buf()));
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = fs::File::create(destination)?;
    // Resolved after creation so the file exists; spelling differences
    // between the walk and the destination (relative vs. absolute, a
    // leading `./`) must not defeat the self-inclusion check below.
    let destination_real = destination.canonicalize()?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::new(compression_level));
    let mut builder = tar::Builder::new(encoder);
    let mut stats = ArchiveStats::default();

    for entry in WalkDir::new(source_root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("⚠️ Skipping unreadable entry: {}", e);
                stats.skipped += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            if entry.file_type().is_symlink() {
                debug!("🔗 Skipping symlink {:?}", entry.path());
                stats.skipped += 1;
            }
            continue;
        }

        // The archive under construction may itself live under the
        // source root; storing it inside itself is never wanted.
        let is_destination = entry
            .path()
            .canonicalize()
            .map(|p| p == destination_real)
            .unwrap_or(false);
        if is_destination {
            continue;
        }

        let relative = match entry.path().strip_prefix(source_root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };

        match builder.append_path_with_name(entry.path(), relative) {
            Ok(()) => stats.files += 1,
            Err(e) => {
                warn!("⚠️ Skipping unreadable file {:?}: {}", entry.path(), e);
                stats.skipped += 1;
            }
        }
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| Error::compression(format!("Failed to finish archive: {}", e)))?;
    encoder.finish()?;

    info!(
        "✅ Archived {} files ({} skipped) to {:?}",
        stats.files, stats.skipped, destination
    );
    Ok(stats)
}
