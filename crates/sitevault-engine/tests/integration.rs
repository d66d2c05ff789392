//! Integration tests for the SiteVault backup pipeline
//!
//! Exercises a full backup run over a real temporary site tree and SQLite
//! database, then verifies artifacts, retention and the run log.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Local;
use flate2::read::GzDecoder;
use rusqlite::Connection;
use tempfile::{tempdir, TempDir};

use sitevault_engine::storage::{RunGuard, RUN_LOG_FILE};
use sitevault_engine::{BackupConfig, BackupEngine, Error, RunReport};

struct Fixture {
    _dir: TempDir,
    config: BackupConfig,
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();

    let site_root = dir.path().join("site");
    fs::create_dir_all(site_root.join("sub")).unwrap();
    fs::write(site_root.join("a.txt"), b"alpha").unwrap();
    fs::write(site_root.join("sub/b.txt"), b"beta").unwrap();

    let database_path = dir.path().join("site.db");
    let conn = Connection::open(&database_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT);
         INSERT INTO posts VALUES (1, 'first post');
         INSERT INTO posts VALUES (2, 'second post');",
    )
    .unwrap();

    let config = BackupConfig {
        site_root,
        storage_dir: dir.path().join("backups"),
        database_path,
        ..Default::default()
    };

    Fixture { _dir: dir, config }
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn decompress(path: &Path) -> String {
    let file = fs::File::open(path).unwrap();
    let mut text = String::new();
    GzDecoder::new(file).read_to_string(&mut text).unwrap();
    text
}

fn archive_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let file = fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut entries = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        entries.push((name, contents));
    }
    entries.sort();
    entries
}

#[tokio::test]
async fn test_pipeline_produces_both_artifacts() {
    let fixture = fixture();
    let engine = BackupEngine::new(fixture.config.clone()).unwrap();

    let report = engine.run_once().await.unwrap();
    assert!(report.is_success(), "report: {:?}", report);

    let archive_path = fixture
        .config
        .storage_dir
        .join(format!("files_{}.tar.gz", today()));
    let entries = archive_entries(&archive_path);
    assert_eq!(
        entries,
        vec![
            ("a.txt".to_string(), b"alpha".to_vec()),
            ("sub/b.txt".to_string(), b"beta".to_vec()),
        ]
    );

    let dump_path = fixture
        .config
        .storage_dir
        .join(format!("database_{}.sql.gz", today()));
    let sql = decompress(&dump_path);
    assert_eq!(sql.matches("DROP TABLE IF EXISTS posts;").count(), 1);
    assert_eq!(sql.matches("CREATE TABLE posts").count(), 1);
    assert_eq!(sql.matches("INSERT INTO posts").count(), 2);
}

#[tokio::test]
async fn test_same_day_rerun_overwrites_artifacts() {
    let fixture = fixture();
    let engine = BackupEngine::new(fixture.config.clone()).unwrap();

    engine.run_once().await.unwrap();
    engine.run_once().await.unwrap();

    let archives: Vec<PathBuf> = fs::read_dir(&fixture.config.storage_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "gz"))
        .collect();
    // One archive and one dump, not four files.
    assert_eq!(archives.len(), 2);
}

#[tokio::test]
async fn test_pipeline_prunes_expired_artifacts() {
    let fixture = fixture();
    fs::create_dir_all(&fixture.config.storage_dir).unwrap();

    let stale = fixture.config.storage_dir.join("files_2020-01-01.tar.gz");
    fs::write(&stale, b"old").unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(10 * 86_400);
    fs::OpenOptions::new()
        .write(true)
        .open(&stale)
        .unwrap()
        .set_modified(mtime)
        .unwrap();

    let engine = BackupEngine::new(fixture.config.clone()).unwrap();
    let report = engine.run_once().await.unwrap();

    assert!(report.is_success());
    assert!(!stale.exists());
    // Fresh artifacts from this run survive their own retention pass.
    assert!(fixture
        .config
        .storage_dir
        .join(format!("files_{}.tar.gz", today()))
        .exists());
}

#[tokio::test]
async fn test_dump_failure_does_not_block_other_stages() {
    let mut fixture = fixture();
    fixture.config.database_path = fixture.config.storage_dir.join("missing.db");

    let engine = BackupEngine::new(fixture.config.clone()).unwrap();
    let report = engine.run_once().await.unwrap();

    assert!(report.archive.is_ok());
    assert!(!report.dump.is_ok());
    assert!(report.prune.is_ok());
    assert!(fixture
        .config
        .storage_dir
        .join(format!("files_{}.tar.gz", today()))
        .exists());
}

#[tokio::test]
async fn test_concurrent_run_is_refused() {
    let fixture = fixture();
    fs::create_dir_all(&fixture.config.storage_dir).unwrap();
    let _guard = RunGuard::acquire(&fixture.config.storage_dir).unwrap();

    let engine = BackupEngine::new(fixture.config.clone()).unwrap();
    assert!(matches!(engine.run_once().await, Err(Error::Busy(_))));
}

#[tokio::test]
async fn test_run_log_records_each_run() {
    let fixture = fixture();
    let engine = BackupEngine::new(fixture.config.clone()).unwrap();

    engine.run_once().await.unwrap();
    engine.run_once().await.unwrap();

    let log = fs::read_to_string(fixture.config.storage_dir.join(RUN_LOG_FILE)).unwrap();
    let reports: Vec<RunReport> = log
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.is_success()));
}
