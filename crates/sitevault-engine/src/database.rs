//! Database dump functionality for SiteVault
//!
//! Serializes every table visible to a [`TableSource`] as textual SQL —
//! per table a `DROP TABLE IF EXISTS`, the engine-reported creation
//! statement, then one `INSERT` per row — and writes the concatenated
//! statements gzip-compressed at the highest level.
//!
//! Tables are processed independently in enumeration order; there is no
//! cross-table transaction guarantee. Values are rendered type-aware by
//! [`SqlValue::render`] rather than through a driver's generic escape, so
//! NULLs, embedded quotes and binary blobs all survive the round trip.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::{write::GzEncoder, Compression};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info, instrument};

use sitevault_core::{Error, Result, SqlValue, TableDef, TableSource};

/// Counters describing one dump run
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpStats {
    /// Tables serialized
    pub tables: usize,
    /// Rows serialized across all tables
    pub rows: usize,
}

/// Dump every table of `source` into a compressed SQL file at
/// `destination`, creating parent directories as needed and overwriting
/// any existing dump at that path.
#[instrument(level = "debug", skip(source), fields(destination = %destination.display()))]
pub fn dump(source: &dyn TableSource, destination: &Path) -> Result<DumpStats> {
    info!("💾 Dumping database to {:?}", destination);

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut sql = String::new();
    let mut stats = DumpStats::default();

    for table in source.tables()? {
        debug!("📋 Dumping table {}", table.name);
        sql.push_str(&format!("DROP TABLE IF EXISTS {};\n", table.name));
        sql.push_str(&table.create_statement);
        sql.push_str(";\n");

        for row in source.rows(&table.name)? {
            let values: Vec<String> = row.iter().map(SqlValue::render).collect();
            sql.push_str(&format!(
                "INSERT INTO {} VALUES ({});\n",
                table.name,
                values.join(", ")
            ));
            stats.rows += 1;
        }
        stats.tables += 1;
    }

    let file = fs::File::create(destination)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::best());
    encoder.write_all(sql.as_bytes())?;
    encoder
        .finish()
        .map_err(|e| Error::compression(format!("Failed to finish dump: {}", e)))?;

    info!(
        "✅ Dumped {} tables ({} rows) to {:?}",
        stats.tables, stats.rows, destination
    );
    Ok(stats)
}

/// SQLite-backed [`TableSource`]
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Open the SQLite database at `path` read-only.
    ///
    /// A dumper must never create the database as a side effect, so a
    /// missing file is an error rather than a fresh empty database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| Error::query(format!("Failed to open database {:?}: {}", path, e)))?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl TableSource for SqliteSource {
    fn tables(&self) -> Result<Vec<TableDef>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name, sql FROM sqlite_master \
                 WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(|e| Error::query(format!("Failed to list tables: {}", e)))?;

        let tables = stmt
            .query_map([], |row| {
                Ok(TableDef {
                    name: row.get(0)?,
                    create_statement: row.get(1)?,
                })
            })
            .map_err(|e| Error::query(format!("Failed to query tables: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::query(format!("Failed to read table list: {}", e)))?;

        Ok(tables)
    }

    fn rows(&self, table: &str) -> Result<Vec<Vec<SqlValue>>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM \"{}\"", table))
            .map_err(|e| Error::query(format!("Failed to read table {}: {}", table, e)))?;

        let columns = stmt.column_count();
        let mut rows = stmt
            .query([])
            .map_err(|e| Error::query(format!("Failed to query table {}: {}", table, e)))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| Error::query(format!("Failed to step table {}: {}", table, e)))?
        {
            let mut values = Vec::with_capacity(columns);
            for i in 0..columns {
                let value = match row
                    .get_ref(i)
                    .map_err(|e| Error::query(format!("Failed to read column {}: {}", i, e)))?
                {
                    ValueRef::Null => SqlValue::Null,
                    ValueRef::Integer(v) => SqlValue::Integer(v),
                    ValueRef::Real(f) => SqlValue::Real(f),
                    ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
                };
                values.push(value);
            }
            out.push(values);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::tempdir;

    fn seeded_source() -> SqliteSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT, body TEXT, raw BLOB);
             INSERT INTO posts VALUES (1, 'hello', 'it''s a post', X'00FF');
             INSERT INTO posts VALUES (2, 'world', NULL, NULL);",
        )
        .unwrap();
        SqliteSource::from_connection(conn)
    }

    fn decompress(path: &Path) -> String {
        let file = fs::File::open(path).unwrap();
        let mut text = String::new();
        GzDecoder::new(file).read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_tables_report_create_statement() {
        let source = seeded_source();
        let tables = source.tables().unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "posts");
        assert!(tables[0].create_statement.starts_with("CREATE TABLE posts"));
    }

    #[test]
    fn test_dump_orders_statements_per_table() {
        let source = seeded_source();
        let dir = tempdir().unwrap();
        let destination = dir.path().join("database_2025-01-01.sql.gz");

        let stats = dump(&source, &destination).unwrap();
        assert_eq!(stats.tables, 1);
        assert_eq!(stats.rows, 2);

        let text = decompress(&destination);
        let drop_at = text.find("DROP TABLE IF EXISTS posts;").unwrap();
        let create_at = text.find("CREATE TABLE posts").unwrap();
        let first_insert = text.find("INSERT INTO posts").unwrap();
        assert!(drop_at < create_at);
        assert!(create_at < first_insert);
        assert_eq!(text.matches("INSERT INTO posts").count(), 2);
    }

    #[test]
    fn test_dump_escapes_values() {
        let source = seeded_source();
        let dir = tempdir().unwrap();
        let destination = dir.path().join("database.sql.gz");

        dump(&source, &destination).unwrap();
        let text = decompress(&destination);

        assert!(text.contains("'it''s a post'"));
        assert!(text.contains("X'00FF'"));
        assert!(text.contains("NULL"));
    }

    #[test]
    fn test_dump_replays_into_fresh_database() {
        let source = seeded_source();
        let dir = tempdir().unwrap();
        let destination = dir.path().join("database.sql.gz");

        dump(&source, &destination).unwrap();
        let text = decompress(&destination);

        let restored = Connection::open_in_memory().unwrap();
        restored.execute_batch(&text).unwrap();

        let count: i64 = restored
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let body: String = restored
            .query_row("SELECT body FROM posts WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(body, "it's a post");
    }

    #[test]
    fn test_dump_empty_database() {
        let source = SqliteSource::from_connection(Connection::open_in_memory().unwrap());
        let dir = tempdir().unwrap();
        let destination = dir.path().join("database.sql.gz");

        let stats = dump(&source, &destination).unwrap();
        assert_eq!(stats.tables, 0);
        assert_eq!(stats.rows, 0);
        assert_eq!(decompress(&destination), "");
    }
}
