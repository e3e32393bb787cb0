//! SQLite persistence for the metadata cache.
//!
//! One database file per source tree. The `meta` table carries the schema
//! version, the source fingerprint and the build time; anything that does
//! not check out is reported as an error and the caller rebuilds.

use super::{MetadataCacheEntry, SCHEMA_VERSION};
use crate::core::metadata::MetadataSummary;
use crate::error::CacheError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads and writes `MetadataCacheEntry` values as SQLite files
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the entry, checking schema version and fingerprint.
    ///
    /// Opens read-only so a load never touches the file's mtime.
    pub fn load(&self, expected_fingerprint: &str) -> Result<MetadataCacheEntry, CacheError> {
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| CacheError::OpenFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let version = read_meta(&conn, "schema_version")?.unwrap_or_default();
        if version != SCHEMA_VERSION.to_string() {
            return Err(CacheError::SchemaMismatch {
                found: version,
                expected: SCHEMA_VERSION,
            });
        }

        let fingerprint = read_meta(&conn, "fingerprint")?.unwrap_or_default();
        if fingerprint != expected_fingerprint {
            return Err(CacheError::FingerprintMismatch {
                path: self.path.clone(),
            });
        }

        let built_at = read_meta(&conn, "built_at")?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc))
            .ok_or_else(|| CacheError::QueryFailed("missing or invalid built_at".to_string()))?;

        let mut stmt =
            conn.prepare("SELECT path, date_time_original, date_time FROM summaries")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                PathBuf::from(row.get::<_, String>(0)?),
                MetadataSummary {
                    date_time_original: row.get(1)?,
                    date_time: row.get(2)?,
                },
            ))
        })?;

        let mut summaries = HashMap::new();
        for row in rows {
            let (path, summary) = row?;
            summaries.insert(path, summary);
        }

        Ok(MetadataCacheEntry {
            fingerprint,
            summaries,
            built_at,
        })
    }

    /// Write the entry to a temporary file, then swap it into place
    pub fn save(&self, entry: &MetadataCacheEntry) -> Result<(), CacheError> {
        let open_failed = |reason: String| CacheError::OpenFailed {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| open_failed(e.to_string()))?;
        }

        let staging = self.path.with_extension("db.tmp");
        if staging.exists() {
            fs::remove_file(&staging).map_err(|e| open_failed(e.to_string()))?;
        }

        let mut conn = Connection::open(&staging).map_err(|e| open_failed(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE summaries (
                path TEXT PRIMARY KEY,
                date_time_original TEXT,
                date_time TEXT
            );",
        )?;

        let tx = conn.transaction()?;
        {
            let mut meta = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;
            meta.execute(params!["schema_version", SCHEMA_VERSION.to_string()])?;
            meta.execute(params!["fingerprint", entry.fingerprint])?;
            meta.execute(params!["built_at", entry.built_at.to_rfc3339()])?;

            let mut insert = tx.prepare(
                "INSERT OR REPLACE INTO summaries (path, date_time_original, date_time)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (path, summary) in &entry.summaries {
                insert.execute(params![
                    path.to_string_lossy().into_owned(),
                    summary.date_time_original.as_deref(),
                    summary.date_time.as_deref(),
                ])?;
            }
        }
        tx.commit()?;
        conn.close().map_err(|(_, e)| CacheError::from(e))?;

        fs::rename(&staging, &self.path).map_err(|e| open_failed(e.to_string()))?;
        Ok(())
    }

    /// Delete the file. Returns whether there was anything to delete.
    pub fn remove(&self) -> Result<bool, CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::OpenFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>, CacheError> {
    Ok(conn
        .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::MetadataTag;
    use tempfile::TempDir;

    fn sample_entry(fingerprint: &str) -> MetadataCacheEntry {
        let mut summary = MetadataSummary::default();
        summary.record(MetadataTag::DateTimeOriginal, b"2024:02:29 12:00:00");
        MetadataCacheEntry {
            fingerprint: fingerprint.to_string(),
            summaries: HashMap::from([
                (PathBuf::from("/raw/A/1.CR2"), summary),
                (PathBuf::from("/raw/A/2.CR2"), MetadataSummary::default()),
            ]),
            built_at: Utc::now(),
        }
    }

    #[test]
    fn saved_entry_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("cache").join("m.db"));
        let entry = sample_entry("abc");

        store.save(&entry).unwrap();
        let loaded = store.load("abc").unwrap();

        assert_eq!(loaded.summaries, entry.summaries);
        assert_eq!(loaded.fingerprint, "abc");
        assert_eq!(loaded.built_at.timestamp(), entry.built_at.timestamp());
    }

    #[test]
    fn fingerprint_mismatch_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("m.db"));
        store.save(&sample_entry("abc")).unwrap();

        assert!(matches!(
            store.load("def"),
            Err(CacheError::FingerprintMismatch { .. })
        ));
    }

    #[test]
    fn garbage_file_is_an_error_not_a_panic() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("m.db");
        fs::write(&path, b"definitely not sqlite").unwrap();

        assert!(SqliteStore::new(&path).load("abc").is_err());
    }

    #[test]
    fn save_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("m.db");
        fs::write(&path, b"stale garbage").unwrap();
        let store = SqliteStore::new(&path);

        store.save(&sample_entry("abc")).unwrap();

        assert_eq!(store.load("abc").unwrap().summaries.len(), 2);
    }

    #[test]
    fn remove_reports_whether_file_existed() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("m.db"));
        assert!(!store.remove().unwrap());

        store.save(&sample_entry("abc")).unwrap();
        assert!(store.remove().unwrap());
    }
}
