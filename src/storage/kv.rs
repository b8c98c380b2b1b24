use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

/// Blob key for practice statistics.
pub const STATS_KEY: &str = "practice_stats";
/// Blob key for user settings.
pub const SETTINGS_KEY: &str = "user_settings";

/// String-keyed blob storage. Saving overwrites; there are no transactions
/// across keys.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, blob: &str) -> Result<()>;
}

/// Key/value blobs in a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store at the configured data path.
    pub fn open_default() -> Result<Self> {
        Self::open(&crate::paths::db_path())
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to set database pragmas")?;

        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// A throwaway store for tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Create the table if it doesn't exist. Idempotent.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("Failed to initialize database schema")?;
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .with_context(|| format!("Failed to load {key}"))
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET
                    value = ?2,
                    updated_at = datetime('now')",
                rusqlite::params![key, blob],
            )
            .with_context(|| format!("Failed to save {key}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_key_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load(STATS_KEY).unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save(STATS_KEY, "{}").unwrap();
        assert_eq!(store.load(STATS_KEY).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn save_overwrites() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save(SETTINGS_KEY, "one").unwrap();
        store.save(SETTINGS_KEY, "two").unwrap();
        assert_eq!(store.load(SETTINGS_KEY).unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn keys_are_independent() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save(STATS_KEY, "stats").unwrap();
        store.save(SETTINGS_KEY, "settings").unwrap();
        assert_eq!(store.load(STATS_KEY).unwrap().as_deref(), Some("stats"));
        assert_eq!(store.load(SETTINGS_KEY).unwrap().as_deref(), Some("settings"));
    }

    #[test]
    fn persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/store.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.save(STATS_KEY, "kept").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load(STATS_KEY).unwrap().as_deref(), Some("kept"));
    }
}
