//! SQLite table backend.

use super::{Snapshot, StorageBackend, decode_stored_text, encode_stored_text, expand_home};
use crate::error::{Error, Result};
use log::{debug, info};
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid table name regex"));

/// SQLite-backed settings storage, one row per key
///
/// Values are stored as text. Arrays and objects are JSON-encoded on write,
/// and on read anything that parses as JSON is decoded again.
///
/// # Example
///
/// ```rust,no_run
/// use settings_store::storage::{StorageBackend, TableBackend};
/// use serde_json::json;
///
/// let backend = TableBackend::open("settings.sqlite", "settings")?;
/// backend.set("site_name", &json!("Acme"))?;
/// # Ok::<(), settings_store::Error>(())
/// ```
pub struct TableBackend {
    conn: Mutex<Connection>,
    table: String,
}

impl TableBackend {
    /// Open (or create) a database file and ensure the settings table exists
    ///
    /// Supports `~` expansion for the home directory.
    pub fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self> {
        let path = expand_home(path.as_ref().to_path_buf());
        let path = path.as_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                crate::security::ensure_secure_dir(parent)?;
            }
        }
        let backend = Self::from_connection(Connection::open(path)?, table)?;
        info!(
            "Opened settings table '{}' in {}",
            backend.table,
            path.display()
        );
        Ok(backend)
    }

    /// Open an in-memory database. Data is lost when the backend is dropped.
    pub fn open_in_memory(table: impl Into<String>) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, table)
    }

    /// Wrap an existing connection and ensure the settings table exists
    pub fn from_connection(conn: Connection, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !TABLE_NAME.is_match(&table) {
            return Err(Error::Config(format!(
                "Invalid table name '{table}': expected letters, digits and underscores"
            )));
        }

        let backend = Self {
            conn: Mutex::new(conn),
            table,
        };
        backend.create_table()?;
        Ok(backend)
    }

    /// Name of the settings table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the settings table if it does not exist
    pub fn create_table(&self) -> Result<()> {
        self.conn.lock().execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NULL,
                    created_at TEXT NULL,
                    updated_at TEXT NULL
                )",
                self.table
            ),
            [],
        )?;
        Ok(())
    }

    /// Drop the settings table
    pub fn drop_table(&self) -> Result<()> {
        self.conn
            .lock()
            .execute(&format!("DROP TABLE IF EXISTS \"{}\"", self.table), [])?;
        info!("Dropped settings table '{}'", self.table);
        Ok(())
    }

    /// Read the raw stored text of one row, without JSON decoding
    ///
    /// Returns `None` when the key is absent and `Some(None)` for a `NULL` value.
    pub fn raw(&self, key: &str) -> Result<Option<Option<String>>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                &format!("SELECT value FROM \"{}\" WHERE key = ?1", self.table),
                [key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Creation and last update timestamps (RFC 3339) of one row
    ///
    /// Either may be `None` for rows written by other clients.
    pub fn timestamps(&self, key: &str) -> Result<Option<(Option<String>, Option<String>)>> {
        let conn = self.conn.lock();
        let stamps = conn
            .query_row(
                &format!(
                    "SELECT created_at, updated_at FROM \"{}\" WHERE key = ?1",
                    self.table
                ),
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(stamps)
    }
}

impl StorageBackend for TableBackend {
    fn backend_name(&self) -> &'static str {
        "table"
    }

    fn all(&self) -> Result<Snapshot> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT key, value FROM \"{}\"", self.table))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut snapshot = Snapshot::new();
        for row in rows {
            let (key, value) = row?;
            let value = value.map_or(Value::Null, decode_stored_text);
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let stored = encode_stored_text(value)?;
        let now = now_rfc3339()?;

        self.conn.lock().execute(
            &format!(
                "INSERT INTO \"{}\" (key, value, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                self.table
            ),
            params![key, stored, now],
        )?;

        debug!("Setting '{key}' upserted into table '{}'", self.table);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<()> {
        self.conn.lock().execute(
            &format!("DELETE FROM \"{}\" WHERE key = ?1", self.table),
            [key],
        )?;
        debug!("Setting '{key}' deleted from table '{}'", self.table);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let removed = self
            .conn
            .lock()
            .execute(&format!("DELETE FROM \"{}\"", self.table), [])?;
        debug!("Cleared {removed} rows from table '{}'", self.table);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool> {
        let exists = self.conn.lock().query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE key = ?1)",
                self.table
            ),
            [key],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| Error::Config(format!("Failed to format timestamp: {e}")))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_invalid_table_name() {
        let err = TableBackend::open_in_memory("settings; DROP TABLE x").err().unwrap();
        assert!(matches!(err, Error::Config(_)));

        assert!(TableBackend::open_in_memory("1settings").is_err());
        assert!(TableBackend::open_in_memory("app_settings").is_ok());
    }

    #[test]
    fn test_structured_values_are_json_encoded() {
        let backend = TableBackend::open_in_memory("settings").unwrap();
        backend.set("tags", &json!(["a", "b"])).unwrap();
        backend.set("site_name", &json!("Acme")).unwrap();

        assert_eq!(
            backend.raw("tags").unwrap(),
            Some(Some(r#"["a","b"]"#.to_string()))
        );
        assert_eq!(
            backend.raw("site_name").unwrap(),
            Some(Some("Acme".to_string()))
        );
        assert_eq!(backend.raw("missing").unwrap(), None);

        let all = backend.all().unwrap();
        assert_eq!(all["tags"], json!(["a", "b"]));
        assert_eq!(all["site_name"], json!("Acme"));
    }

    #[test]
    fn test_json_looking_scalar_is_decoded() {
        let backend = TableBackend::open_in_memory("settings").unwrap();
        backend.set("port", &json!("8080")).unwrap();
        backend.set("enabled", &json!("true")).unwrap();

        let all = backend.all().unwrap();
        assert_eq!(all["port"], json!(8080));
        assert_eq!(all["enabled"], json!(true));
    }

    #[test]
    fn test_null_row_reads_as_null_and_exists() {
        let backend = TableBackend::open_in_memory("settings").unwrap();
        backend.set("empty", &Value::Null).unwrap();

        assert_eq!(backend.raw("empty").unwrap(), Some(None));
        assert_eq!(backend.all().unwrap()["empty"], Value::Null);
        assert!(backend.has("empty").unwrap());
    }

    #[test]
    fn test_upsert_keeps_created_at() {
        let backend = TableBackend::open_in_memory("settings").unwrap();
        backend.set("a", &json!("one")).unwrap();
        let (created, _) = backend.timestamps("a").unwrap().unwrap();

        backend.set("a", &json!("two")).unwrap();
        let (created_again, updated) = backend.timestamps("a").unwrap().unwrap();

        assert!(created.is_some());
        assert_eq!(created, created_again);
        let updated = updated.unwrap();
        assert!(OffsetDateTime::parse(&updated, &Rfc3339).is_ok());
        assert_eq!(backend.all().unwrap().len(), 1);
        assert_eq!(backend.all().unwrap()["a"], json!("two"));
    }

    #[test]
    fn test_drop_table_then_reads_fail() {
        let backend = TableBackend::open_in_memory("settings").unwrap();
        backend.drop_table().unwrap();

        let err = backend.all().unwrap_err();
        assert!(err.is_store_unavailable());

        backend.create_table().unwrap();
        assert!(backend.all().unwrap().is_empty());
    }

    #[test]
    fn test_open_file_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db/settings.sqlite");

        {
            let backend = TableBackend::open(&path, "settings").unwrap();
            backend.set("site_name", &json!("Acme")).unwrap();
        }

        let backend = TableBackend::open(&path, "settings").unwrap();
        assert_eq!(backend.all().unwrap()["site_name"], json!("Acme"));
    }
}
