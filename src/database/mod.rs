mod schema;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::{fs, path::Path, path::PathBuf};

use crate::common::home_dir;

/// SQLite store for user preferences and execution history.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens the database at `path`, or the default location when `None`.
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let db_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::get_database_path()?,
        };
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {:?}", parent))?;
        }

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::Schema::initialize(&conn)?;
        Ok(Database { conn })
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;
        Ok(())
    }

    pub fn settings(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn log_execution(&self, action_id: &str, success: bool) -> Result<()> {
        let timestamp = chrono::Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO action_executions (action_id, execution_timestamp, success) VALUES (?1, ?2, ?3)",
            (action_id, timestamp, success),
        )?;
        Ok(())
    }

    /// Number of successful launches recorded for `action_id`.
    pub fn get_execution_count(&self, action_id: &str) -> Result<i32> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM action_executions WHERE action_id = ?1 AND success = 1",
            [action_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn get_database_path() -> Result<PathBuf> {
        Ok(home_dir()?
            .join(".local")
            .join("share")
            .join("srunner")
            .join("srunner.db"))
    }
}
