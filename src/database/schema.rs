use anyhow::Result;
use log::info;
use rusqlite::Connection;

pub const CURRENT_VERSION: i32 = 1;

pub const TABLE_SCHEMA_VERSION: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
)";

pub const TABLE_SETTINGS: &str = "
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

pub const TABLE_ACTION_EXECUTIONS: &str = "
CREATE TABLE IF NOT EXISTS action_executions (
    action_id TEXT NOT NULL,
    execution_timestamp TEXT NOT NULL,
    success BOOLEAN NOT NULL DEFAULT 1
)";

// Schema version migration steps
struct MigrationStep {
    target_version: i32,
    migration_fn: fn(&Connection) -> Result<()>,
}

pub struct Schema;

impl Schema {
    pub fn initialize(conn: &Connection) -> Result<()> {
        Self::create_tables(conn)?;

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .ok();

        match version {
            None => {
                // Fresh database, tables already have the current shape
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    [CURRENT_VERSION],
                )?;
            }
            Some(v) if v < CURRENT_VERSION => {
                Self::migrate_schema(conn, v)?;
                conn.execute("UPDATE schema_version SET version = ?1", [CURRENT_VERSION])?;
            }
            _ => (), // Schema is up to date
        }

        Ok(())
    }

    fn create_tables(conn: &Connection) -> Result<()> {
        conn.execute(TABLE_SCHEMA_VERSION, [])?;
        conn.execute(TABLE_SETTINGS, [])?;
        conn.execute(TABLE_ACTION_EXECUTIONS, [])?;

        Ok(())
    }

    fn migrate_schema(conn: &Connection, current_version: i32) -> Result<()> {
        let migration_steps = [
            MigrationStep {
                target_version: 1,
                migration_fn: Self::migrate_to_v1,
            },
        ];

        // Execute migrations in order, skipping those already applied
        for step in migration_steps.iter() {
            if current_version < step.target_version {
                (step.migration_fn)(conn)?;
                info!("Migrated schema to version {}", step.target_version);
            }
        }

        Ok(())
    }

    fn migrate_to_v1(conn: &Connection) -> Result<()> {
        Self::create_tables(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        Schema::initialize(&conn).unwrap();
        Schema::initialize(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_fresh_schema_records_success() {
        let conn = Connection::open_in_memory().unwrap();
        Schema::initialize(&conn).unwrap();
        conn.execute(
            "INSERT INTO action_executions (action_id, execution_timestamp) VALUES ('calc', 'now')",
            [],
        )
        .unwrap();

        let success: bool = conn
            .query_row(
                "SELECT success FROM action_executions WHERE action_id = 'calc'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(success);
    }

    #[test]
    fn test_stale_version_row_is_brought_current() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(TABLE_SCHEMA_VERSION, []).unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])
            .unwrap();

        Schema::initialize(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
        let tables: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('settings', 'action_executions')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }
}
