//! SQLite schema for the journal store
//!
//! The store is versioned. Revision 1 holds `id`, `emoticon` and `message`;
//! revision 2 adds the `is_editing` flag. The stored revision lives in
//! `schema_info` under the `version` key.

use rusqlite::{Connection, OptionalExtension, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: u32 = 2;

/// Oldest revision the store can still open
pub const MIN_SCHEMA_VERSION: u32 = 1;

/// Table holding journal entries
pub const FEELINGS_TABLE: &str = "feelings";

/// Name the old table is moved to while a migration runs
pub const PREVIOUS_FEELINGS_TABLE: &str = "feelings_previous";

/// Whether `version` is a revision this build knows how to lay out
pub fn is_supported(version: u32) -> bool {
    (MIN_SCHEMA_VERSION..=SCHEMA_VERSION).contains(&version)
}

/// Initialize an empty database at the given revision
pub fn init_schema(conn: &Connection, version: u32) -> Result<()> {
    ensure_info_table(conn)?;
    create_feelings_table(conn, FEELINGS_TABLE, version)?;
    set_schema_version(conn, version)
}

/// Create the version tracking table
pub fn ensure_info_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
}

/// Create the feelings table in the layout of `version`
pub fn create_feelings_table(conn: &Connection, table: &str, version: u32) -> Result<()> {
    let sql = if version >= 2 {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                emoticon TEXT NOT NULL,
                message TEXT NOT NULL,
                is_editing INTEGER NOT NULL DEFAULT 0
            );"
        )
    } else {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                emoticon TEXT NOT NULL,
                message TEXT NOT NULL
            );"
        )
    };
    conn.execute_batch(&sql)
}

/// Column list for reading a `Feeling` out of a table at `version`
///
/// Revision 1 has no editing flag, so it reads as `false`.
pub fn feeling_columns(version: u32) -> &'static str {
    if version >= 2 {
        "id, emoticon, message, is_editing"
    } else {
        "id, emoticon, message, 0"
    }
}

/// Record the schema version
pub fn set_schema_version(conn: &Connection, version: u32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [version.to_string()],
    )?;
    Ok(())
}

/// Get the stored schema version
///
/// Returns `None` for an empty database. A database holding a feelings
/// table but no version record predates version tracking and is reported
/// as revision 1 (or 2 when it already carries the editing column).
pub fn get_schema_version(conn: &Connection) -> Result<Option<u32>> {
    if table_exists(conn, "schema_info")? {
        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM schema_info WHERE key = 'version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(version) = stored.and_then(|v| v.parse().ok()) {
            return Ok(Some(version));
        }
    }

    if !table_exists(conn, FEELINGS_TABLE)? {
        return Ok(None);
    }

    if column_exists(conn, FEELINGS_TABLE, "is_editing")? {
        Ok(Some(2))
    } else {
        Ok(Some(1))
    }
}

/// Check whether a table exists
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?")?
        .exists([name])
}

/// Check whether a table has a column
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>>>()?;
    Ok(names.iter().any(|name| name == column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_current() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, SCHEMA_VERSION).unwrap();

        assert!(table_exists(&conn, "feelings").unwrap());
        assert!(table_exists(&conn, "schema_info").unwrap());
        assert!(column_exists(&conn, "feelings", "is_editing").unwrap());
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_init_schema_revision_one() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 1).unwrap();

        assert!(!column_exists(&conn, "feelings", "is_editing").unwrap());
        assert_eq!(get_schema_version(&conn).unwrap(), Some(1));
    }

    #[test]
    fn test_empty_database_has_no_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), None);
    }

    #[test]
    fn test_untracked_store_reads_as_revision_one() {
        let conn = Connection::open_in_memory().unwrap();
        create_feelings_table(&conn, FEELINGS_TABLE, 1).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), Some(1));
    }

    #[test]
    fn test_supported_versions() {
        assert!(!is_supported(0));
        assert!(is_supported(1));
        assert!(is_supported(2));
        assert!(!is_supported(3));
    }
}
