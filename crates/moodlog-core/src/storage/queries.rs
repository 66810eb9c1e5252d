//! Row-level SQL shared by the store, write transactions and migrations
//!
//! Every function takes the table name and schema revision so the same
//! code serves the live table and the tables seen during a migration.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::models::Feeling;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::schema::feeling_columns;

/// Hydrate a feeling from a row selected with [`feeling_columns`]
fn feeling_from_row(row: &Row<'_>) -> rusqlite::Result<Feeling> {
    Ok(Feeling {
        id: row.get(0)?,
        emoticon: row.get(1)?,
        message: row.get(2)?,
        is_editing: row.get::<_, i64>(3)? != 0,
    })
}

/// Point lookup by primary key
pub fn get(conn: &Connection, table: &str, version: u32, id: i64) -> StoreResult<Option<Feeling>> {
    let sql = format!(
        "SELECT {} FROM {table} WHERE id = ?",
        feeling_columns(version)
    );
    let feeling = conn
        .query_row(&sql, params![id], feeling_from_row)
        .optional()?;
    Ok(feeling)
}

/// Every row, in the given order
///
/// `order_by` is a fixed clause such as `id DESC`, never user input.
pub fn all(conn: &Connection, table: &str, version: u32, order_by: &str) -> StoreResult<Vec<Feeling>> {
    let sql = format!(
        "SELECT {} FROM {table} ORDER BY {order_by}",
        feeling_columns(version)
    );
    let mut stmt = conn.prepare(&sql)?;
    let feelings = stmt
        .query_map([], feeling_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(feelings)
}

/// Insert a new row, failing with `DuplicateKey` if the key is taken
pub fn insert(conn: &Connection, table: &str, version: u32, feeling: &Feeling) -> StoreResult<()> {
    if get(conn, table, version, feeling.id)?.is_some() {
        return Err(StoreError::DuplicateKey(feeling.id));
    }

    let result = if version >= 2 {
        conn.execute(
            &format!(
                "INSERT INTO {table} (id, emoticon, message, is_editing) VALUES (?1, ?2, ?3, ?4)"
            ),
            params![feeling.id, feeling.emoticon, feeling.message, feeling.is_editing],
        )
    } else {
        if feeling.is_editing {
            return Err(StoreError::UnsupportedField {
                field: "is_editing",
                version,
            });
        }
        conn.execute(
            &format!("INSERT INTO {table} (id, emoticon, message) VALUES (?1, ?2, ?3)"),
            params![feeling.id, feeling.emoticon, feeling.message],
        )
    };

    result.map_err(|err| map_unique_constraint(err, feeling.id))?;
    Ok(())
}

/// Overwrite every field of an existing row
///
/// Returns `false` if no row has the key.
pub fn update(conn: &Connection, table: &str, version: u32, feeling: &Feeling) -> StoreResult<bool> {
    let updated = if version >= 2 {
        conn.execute(
            &format!("UPDATE {table} SET emoticon = ?1, message = ?2, is_editing = ?3 WHERE id = ?4"),
            params![feeling.emoticon, feeling.message, feeling.is_editing, feeling.id],
        )?
    } else {
        if feeling.is_editing {
            return Err(StoreError::UnsupportedField {
                field: "is_editing",
                version,
            });
        }
        conn.execute(
            &format!("UPDATE {table} SET emoticon = ?1, message = ?2 WHERE id = ?3"),
            params![feeling.emoticon, feeling.message, feeling.id],
        )?
    };
    Ok(updated > 0)
}

/// Remove a row; `false` if nothing had the key
pub fn delete(conn: &Connection, table: &str, id: i64) -> StoreResult<bool> {
    let deleted = conn.execute(&format!("DELETE FROM {table} WHERE id = ?"), params![id])?;
    Ok(deleted > 0)
}

/// Number of rows
pub fn count(conn: &Connection, table: &str) -> StoreResult<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(count as usize)
}

/// Largest key, if any row exists
pub fn max_key(conn: &Connection, table: &str) -> StoreResult<Option<i64>> {
    let max: Option<i64> =
        conn.query_row(&format!("SELECT MAX(id) FROM {table}"), [], |row| row.get(0))?;
    Ok(max)
}

/// Turn a primary key constraint violation into `DuplicateKey`
fn map_unique_constraint(err: rusqlite::Error, id: i64) -> StoreError {
    if matches!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation)) {
        StoreError::DuplicateKey(id)
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::init_schema;

    fn conn_at(version: u32) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, version).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_get() {
        let conn = conn_at(2);
        let feeling = Feeling::new(1000, "happy-outline", "great day");
        insert(&conn, "feelings", 2, &feeling).unwrap();

        assert_eq!(get(&conn, "feelings", 2, 1000).unwrap(), Some(feeling));
        assert_eq!(get(&conn, "feelings", 2, 1).unwrap(), None);
    }

    #[test]
    fn test_duplicate_key() {
        let conn = conn_at(2);
        insert(&conn, "feelings", 2, &Feeling::new(1, "x", "y")).unwrap();

        let err = insert(&conn, "feelings", 2, &Feeling::new(1, "a", "b")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(1)));
        assert_eq!(get(&conn, "feelings", 2, 1).unwrap().unwrap().message, "y");
    }

    #[test]
    fn test_all_respects_order() {
        let conn = conn_at(2);
        for id in [2, 3, 1] {
            insert(&conn, "feelings", 2, &Feeling::new(id, "x", "y")).unwrap();
        }

        let ids: Vec<i64> = all(&conn, "feelings", 2, "id DESC")
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(max_key(&conn, "feelings").unwrap(), Some(3));
        assert_eq!(count(&conn, "feelings").unwrap(), 3);
    }

    #[test]
    fn test_revision_one_rejects_editing_flag() {
        let conn = conn_at(1);
        let mut feeling = Feeling::new(1, "x", "y");
        insert(&conn, "feelings", 1, &feeling).unwrap();
        assert!(!get(&conn, "feelings", 1, 1).unwrap().unwrap().is_editing);

        feeling.is_editing = true;
        let err = update(&conn, "feelings", 1, &feeling).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedField { version: 1, .. }));
    }

    #[test]
    fn test_update_and_delete_missing() {
        let conn = conn_at(2);
        assert!(!update(&conn, "feelings", 2, &Feeling::new(9, "x", "y")).unwrap());
        assert!(!delete(&conn, "feelings", 9).unwrap());
        assert_eq!(max_key(&conn, "feelings").unwrap(), None);
    }
}
