//! Schema migration
//!
//! When a store is opened with a target revision above the stored one, the
//! migration runs once inside a single SQLite transaction:
//!
//! 1. The existing table is renamed to `feelings_previous`
//! 2. A fresh `feelings` table is created in the target layout
//! 3. The migration callback copies records from the old view to the new one
//! 4. The old table is dropped and the new revision recorded
//!
//! Any failure rolls the whole transaction back, leaving the store exactly as
//! it was before the open.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::models::Feeling;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::queries;
use crate::storage::schema::{
    create_feelings_table, ensure_info_table, set_schema_version, FEELINGS_TABLE,
    PREVIOUS_FEELINGS_TABLE,
};

/// Read-only view of the records as they were before the migration
pub struct OldView<'a> {
    conn: &'a Connection,
    version: u32,
}

impl<'a> OldView<'a> {
    /// Schema revision of the old records
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Every old record, in key order
    pub fn records(&self) -> StoreResult<Vec<Feeling>> {
        queries::all(self.conn, PREVIOUS_FEELINGS_TABLE, self.version, "id ASC")
    }

    /// Old record with this key
    pub fn object_for_key(&self, id: i64) -> StoreResult<Option<Feeling>> {
        queries::get(self.conn, PREVIOUS_FEELINGS_TABLE, self.version, id)
    }
}

/// Writable view of the store in its new layout
pub struct NewView<'a> {
    conn: &'a Connection,
    version: u32,
}

impl<'a> NewView<'a> {
    /// Target schema revision
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Record with this key in the new layout
    pub fn object_for_key(&self, id: i64) -> StoreResult<Option<Feeling>> {
        queries::get(self.conn, FEELINGS_TABLE, self.version, id)
    }

    /// Insert a record; fails with `DuplicateKey` if the key is taken
    pub fn create(&mut self, feeling: &Feeling) -> StoreResult<()> {
        queries::insert(self.conn, FEELINGS_TABLE, self.version, feeling)
    }

    /// Overwrite the record with the same key
    pub fn update(&mut self, feeling: &Feeling) -> StoreResult<()> {
        if queries::update(self.conn, FEELINGS_TABLE, self.version, feeling)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(feeling.id))
        }
    }

    /// Every record written so far, in key order
    pub fn records(&self) -> StoreResult<Vec<Feeling>> {
        queries::all(self.conn, FEELINGS_TABLE, self.version, "id ASC")
    }
}

/// Standard migration for the feelings table
///
/// Each old record is paired with its new counterpart by primary key: the
/// new record is looked up by the old key and either created or
/// overwritten, carrying `id`, `emoticon` and `message` across with
/// `is_editing` reset to `false`.
pub fn migrate_feelings(old: &OldView<'_>, new: &mut NewView<'_>) -> StoreResult<()> {
    let records = old.records()?;
    debug!(
        "Migrating {} feelings from revision {} to {}",
        records.len(),
        old.version(),
        new.version()
    );

    for record in records {
        let migrated = Feeling {
            is_editing: false,
            ..record
        };
        match new.object_for_key(migrated.id)? {
            Some(_) => new.update(&migrated)?,
            None => new.create(&migrated)?,
        }
    }

    Ok(())
}

/// Migrate `conn` from revision `from` to `to` in one transaction
pub(crate) fn run_migration<M>(
    conn: &mut Connection,
    from: u32,
    to: u32,
    migration: M,
) -> StoreResult<()>
where
    M: FnOnce(&OldView<'_>, &mut NewView<'_>) -> StoreResult<()>,
{
    info!("Migrating journal store from schema {} to {}", from, to);

    let result = (|| -> StoreResult<()> {
        let tx = conn.transaction()?;

        ensure_info_table(&tx)?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {PREVIOUS_FEELINGS_TABLE};
             ALTER TABLE {FEELINGS_TABLE} RENAME TO {PREVIOUS_FEELINGS_TABLE};"
        ))?;
        create_feelings_table(&tx, FEELINGS_TABLE, to)?;

        {
            let old = OldView {
                conn: &tx,
                version: from,
            };
            let mut new = NewView {
                conn: &tx,
                version: to,
            };
            migration(&old, &mut new)?;
        }

        tx.execute_batch(&format!("DROP TABLE {PREVIOUS_FEELINGS_TABLE};"))?;
        set_schema_version(&tx, to)?;
        tx.commit()?;
        Ok(())
    })();

    result.map_err(|source| StoreError::MigrationFailure {
        from,
        to,
        source: Box::new(source),
    })
}
