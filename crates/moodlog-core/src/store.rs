//! Unified storage interface
//!
//! The `Store` owns the SQLite connection for one journal file and is the
//! only way to read or change feelings:
//! - Reads go through [`Store::object_for_key`] or a [`LiveResults`] handle
//! - Every mutation runs inside [`Store::write`], which commits or rolls back
//!   as a unit and then notifies live listeners once
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open_with_config(&config)?;
//!
//! store.write(|txn| {
//!     let id = txn.next_key();
//!     txn.create(Feeling::new(id, "happy-outline", "great day"))
//! })?;
//!
//! let newest_first = store.objects().sorted(SortKey::Id, true).snapshot()?;
//! ```
//!
//! A store is used from a single thread. Listener callbacks run on that
//! thread, synchronously, before `write` returns.

use std::cell::{Ref, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, Transaction};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::live::{order_by, ChangeSet, ChangeTracker, LiveResults, Registry, Sort};
use crate::models::Feeling;
use crate::storage::migration::run_migration;
use crate::storage::schema::{get_schema_version, init_schema, is_supported, FEELINGS_TABLE};
use crate::storage::{
    migrate_feelings, queries, KeyGenerator, NewView, OldView, StoreError, StoreResult,
    SCHEMA_VERSION,
};

/// Handle to an open journal store
pub struct Store {
    conn: RefCell<Connection>,
    path: PathBuf,
    /// Revision the store was opened at
    version: u32,
    keys: RefCell<KeyGenerator>,
    pub(crate) registry: RefCell<Registry>,
}

impl Store {
    /// Open the store described by `config` at the current schema revision
    ///
    /// Older stores are upgraded with [`migrate_feelings`].
    pub fn open_with_config(config: &Config) -> StoreResult<Self> {
        Self::open(config.store_path(), SCHEMA_VERSION, migrate_feelings)
    }

    /// Open or create the store at `path`
    ///
    /// - No store yet: one is created at `schema_version`
    /// - Stored revision below `schema_version`: `migration` runs once in a
    ///   single transaction; on failure the store is left untouched and
    ///   `MigrationFailure` is returned
    /// - Stored revision at or above `schema_version`: opened as is, the
    ///   migration is not called
    pub fn open<M>(path: impl AsRef<Path>, schema_version: u32, migration: M) -> StoreResult<Self>
    where
        M: FnOnce(&OldView<'_>, &mut NewView<'_>) -> StoreResult<()>,
    {
        if !is_supported(schema_version) {
            return Err(StoreError::UnsupportedVersion(schema_version));
        }

        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::unavailable_io(path.clone(), e))?;
        }

        let mut conn =
            Connection::open(&path).map_err(|e| StoreError::unavailable_db(path.clone(), e))?;
        // SQLite opens lazily; the first read is where a bad file shows up
        let stored =
            get_schema_version(&conn).map_err(|e| StoreError::unavailable_db(path.clone(), e))?;

        let version = match stored {
            None => {
                init_schema(&conn, schema_version)?;
                info!(
                    "Created journal store at {:?} (schema {})",
                    path, schema_version
                );
                schema_version
            }
            Some(stored) if !is_supported(stored) => {
                return Err(StoreError::UnsupportedVersion(stored));
            }
            Some(stored) if stored >= schema_version => {
                debug!("Opened journal store at {:?} (schema {})", path, stored);
                stored
            }
            Some(stored) => {
                run_migration(&mut conn, stored, schema_version, migration)?;
                info!(
                    "Migrated journal store at {:?} to schema {}",
                    path, schema_version
                );
                schema_version
            }
        };

        let last_key = queries::max_key(&conn, FEELINGS_TABLE)?.unwrap_or(0);

        Ok(Self {
            conn: RefCell::new(conn),
            path,
            version,
            keys: RefCell::new(KeyGenerator::seeded(last_key)),
            registry: RefCell::new(Registry::default()),
        })
    }

    /// Close the underlying connection
    pub fn close(self) -> StoreResult<()> {
        self.conn
            .into_inner()
            .close()
            .map_err(|(_, e)| StoreError::from(e))
    }

    /// Location of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema revision in effect
    pub fn schema_version(&self) -> u32 {
        self.version
    }

    /// Record with this key, if any
    pub fn object_for_key(&self, id: i64) -> StoreResult<Option<Feeling>> {
        let conn = self.read_conn()?;
        queries::get(&conn, FEELINGS_TABLE, self.version, id)
    }

    /// Live view over every feeling
    pub fn objects(&self) -> LiveResults<'_> {
        LiveResults::new(self)
    }

    /// Number of feelings stored
    pub fn count(&self) -> StoreResult<usize> {
        let conn = self.read_conn()?;
        queries::count(&conn, FEELINGS_TABLE)
    }

    /// Issue a fresh primary key
    pub fn next_key(&self) -> i64 {
        self.keys.borrow_mut().next_key()
    }

    /// Move key generation past every stored key
    ///
    /// Needed when another connection wrote to the same file.
    pub fn resync_keys(&self) -> StoreResult<()> {
        let max = {
            let conn = self.read_conn()?;
            queries::max_key(&conn, FEELINGS_TABLE)?
        };
        if let Some(max) = max {
            self.keys.borrow_mut().observe(max);
        }
        Ok(())
    }

    /// Listeners currently registered across all live handles
    pub fn listener_count(&self) -> usize {
        self.registry.borrow().total_listeners()
    }

    /// Run `body` inside a write transaction
    ///
    /// The transaction commits if `body` returns `Ok` and rolls back
    /// otherwise. After a commit that changed anything, every live listener
    /// is called once with the new state before this returns. Starting a
    /// write from inside `body` fails with `TransactionInProgress`.
    pub fn write<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let (value, changes) = {
            let mut conn = self
                .conn
                .try_borrow_mut()
                .map_err(|_| StoreError::TransactionInProgress)?;
            let tx = conn.transaction().map_err(StoreError::from)?;

            let mut txn = WriteTxn {
                tx,
                version: self.version,
                keys: &self.keys,
                changes: ChangeTracker::default(),
            };

            let value = match body(&mut txn) {
                Ok(value) => value,
                Err(err) => {
                    // Dropping the transaction rolls it back
                    warn!("Write transaction rolled back");
                    return Err(err);
                }
            };

            let WriteTxn { tx, changes, .. } = txn;
            tx.commit().map_err(StoreError::from)?;
            (value, changes.into_change_set())
        };

        if !changes.is_empty() {
            debug!(
                "Committed write: {} inserted, {} modified, {} deleted",
                changes.insertions.len(),
                changes.modifications.len(),
                changes.deletions.len()
            );
            self.notify(changes);
        }

        Ok(value)
    }

    /// Snapshot in the given order
    pub(crate) fn read_all(&self, sort: Option<Sort>) -> StoreResult<Vec<Feeling>> {
        let conn = self.read_conn()?;
        queries::all(&conn, FEELINGS_TABLE, self.version, order_by(sort))
    }

    fn read_conn(&self) -> StoreResult<Ref<'_, Connection>> {
        self.conn
            .try_borrow()
            .map_err(|_| StoreError::TransactionInProgress)
    }

    /// Deliver a committed change set to every listener
    ///
    /// A write started by a listener lands here while a dispatch is already
    /// running; its change set is queued and delivered by the outer loop once
    /// the current round finishes.
    fn notify(&self, changes: ChangeSet) {
        if !self.registry.borrow_mut().enqueue(changes) {
            return;
        }

        let undelivered = match self.drain_notifications() {
            Ok(()) => None,
            Err((e, changes)) => {
                error!(
                    "Failed to refresh live results, holding changes for the next write: {}",
                    e
                );
                Some(changes)
            }
        };
        self.registry.borrow_mut().finish_dispatch(undelivered);
    }

    /// Deliver queued change sets until none are left
    ///
    /// On a failed snapshot read, returns the change set that could not be
    /// delivered.
    fn drain_notifications(&self) -> Result<(), (StoreError, ChangeSet)> {
        loop {
            let next = self.registry.borrow_mut().next_pending();
            let Some(changes) = next else {
                return Ok(());
            };

            let mut taken = self.registry.borrow_mut().take_listeners();

            // Read every snapshot before any callback can write again
            let mut snapshots: Vec<(Option<Sort>, Vec<Feeling>)> = Vec::new();
            let mut read_error = None;
            for handle in taken.iter().filter(|h| h.has_listeners()) {
                if snapshots.iter().any(|(sort, _)| *sort == handle.sort) {
                    continue;
                }
                match self.read_all(handle.sort) {
                    Ok(snapshot) => snapshots.push((handle.sort, snapshot)),
                    Err(e) => {
                        read_error = Some(e);
                        break;
                    }
                }
            }

            if read_error.is_none() {
                for handle in taken.iter_mut().filter(|h| h.has_listeners()) {
                    if let Some((_, snapshot)) =
                        snapshots.iter().find(|(sort, _)| *sort == handle.sort)
                    {
                        handle.call(snapshot, &changes);
                    }
                }
            }

            self.registry.borrow_mut().restore_listeners(taken);
            if let Some(e) = read_error {
                return Err((e, changes));
            }
        }
    }
}

/// An open write transaction
///
/// Reads made through the transaction see its own uncommitted writes.
pub struct WriteTxn<'c> {
    tx: Transaction<'c>,
    version: u32,
    keys: &'c RefCell<KeyGenerator>,
    changes: ChangeTracker,
}

impl WriteTxn<'_> {
    /// Schema revision of the store
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Issue a fresh primary key
    pub fn next_key(&mut self) -> i64 {
        self.keys.borrow_mut().next_key()
    }

    /// Insert a new feeling; fails with `DuplicateKey` if its key is taken
    pub fn create(&mut self, feeling: Feeling) -> StoreResult<Feeling> {
        queries::insert(&self.tx, FEELINGS_TABLE, self.version, &feeling)?;
        self.keys.borrow_mut().observe(feeling.id);
        self.changes.inserted(feeling.id);
        Ok(feeling)
    }

    pub fn object_for_key(&self, id: i64) -> StoreResult<Option<Feeling>> {
        queries::get(&self.tx, FEELINGS_TABLE, self.version, id)
    }

    /// Every feeling as this transaction sees it, in key order
    pub fn objects(&self) -> StoreResult<Vec<Feeling>> {
        queries::all(&self.tx, FEELINGS_TABLE, self.version, order_by(None))
    }

    /// Modify the feeling with key `id` in place
    ///
    /// The key itself cannot be changed. Nothing is recorded when `edit`
    /// leaves the record as it was.
    pub fn update<F>(&mut self, id: i64, edit: F) -> StoreResult<Feeling>
    where
        F: FnOnce(&mut Feeling),
    {
        let current = self
            .object_for_key(id)?
            .ok_or(StoreError::NotFound(id))?;

        let mut updated = current.clone();
        edit(&mut updated);
        updated.id = id;

        if updated != current {
            queries::update(&self.tx, FEELINGS_TABLE, self.version, &updated)?;
            self.changes.modified(id);
        }
        Ok(updated)
    }

    /// Remove the feeling with key `id`; `false` if there was none
    pub fn delete(&mut self, id: i64) -> StoreResult<bool> {
        let deleted = queries::delete(&self.tx, FEELINGS_TABLE, id)?;
        if deleted {
            self.changes.deleted(id);
        }
        Ok(deleted)
    }

    /// Error that rolls the transaction back when returned from the body
    pub fn abort(&self, reason: impl Into<String>) -> StoreError {
        StoreError::Aborted(reason.into())
    }
}
