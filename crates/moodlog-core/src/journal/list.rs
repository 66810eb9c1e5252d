//! Journal list controller
//!
//! Holds the newest-first list of entries, kept current by a live
//! subscription that lasts exactly as long as the controller. Each entry is
//! either viewed or edited; the editing flag is stored on the record itself,
//! so re-sorting the list never loses track of which row is being edited.
//! Only one entry is edited at a time and it shares the single edit buffer.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use super::{non_empty, JournalError, ValidationError};
use crate::live::{LiveResults, SortKey};
use crate::models::Feeling;
use crate::storage::{StoreError, StoreResult};
use crate::store::Store;

/// State of the journal list screen
pub struct ListController<'s> {
    store: &'s Store,
    // Owns the subscription; dropping it detaches the listener
    results: LiveResults<'s>,
    entries: Rc<RefCell<Vec<Feeling>>>,
    notifications: Rc<Cell<usize>>,
    buffer: String,
}

impl<'s> ListController<'s> {
    /// Subscribe to the store and load the current entries
    ///
    /// An entry left in the editing state by an earlier session is resumed
    /// with its stored message in the buffer.
    pub fn mount(store: &'s Store) -> StoreResult<Self> {
        let results = store.objects().sorted(SortKey::Id, true);
        let entries = Rc::new(RefCell::new(Vec::new()));
        let notifications = Rc::new(Cell::new(0));

        let sink = Rc::clone(&entries);
        let counter = Rc::clone(&notifications);
        results.add_listener(move |snapshot, _| {
            *sink.borrow_mut() = snapshot.to_vec();
            counter.set(counter.get() + 1);
        })?;

        let buffer = entries
            .borrow()
            .iter()
            .find(|f| f.is_editing)
            .map(|f| f.message.clone())
            .unwrap_or_default();

        debug!("Mounted journal list with {} entries", entries.borrow().len());

        Ok(Self {
            store,
            results,
            entries,
            notifications,
            buffer,
        })
    }

    /// Detach from the store
    pub fn unmount(self) {
        debug!("Unmounted journal list");
    }

    /// Entries, newest first
    pub fn entries(&self) -> Vec<Feeling> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Entry with this key as last delivered
    pub fn entry(&self, id: i64) -> Option<Feeling> {
        self.entries.borrow().iter().find(|f| f.id == id).cloned()
    }

    /// The entry currently being edited
    pub fn editing(&self) -> Option<Feeling> {
        self.entries.borrow().iter().find(|f| f.is_editing).cloned()
    }

    /// Edit buffer
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Snapshots delivered so far, including the initial one
    pub fn notifications(&self) -> usize {
        self.notifications.get()
    }

    /// Number of listeners this controller holds on the store
    pub fn listener_count(&self) -> usize {
        self.results.listener_count()
    }

    /// Put an entry into the editing state
    ///
    /// Any other entry being edited goes back to viewing in the same
    /// transaction, abandoning its unsaved buffer. The buffer is seeded with
    /// the entry's message unless the entry was already being edited.
    pub fn begin_edit(&mut self, id: i64) -> Result<(), JournalError> {
        let already_editing = self.entry(id).is_some_and(|f| f.is_editing);

        let feeling = self.store.write(|txn| {
            if txn.object_for_key(id)?.is_none() {
                return Err(StoreError::NotFound(id));
            }
            let others: Vec<i64> = txn
                .objects()?
                .into_iter()
                .filter(|f| f.is_editing && f.id != id)
                .map(|f| f.id)
                .collect();
            for other in others {
                txn.update(other, |f| f.is_editing = false)?;
            }
            txn.update(id, |f| f.is_editing = true)
        })?;

        if !already_editing {
            self.buffer = feeling.message;
        }
        Ok(())
    }

    /// Replace the edit buffer; no transaction
    pub fn update_buffer(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Save the buffer into the entry and leave the editing state
    ///
    /// An empty buffer is rejected without touching the store: the entry
    /// stays in the editing state and the caller shows the prompt.
    pub fn submit_edit(&mut self, id: i64) -> Result<Feeling, JournalError> {
        let current = self
            .store
            .object_for_key(id)?
            .ok_or(StoreError::NotFound(id))?;
        if !current.is_editing {
            return Err(ValidationError::NotEditing(id).into());
        }
        let message = non_empty(&self.buffer)?.to_string();

        let saved = self.store.write(|txn| {
            txn.update(id, move |f| {
                f.message = message;
                f.is_editing = false;
            })
        })?;

        self.buffer.clear();
        Ok(saved)
    }

    /// Leave the editing state without saving
    pub fn cancel_edit(&mut self, id: i64) -> Result<(), JournalError> {
        self.store
            .write(|txn| txn.update(id, |f| f.is_editing = false))?;
        self.buffer.clear();
        Ok(())
    }

    /// Delete an entry by key; `false` if it no longer exists
    ///
    /// Deleting the entry being edited silently discards the buffer.
    pub fn delete_entry(&mut self, id: i64) -> Result<bool, JournalError> {
        let deleted = self
            .store
            .write(|txn| -> StoreResult<Option<Feeling>> {
                let Some(feeling) = txn.object_for_key(id)? else {
                    return Ok(None);
                };
                txn.delete(id)?;
                Ok(Some(feeling))
            })?;

        match deleted {
            Some(feeling) => {
                if feeling.is_editing {
                    self.buffer.clear();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::EntryController;
    use crate::models::Emoticon;
    use crate::storage::{migrate_feelings, SCHEMA_VERSION};
    use tempfile::TempDir;

    fn open_store(temp: &TempDir) -> Store {
        Store::open(temp.path().join("diary.db"), SCHEMA_VERSION, migrate_feelings).unwrap()
    }

    fn seed(store: &Store, feelings: &[(i64, &str)]) {
        store
            .write(|txn| {
                for (id, message) in feelings {
                    txn.create(Feeling::new(*id, "happy-outline", *message))?;
                }
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    fn ids(list: &ListController<'_>) -> Vec<i64> {
        list.entries().iter().map(|f| f.id).collect()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let mut list = ListController::mount(&store).unwrap();
        assert!(list.is_empty());

        seed(&store, &[(1000, "great day")]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.entries()[0].message, "great day");

        list.begin_edit(1000).unwrap();
        assert_eq!(list.buffer(), "great day");
        assert!(list.entry(1000).unwrap().is_editing);

        list.update_buffer("great day indeed");
        let saved = list.submit_edit(1000).unwrap();
        assert_eq!(saved.message, "great day indeed");
        assert_eq!(
            list.entries(),
            vec![Feeling {
                id: 1000,
                emoticon: "happy-outline".to_string(),
                message: "great day indeed".to_string(),
                is_editing: false,
            }]
        );
        assert_eq!(list.buffer(), "");

        assert!(list.delete_entry(1000).unwrap());
        assert!(list.is_empty());
        assert_eq!(store.object_for_key(1000).unwrap(), None);
    }

    #[test]
    fn test_empty_buffer_keeps_editing() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        seed(&store, &[(1, "original")]);
        let mut list = ListController::mount(&store).unwrap();

        list.begin_edit(1).unwrap();
        let before = list.notifications();
        list.update_buffer("   ");

        let err = list.submit_edit(1).unwrap_err();
        assert!(matches!(
            err,
            JournalError::Validation(ValidationError::EmptyMessage)
        ));
        assert_eq!(
            err.prompt(),
            Some("Please let me know your feelings today :)")
        );

        let stored = store.object_for_key(1).unwrap().unwrap();
        assert_eq!(stored.message, "original");
        assert!(stored.is_editing);
        assert_eq!(list.notifications(), before);
        assert_eq!(list.buffer(), "   ");
    }

    #[test]
    fn test_submit_keeps_message_as_typed() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        seed(&store, &[(1, "list")]);
        let mut list = ListController::mount(&store).unwrap();

        list.begin_edit(1).unwrap();
        list.update_buffer("  - item one\n");
        let saved = list.submit_edit(1).unwrap();

        assert_eq!(saved.message, "  - item one\n");
        assert_eq!(
            store.object_for_key(1).unwrap().unwrap().message,
            "  - item one\n"
        );
    }

    #[test]
    fn test_newest_first() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let list = ListController::mount(&store).unwrap();

        seed(&store, &[(10, "a"), (30, "c")]);
        seed(&store, &[(20, "b")]);
        assert_eq!(ids(&list), vec![30, 20, 10]);

        let mut entry = EntryController::new(&store);
        entry.select_emoticon(Emoticon::SadOutline);
        entry.update_message("later");
        let created = entry.submit().unwrap();
        assert_eq!(ids(&list)[0], created.id);
    }

    #[test]
    fn test_one_entry_edited_at_a_time() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        seed(&store, &[(1, "first"), (2, "second")]);
        let mut list = ListController::mount(&store).unwrap();

        list.begin_edit(1).unwrap();
        list.update_buffer("abandoned");
        list.begin_edit(2).unwrap();

        assert_eq!(list.editing().map(|f| f.id), Some(2));
        assert!(!list.entry(1).unwrap().is_editing);
        assert_eq!(list.entry(1).unwrap().message, "first");
        assert_eq!(list.buffer(), "second");
    }

    #[test]
    fn test_begin_edit_again_keeps_buffer() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        seed(&store, &[(1, "first")]);
        let mut list = ListController::mount(&store).unwrap();

        list.begin_edit(1).unwrap();
        list.update_buffer("in progress");
        list.begin_edit(1).unwrap();
        assert_eq!(list.buffer(), "in progress");
    }

    #[test]
    fn test_cancel_edit_keeps_message() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        seed(&store, &[(1, "first")]);
        let mut list = ListController::mount(&store).unwrap();

        list.begin_edit(1).unwrap();
        list.update_buffer("never saved");
        list.cancel_edit(1).unwrap();

        let entry = list.entry(1).unwrap();
        assert!(!entry.is_editing);
        assert_eq!(entry.message, "first");
        assert_eq!(list.buffer(), "");
    }

    #[test]
    fn test_delete_entry_being_edited() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        seed(&store, &[(1, "first"), (2, "second")]);
        let mut list = ListController::mount(&store).unwrap();

        list.begin_edit(2).unwrap();
        list.update_buffer("unsaved");
        assert!(list.delete_entry(2).unwrap());

        assert_eq!(ids(&list), vec![1]);
        assert_eq!(list.editing(), None);
        assert_eq!(list.buffer(), "");
    }

    #[test]
    fn test_delete_other_entry_keeps_edit() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        seed(&store, &[(1, "first"), (2, "second")]);
        let mut list = ListController::mount(&store).unwrap();

        list.begin_edit(2).unwrap();
        list.update_buffer("still typing");
        assert!(list.delete_entry(1).unwrap());

        assert_eq!(list.editing().map(|f| f.id), Some(2));
        assert_eq!(list.buffer(), "still typing");
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        seed(&store, &[(1, "first")]);
        let mut list = ListController::mount(&store).unwrap();
        let before = list.notifications();

        assert!(!list.delete_entry(99).unwrap());
        assert_eq!(ids(&list), vec![1]);
        assert_eq!(list.notifications(), before);
    }

    #[test]
    fn test_submit_requires_editing() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        seed(&store, &[(1, "first")]);
        let mut list = ListController::mount(&store).unwrap();
        list.update_buffer("text");

        let err = list.submit_edit(1).unwrap_err();
        assert!(matches!(
            err,
            JournalError::Validation(ValidationError::NotEditing(1))
        ));

        let err = list.begin_edit(42).unwrap_err();
        assert!(matches!(err, JournalError::Store(StoreError::NotFound(42))));
    }

    #[test]
    fn test_unmount_detaches_listener() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let list = ListController::mount(&store).unwrap();
        assert_eq!(list.listener_count(), 1);
        assert_eq!(store.listener_count(), 1);

        list.unmount();
        assert_eq!(store.listener_count(), 0);
        seed(&store, &[(1, "after unmount")]);
    }

    #[test]
    fn test_mount_resumes_stored_edit() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        seed(&store, &[(1, "half done")]);
        store
            .write(|txn| txn.update(1, |f| f.is_editing = true))
            .unwrap();

        let list = ListController::mount(&store).unwrap();
        assert_eq!(list.editing().map(|f| f.id), Some(1));
        assert_eq!(list.buffer(), "half done");
    }
}
