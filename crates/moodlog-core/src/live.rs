//! Live query results
//!
//! A [`LiveResults`] handle describes "all feelings, in some order". Listeners
//! registered on it fire once immediately with the current snapshot and then
//! once after every committed write transaction that changed at least one
//! feeling, always before `Store::write` returns.
//!
//! Listener lifetime is tied to the handle: dropping a `LiveResults` removes
//! every listener registered through it, so a controller that owns its handle
//! can never be notified after it is gone.

use std::collections::{BTreeMap, VecDeque};

use crate::models::Feeling;
use crate::storage::StoreResult;
use crate::store::Store;

/// Field a live result set can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Primary key, i.e. creation order
    Id,
    Emoticon,
    Message,
}

/// Ordering of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Sort {
    key: SortKey,
    descending: bool,
}

/// SQL `ORDER BY` clause for an optional sort
///
/// Unsorted results come back in key order. Ties on other fields fall back to
/// the key so the order is always total.
pub(crate) fn order_by(sort: Option<Sort>) -> &'static str {
    let Some(sort) = sort else {
        return "id ASC";
    };
    match (sort.key, sort.descending) {
        (SortKey::Id, false) => "id ASC",
        (SortKey::Id, true) => "id DESC",
        (SortKey::Emoticon, false) => "emoticon ASC, id ASC",
        (SortKey::Emoticon, true) => "emoticon DESC, id DESC",
        (SortKey::Message, false) => "message ASC, id ASC",
        (SortKey::Message, true) => "message DESC, id DESC",
    }
}

/// What a committed transaction did, by primary key
///
/// Changes are coalesced per transaction: a record created and then edited
/// in the same write is reported once, as an insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// True only for the immediate callback made on registration
    pub initial: bool,
    pub insertions: Vec<i64>,
    pub modifications: Vec<i64>,
    pub deletions: Vec<i64>,
}

impl ChangeSet {
    /// Change set delivered with the first snapshot
    pub fn initial() -> Self {
        Self {
            initial: true,
            ..Self::default()
        }
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        !self.initial
            && self.insertions.is_empty()
            && self.modifications.is_empty()
            && self.deletions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Inserted,
    Modified,
    Deleted,
}

/// Accumulates the changes made inside one write transaction
#[derive(Debug, Default)]
pub(crate) struct ChangeTracker {
    changes: BTreeMap<i64, Change>,
}

impl ChangeTracker {
    pub(crate) fn inserted(&mut self, id: i64) {
        let change = match self.changes.get(&id) {
            // deleted and recreated within the same transaction
            Some(Change::Deleted) => Change::Modified,
            _ => Change::Inserted,
        };
        self.changes.insert(id, change);
    }

    pub(crate) fn modified(&mut self, id: i64) {
        self.changes.entry(id).or_insert(Change::Modified);
    }

    pub(crate) fn deleted(&mut self, id: i64) {
        if self.changes.get(&id) == Some(&Change::Inserted) {
            self.changes.remove(&id);
        } else {
            self.changes.insert(id, Change::Deleted);
        }
    }

    /// Fold a committed change set in after the ones already recorded
    pub(crate) fn record(&mut self, set: ChangeSet) {
        for id in set.insertions {
            self.inserted(id);
        }
        for id in set.modifications {
            self.modified(id);
        }
        for id in set.deletions {
            self.deleted(id);
        }
    }

    pub(crate) fn into_change_set(self) -> ChangeSet {
        let mut set = ChangeSet::default();
        for (id, change) in self.changes {
            match change {
                Change::Inserted => set.insertions.push(id),
                Change::Modified => set.modifications.push(id),
                Change::Deleted => set.deletions.push(id),
            }
        }
        set
    }
}

/// Identifies a listener within its store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback = Box<dyn FnMut(&[Feeling], &ChangeSet)>;

pub(crate) struct Listener {
    id: ListenerId,
    callback: Callback,
}

/// Listeners of one handle, lifted out of the registry while they run
pub(crate) struct TakenHandle {
    handle: u64,
    pub(crate) sort: Option<Sort>,
    listeners: Vec<Listener>,
}

impl TakenHandle {
    pub(crate) fn has_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub(crate) fn call(&mut self, snapshot: &[Feeling], changes: &ChangeSet) {
        for listener in &mut self.listeners {
            (listener.callback)(snapshot, changes);
        }
    }
}

#[derive(Default)]
struct HandleEntry {
    sort: Option<Sort>,
    listeners: Vec<Listener>,
    // Bookkeeping for removals made by callbacks while their listeners are lifted out
    cleared: bool,
    removed: Vec<ListenerId>,
}

/// Every live handle of a store and its listeners
///
/// Callbacks never run while the registry is borrowed: the store lifts the
/// listeners out, runs them, then puts them back, which lets a callback add
/// or remove listeners and even start another write.
#[derive(Default)]
pub(crate) struct Registry {
    next_handle: u64,
    next_listener: u64,
    handles: BTreeMap<u64, HandleEntry>,
    pending: VecDeque<ChangeSet>,
    // Changes whose dispatch failed, delivered with the next one
    backlog: Option<ChangeTracker>,
    dispatching: bool,
}

impl Registry {
    fn register(&mut self, sort: Option<Sort>) -> u64 {
        self.next_handle += 1;
        self.handles.insert(
            self.next_handle,
            HandleEntry {
                sort,
                ..HandleEntry::default()
            },
        );
        self.next_handle
    }

    fn unregister(&mut self, handle: u64) {
        self.handles.remove(&handle);
    }

    fn set_sort(&mut self, handle: u64, sort: Option<Sort>) {
        if let Some(entry) = self.handles.get_mut(&handle) {
            entry.sort = sort;
        }
    }

    fn add_listener(&mut self, handle: u64, callback: Callback) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        if let Some(entry) = self.handles.get_mut(&handle) {
            entry.listeners.push(Listener { id, callback });
        }
        id
    }

    fn remove_listener(&mut self, handle: u64, id: ListenerId) -> bool {
        let dispatching = self.dispatching;
        let Some(entry) = self.handles.get_mut(&handle) else {
            return false;
        };
        let before = entry.listeners.len();
        entry.listeners.retain(|listener| listener.id != id);
        if entry.listeners.len() != before {
            return true;
        }
        if dispatching {
            entry.removed.push(id);
            return true;
        }
        false
    }

    fn remove_all_listeners(&mut self, handle: u64) {
        let dispatching = self.dispatching;
        if let Some(entry) = self.handles.get_mut(&handle) {
            entry.listeners.clear();
            entry.cleared = dispatching;
        }
    }

    fn listener_count(&self, handle: u64) -> usize {
        self.handles
            .get(&handle)
            .map_or(0, |entry| entry.listeners.len())
    }

    /// Total listeners across every handle
    pub(crate) fn total_listeners(&self) -> usize {
        self.handles.values().map(|entry| entry.listeners.len()).sum()
    }

    /// Queue a change set; returns true if the caller should drain the queue
    pub(crate) fn enqueue(&mut self, changes: ChangeSet) -> bool {
        self.pending.push_back(changes);
        if self.dispatching {
            false
        } else {
            self.dispatching = true;
            true
        }
    }

    pub(crate) fn next_pending(&mut self) -> Option<ChangeSet> {
        loop {
            let next = self.pending.pop_front()?;
            let Some(mut backlog) = self.backlog.take() else {
                return Some(next);
            };
            backlog.record(next);
            let merged = backlog.into_change_set();
            if !merged.is_empty() {
                return Some(merged);
            }
        }
    }

    /// End a dispatch round
    ///
    /// `undelivered` is the change set whose snapshot could not be read. It
    /// and everything still queued behind it are kept, coalesced, and go out
    /// together with the next committed write.
    pub(crate) fn finish_dispatch(&mut self, undelivered: Option<ChangeSet>) {
        self.dispatching = false;
        if let Some(changes) = undelivered {
            let mut backlog = self.backlog.take().unwrap_or_default();
            backlog.record(changes);
            for queued in self.pending.drain(..) {
                backlog.record(queued);
            }
            self.backlog = Some(backlog);
        }
    }

    pub(crate) fn take_listeners(&mut self) -> Vec<TakenHandle> {
        self.handles
            .iter_mut()
            .map(|(handle, entry)| TakenHandle {
                handle: *handle,
                sort: entry.sort,
                listeners: std::mem::take(&mut entry.listeners),
            })
            .collect()
    }

    pub(crate) fn restore_listeners(&mut self, taken: Vec<TakenHandle>) {
        for mut taken in taken {
            // Handle dropped while its listeners ran
            let Some(entry) = self.handles.get_mut(&taken.handle) else {
                continue;
            };
            if !entry.cleared {
                let removed = std::mem::take(&mut entry.removed);
                taken
                    .listeners
                    .retain(|listener| !removed.contains(&listener.id));
                taken.listeners.append(&mut entry.listeners);
                entry.listeners = taken.listeners;
            }
            entry.cleared = false;
            entry.removed.clear();
        }
    }
}

/// Live view over every feeling in a store
///
/// Created by [`Store::objects`]. The handle reads lazily: nothing is copied
/// until [`snapshot`](LiveResults::snapshot) is called or a listener fires.
pub struct LiveResults<'s> {
    store: &'s Store,
    handle: u64,
    sort: Option<Sort>,
}

impl<'s> LiveResults<'s> {
    pub(crate) fn new(store: &'s Store) -> Self {
        let handle = store.registry.borrow_mut().register(None);
        Self {
            store,
            handle,
            sort: None,
        }
    }

    /// Order this result set by `key`
    pub fn sorted(mut self, key: SortKey, descending: bool) -> Self {
        self.sort = Some(Sort { key, descending });
        self.store
            .registry
            .borrow_mut()
            .set_sort(self.handle, self.sort);
        self
    }

    /// Current contents in this handle's order
    pub fn snapshot(&self) -> StoreResult<Vec<Feeling>> {
        self.store.read_all(self.sort)
    }

    /// Number of feelings currently stored
    pub fn len(&self) -> StoreResult<usize> {
        self.store.count()
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Register a callback
    ///
    /// The callback runs once right away with the current snapshot and an
    /// initial change set, then after every commit that changed a feeling.
    /// Writes made from inside that first call are not reported back to the
    /// same callback.
    pub fn add_listener<F>(&self, mut callback: F) -> StoreResult<ListenerId>
    where
        F: FnMut(&[Feeling], &ChangeSet) + 'static,
    {
        let snapshot = self.snapshot()?;
        callback(&snapshot, &ChangeSet::initial());
        Ok(self
            .store
            .registry
            .borrow_mut()
            .add_listener(self.handle, Box::new(callback)))
    }

    /// Detach one listener; false if it was not registered here
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.store
            .registry
            .borrow_mut()
            .remove_listener(self.handle, id)
    }

    /// Detach every listener registered through this handle
    pub fn remove_all_listeners(&self) {
        self.store
            .registry
            .borrow_mut()
            .remove_all_listeners(self.handle);
    }

    pub fn listener_count(&self) -> usize {
        self.store.registry.borrow().listener_count(self.handle)
    }
}

impl Drop for LiveResults<'_> {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.store.registry.try_borrow_mut() {
            registry.unregister(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_coalesces_insert_and_modify() {
        let mut tracker = ChangeTracker::default();
        tracker.inserted(1);
        tracker.modified(1);
        tracker.modified(2);
        tracker.modified(2);

        let set = tracker.into_change_set();
        assert_eq!(set.insertions, vec![1]);
        assert_eq!(set.modifications, vec![2]);
        assert!(set.deletions.is_empty());
    }

    #[test]
    fn test_tracker_insert_then_delete_is_nothing() {
        let mut tracker = ChangeTracker::default();
        tracker.inserted(1);
        tracker.deleted(1);

        assert!(tracker.into_change_set().is_empty());
    }

    #[test]
    fn test_tracker_modify_then_delete_is_deletion() {
        let mut tracker = ChangeTracker::default();
        tracker.modified(4);
        tracker.deleted(4);
        tracker.deleted(5);
        tracker.inserted(5);

        let set = tracker.into_change_set();
        assert_eq!(set.deletions, vec![4]);
        assert_eq!(set.modifications, vec![5]);
    }

    #[test]
    fn test_initial_change_set_is_not_empty() {
        assert!(!ChangeSet::initial().is_empty());
        assert!(ChangeSet::default().is_empty());
    }

    #[test]
    fn test_order_by_clauses() {
        assert_eq!(order_by(None), "id ASC");
        assert_eq!(
            order_by(Some(Sort {
                key: SortKey::Id,
                descending: true
            })),
            "id DESC"
        );
        assert_eq!(
            order_by(Some(Sort {
                key: SortKey::Message,
                descending: false
            })),
            "message ASC, id ASC"
        );
    }

    #[test]
    fn test_registry_restores_listeners_added_during_dispatch() {
        let mut registry = Registry::default();
        let handle = registry.register(None);
        let first = registry.add_listener(handle, Box::new(|_, _| {}));

        assert!(registry.enqueue(ChangeSet::default()));
        let taken = registry.take_listeners();
        assert_eq!(registry.listener_count(handle), 0);

        let second = registry.add_listener(handle, Box::new(|_, _| {}));
        assert!(registry.remove_listener(handle, first));
        registry.restore_listeners(taken);
        registry.finish_dispatch(None);

        assert_eq!(registry.listener_count(handle), 1);
        assert!(registry.remove_listener(handle, second));
        assert!(!registry.remove_listener(handle, second));
    }

    #[test]
    fn test_registry_clear_during_dispatch_drops_taken() {
        let mut registry = Registry::default();
        let handle = registry.register(None);
        registry.add_listener(handle, Box::new(|_, _| {}));

        registry.enqueue(ChangeSet::default());
        let taken = registry.take_listeners();
        registry.remove_all_listeners(handle);
        registry.restore_listeners(taken);
        registry.finish_dispatch(None);

        assert_eq!(registry.total_listeners(), 0);
    }

    #[test]
    fn test_nested_enqueue_defers_to_outer_dispatch() {
        let mut registry = Registry::default();
        assert!(registry.enqueue(ChangeSet::default()));
        assert!(!registry.enqueue(ChangeSet::default()));
        assert!(registry.next_pending().is_some());
        assert!(registry.next_pending().is_some());
        assert!(registry.next_pending().is_none());
        registry.finish_dispatch(None);
        assert!(registry.enqueue(ChangeSet::default()));
    }

    fn set(insertions: &[i64], modifications: &[i64], deletions: &[i64]) -> ChangeSet {
        ChangeSet {
            initial: false,
            insertions: insertions.to_vec(),
            modifications: modifications.to_vec(),
            deletions: deletions.to_vec(),
        }
    }

    #[test]
    fn test_undelivered_changes_go_out_with_next_write() {
        let mut registry = Registry::default();

        assert!(registry.enqueue(set(&[1], &[], &[])));
        assert!(!registry.enqueue(set(&[2], &[], &[3])));
        let failed = registry.next_pending().unwrap();
        registry.finish_dispatch(Some(failed));
        assert!(registry.next_pending().is_none());

        assert!(registry.enqueue(set(&[], &[1], &[2])));
        assert_eq!(registry.next_pending(), Some(set(&[1], &[], &[3])));
        assert!(registry.next_pending().is_none());
        registry.finish_dispatch(None);

        assert!(registry.enqueue(set(&[4], &[], &[])));
        assert_eq!(registry.next_pending(), Some(set(&[4], &[], &[])));
    }

    #[test]
    fn test_backlog_that_cancels_out_is_skipped() {
        let mut registry = Registry::default();

        assert!(registry.enqueue(set(&[7], &[], &[])));
        let failed = registry.next_pending().unwrap();
        registry.finish_dispatch(Some(failed));

        assert!(registry.enqueue(set(&[], &[], &[7])));
        assert!(!registry.enqueue(set(&[8], &[], &[])));
        assert_eq!(registry.next_pending(), Some(set(&[8], &[], &[])));
    }
}
