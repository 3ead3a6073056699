//! Per-user cache entries and the concurrent table that owns them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};

/// Cached balance of one user, guarded by that user's lock.
///
/// The slot is `None` until the balance has been loaded from the ledger or
/// overwritten by a set. Holding the guard across a ledger call is what
/// serializes every mutation for the user.
#[derive(Debug, Default)]
pub(crate) struct CreditCacheEntry {
    slot: Mutex<Option<u64>>,
}

impl CreditCacheEntry {
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<u64>> {
        self.slot.lock().await
    }

    /// Non-blocking read used for snapshots; `None` if uninitialized or busy.
    pub(crate) fn try_peek(&self) -> Option<u64> {
        self.slot.try_lock().ok().and_then(|slot| *slot)
    }
}

/// Sharded map from user id to entry.
///
/// Entries are created at most once per user id and live until evicted. An
/// entry still referenced by an in-flight operation is never evicted, so a
/// user can never have two live locks.
#[derive(Debug, Default)]
pub(crate) struct EntryTable {
    entries: DashMap<String, Arc<CreditCacheEntry>>,
}

impl EntryTable {
    /// Return the entry for `user_id`, creating it atomically if absent.
    pub(crate) fn get_or_insert(&self, user_id: &str) -> Arc<CreditCacheEntry> {
        if let Some(entry) = self.entries.get(user_id) {
            return Arc::clone(entry.value());
        }
        let entry = self.entries.entry(user_id.to_string()).or_default();
        Arc::clone(entry.value())
    }

    pub(crate) fn get(&self, user_id: &str) -> Option<Arc<CreditCacheEntry>> {
        self.entries.get(user_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove the entry for `user_id` unless another task holds a reference.
    ///
    /// `get_or_insert` clones under the shard lock and `remove_if` checks under
    /// the same lock, so the reference count cannot change during the check.
    pub(crate) fn remove_unused(&self, user_id: &str) -> bool {
        self.entries
            .remove_if(user_id, |_, entry| Arc::strong_count(entry) == 1)
            .is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert_reuses_entry() {
        let table = EntryTable::default();
        let a = table.get_or_insert("user1");
        let b = table.get_or_insert("user1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);

        let c = table.get_or_insert("user2");
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_concurrent_first_touch_creates_one_entry() {
        let table = Arc::new(EntryTable::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                std::thread::spawn(move || table.get_or_insert("user1"))
            })
            .collect();
        let entries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(entries.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_starts_uninitialized() {
        let table = EntryTable::default();
        let entry = table.get_or_insert("user1");
        assert_eq!(entry.try_peek(), None);

        *entry.lock().await = Some(7);
        assert_eq!(table.get("user1").unwrap().try_peek(), Some(7));
    }

    #[tokio::test]
    async fn test_remove_unused() {
        let table = EntryTable::default();
        table.get_or_insert("user1");
        assert!(table.remove_unused("user1"));
        assert!(!table.remove_unused("user1"));
        assert!(table.get("user1").is_none());
    }

    #[tokio::test]
    async fn test_referenced_entry_is_kept() {
        let table = EntryTable::default();
        let held = table.get_or_insert("user1");
        let _guard = held.lock().await;

        assert!(!table.remove_unused("user1"));
        assert!(Arc::ptr_eq(&held, &table.get_or_insert("user1")));
        assert_eq!(table.len(), 1);
    }
}
