use crate::core::{Lease, LeaseKey};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

type LeaseSlot = Arc<Mutex<Option<Lease>>>;

/// Lease table with one row per key.
///
/// Every key owns its own slot lock, so read-modify-write on one key is
/// serialized while different keys proceed in parallel. The outer map lock is
/// only taken exclusively to create a slot or to sweep the table.
pub struct LeaseStore {
    /// Per-key slots. A released key keeps its (empty) slot until a sweep.
    slots: RwLock<HashMap<LeaseKey, LeaseSlot>>,
    next_token: AtomicU64,
}

/// Mutable view of one row, handed to a [`LeaseStore::transact`] closure.
pub struct LeaseEntry<'a> {
    row: &'a mut Option<Lease>,
    tokens: &'a AtomicU64,
}

impl LeaseEntry<'_> {
    pub fn get(&self) -> Option<&Lease> {
        self.row.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut Lease> {
        self.row.as_mut()
    }

    /// Writes the row, replacing whatever was there.
    pub fn put(&mut self, lease: Lease) {
        *self.row = Some(lease);
    }

    pub fn delete(&mut self) -> Option<Lease> {
        self.row.take()
    }

    /// Draws the next fencing token from the store-wide counter.
    pub fn issue_fencing_token(&self) -> u64 {
        self.tokens.fetch_add(1, Ordering::SeqCst)
    }
}

impl LeaseStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Runs `op` against the row for `key` with no other operation on the same
    /// key interleaving. The closure must not block; it runs under the slot lock.
    pub async fn transact<T, F>(&self, key: &LeaseKey, op: F) -> T
    where
        F: FnOnce(&mut LeaseEntry<'_>) -> T,
    {
        let read = self.slots.read().await;
        let existing = read.get(key).cloned();
        // The map guard stays alive for the whole transaction so a sweep cannot
        // orphan the slot we are about to lock.
        let (_map_guard, slot) = match existing {
            Some(slot) => (read, slot),
            None => {
                drop(read);
                let mut write = self.slots.write().await;
                let slot = Arc::clone(write.entry(key.clone()).or_default());
                (write.downgrade(), slot)
            }
        };

        let mut row = slot.lock().await;
        let mut entry = LeaseEntry {
            row: &mut *row,
            tokens: &self.next_token,
        };
        op(&mut entry)
    }

    /// Current row for `key`, active or not.
    pub async fn get(&self, key: &LeaseKey) -> Option<Lease> {
        let slots = self.slots.read().await;
        let slot = slots.get(key)?;
        let row = slot.lock().await;
        row.clone()
    }

    /// All rows still active at `now`, ordered by key.
    pub async fn active(&self, now: DateTime<Utc>) -> Vec<Lease> {
        let mut leases = self.export().await;
        leases.retain(|lease| lease.is_active(now));
        leases
    }

    /// Every stored row (expired rows included), ordered by key.
    pub async fn export(&self) -> Vec<Lease> {
        let slots = self.slots.read().await;
        let mut leases = Vec::with_capacity(slots.len());
        for slot in slots.values() {
            if let Some(lease) = slot.lock().await.as_ref() {
                leases.push(lease.clone());
            }
        }
        leases.sort_by(|a, b| a.key.cmp(&b.key));
        leases
    }

    /// Replaces the whole table. The token counter resumes above the largest
    /// restored token so fencing stays monotonic across restarts.
    pub async fn restore(&self, leases: Vec<Lease>) {
        let mut slots = self.slots.write().await;
        slots.clear();

        let mut max_token = 0;
        for lease in leases {
            max_token = max_token.max(lease.fencing_token);
            slots.insert(lease.key.clone(), Arc::new(Mutex::new(Some(lease))));
        }
        self.next_token
            .fetch_max(max_token.saturating_add(1), Ordering::SeqCst);
    }

    /// Drops rows that expired before `now` and empty slots. Returns how many
    /// expired rows were removed.
    ///
    /// Without this sweep an expired row stays until the next acquire
    /// supersedes it, and its holder may still renew or release it. A purged
    /// row is gone for good: the former holder gets `NotHeld`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut slots = self.slots.write().await;
        let mut purged = 0;
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(row) => match row.as_ref() {
                Some(lease) if lease.is_active(now) => true,
                Some(_) => {
                    purged += 1;
                    false
                }
                None => false,
            },
            Err(_) => true,
        });
        purged
    }

    /// Number of stored rows (expired rows included).
    pub async fn len(&self) -> usize {
        self.export().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for LeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ActorId;
    use chrono::Duration;

    fn lease(key: LeaseKey, holder: &str, expires_at: DateTime<Utc>, token: u64) -> Lease {
        Lease {
            key,
            holder: ActorId::from(holder),
            acquired_at: expires_at - Duration::seconds(60),
            expires_at,
            fencing_token: token,
        }
    }

    #[tokio::test]
    async fn test_transact_put_and_delete() {
        let store = LeaseStore::new();
        let key = LeaseKey::field("asset-1", "serial");
        let now = Utc::now();

        let token = store
            .transact(&key, |entry| {
                assert!(entry.get().is_none());
                let token = entry.issue_fencing_token();
                entry.put(lease(key.clone(), "alice", now + Duration::seconds(60), token));
                token
            })
            .await;
        assert_eq!(token, 1);
        assert_eq!(store.get(&key).await.map(|l| l.holder), Some(ActorId::from("alice")));
        assert_eq!(store.len().await, 1);

        let removed = store.transact(&key, |entry| entry.delete()).await;
        assert!(removed.is_some());
        assert!(store.get(&key).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_active_rows() {
        let store = LeaseStore::new();
        let now = Utc::now();
        let live = LeaseKey::record("def-1");
        let stale = LeaseKey::record("def-2");
        store
            .restore(vec![
                lease(live.clone(), "alice", now + Duration::seconds(30), 4),
                lease(stale.clone(), "bob", now - Duration::seconds(1), 5),
            ])
            .await;

        assert_eq!(store.active(now).await.len(), 1);
        assert_eq!(store.purge_expired(now).await, 1);
        assert!(store.get(&live).await.is_some());
        assert!(store.get(&stale).await.is_none());
    }

    #[tokio::test]
    async fn test_restore_resumes_token_counter() {
        let store = LeaseStore::new();
        let now = Utc::now();
        store
            .restore(vec![lease(LeaseKey::record("r"), "alice", now, 41)])
            .await;

        let next = store
            .transact(&LeaseKey::record("other"), |entry| entry.issue_fencing_token())
            .await;
        assert_eq!(next, 42);
    }
}
