use super::Selection;
use crate::domain::cursor::{KvEntry, QueryCursor};
use crate::domain::ports::{ChangeSet, KeyValueStore};
use crate::domain::selector::QueryDocument;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// A thread-safe in-memory ledger keyspace.
///
/// Uses `Arc<RwLock<BTreeMap<String, Vec<u8>>>>` so clones share state and
/// queries return keys in order. Commits validate and apply under a single
/// write lock. Query results are copied out under the read lock; the store
/// only keeps count of the cursors that have not been released yet.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    open_cursors: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a value directly, bypassing invocation bookkeeping.
    pub async fn put_raw(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.state.write().await.insert(key.to_string(), value.into());
    }

    /// Cursors handed out by [`KeyValueStore::query`] and not yet released.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let state = self.state.read().await;
        Ok(state.get(key).cloned())
    }

    async fn query(&self, query: &QueryDocument) -> Result<QueryCursor> {
        let state = self.state.read().await;
        let mut selection = Selection::new(query);
        let mut entries = Vec::new();
        for (key, value) in state.iter() {
            if selection.is_done() {
                break;
            }
            if selection.admit(value) {
                entries.push(KvEntry {
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        let open_cursors = Arc::clone(&self.open_cursors);
        Ok(QueryCursor::new(entries).on_release(move || {
            open_cursors.fetch_sub(1, Ordering::SeqCst);
        }))
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut state = self.state.write().await;
        for (key, observed) in &changes.reads {
            if state.get(key) != observed.as_ref() {
                return Err(LedgerError::Conflict(key.clone()));
            }
        }
        state.extend(changes.writes);
        Ok(())
    }
}
