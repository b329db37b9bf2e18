use crate::domain::cursor::QueryCursor;
use crate::domain::entity::Entity;
use crate::domain::ports::{ChangeSet, KeyValueStore};
use crate::domain::record::{DecodeError, Record};
use crate::domain::selector::QueryDocument;
use crate::error::{LedgerError, Result};
use serde::Serialize;
use tracing::Span;
use uuid::Uuid;

/// One call into the ledger.
///
/// Reads go straight to committed state and are remembered in the read
/// set; writes are buffered and only reach the store through
/// [`Invocation::commit`]. Dropping an invocation discards its writes, so an
/// error raised anywhere before the commit leaves the store untouched.
pub struct Invocation<'a> {
    store: &'a dyn KeyValueStore,
    span: Span,
    changes: ChangeSet,
}

impl<'a> Invocation<'a> {
    pub fn begin(store: &'a dyn KeyValueStore, function: &'static str) -> Self {
        let tx_id = Uuid::new_v4();
        let span = tracing::info_span!("invoke", function, tx_id = %tx_id);
        Self {
            store,
            span,
            changes: ChangeSet::default(),
        }
    }

    /// Parent span for everything logged on behalf of this invocation.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub async fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.store.get(key).await?;
        self.changes
            .reads
            .entry(key.to_string())
            .or_insert_with(|| value.clone());
        Ok(value)
    }

    pub fn put_state(&mut self, key: &str, value: Vec<u8>) {
        self.changes.writes.insert(key.to_string(), value);
    }

    pub fn put_record<T: Serialize>(&mut self, key: &str, record: &T) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.put_state(key, bytes);
        Ok(())
    }

    pub async fn query(&self, query: &QueryDocument) -> Result<QueryCursor> {
        self.store.query(query).await
    }

    /// Reads and decodes a record; absence comes back as [`DecodeError::Missing`].
    pub async fn read_record(&mut self, key: &str) -> Result<std::result::Result<Record, DecodeError>> {
        let raw = self.get_state(key).await?;
        Ok(Record::decode(raw.as_deref()))
    }

    /// Loads an entity; any failure to find or decode one becomes `not_found`.
    pub async fn load_entity(&mut self, code: &str, role: &str) -> Result<Entity> {
        match self.read_record(code).await? {
            Ok(Record::Entity(entity)) => Ok(entity),
            Ok(other) => {
                tracing::debug!(parent: &self.span, code, found = other.code(), "key holds a transaction, not an entity");
                Err(not_found(role, code))
            }
            Err(e) => {
                tracing::debug!(parent: &self.span, code, error = %e, "entity lookup failed");
                Err(not_found(role, code))
            }
        }
    }

    pub fn pending_writes(&self) -> usize {
        self.changes.writes.len()
    }

    /// Hands the buffered writes to the store as one atomic unit.
    pub async fn commit(self) -> Result<()> {
        if self.changes.is_empty() {
            return Ok(());
        }
        let writes = self.changes.writes.len();
        let span = &self.span;
        self.store.commit(self.changes).await?;
        tracing::debug!(parent: span, writes, "committed");
        Ok(())
    }
}

pub(crate) fn not_found(role: &str, code: &str) -> LedgerError {
    LedgerError::NotFound(format!("{role} {code} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryStore;

    #[tokio::test]
    async fn test_dropped_invocation_writes_nothing() {
        let store = InMemoryStore::new();
        {
            let mut inv = Invocation::begin(&store, "test");
            inv.put_state("A", b"{}".to_vec());
            assert_eq!(inv.pending_writes(), 1);
        }
        assert!(store.get("A").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reads_see_committed_state_only() {
        let store = InMemoryStore::new();
        let mut inv = Invocation::begin(&store, "test");
        inv.put_state("A", b"{}".to_vec());
        assert!(inv.get_state("A").await.unwrap().is_none());
        inv.commit().await.unwrap();
        assert!(store.get("A").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_write_after_read_conflicts() {
        let store = InMemoryStore::new();
        store.put_raw("A", "1").await;

        let mut inv = Invocation::begin(&store, "test");
        assert!(inv.get_state("A").await.unwrap().is_some());
        inv.put_state("A", b"2".to_vec());

        store.put_raw("A", "3").await;
        assert!(matches!(inv.commit().await, Err(LedgerError::Conflict(_))));
        assert_eq!(store.get("A").await.unwrap().as_deref(), Some(&b"3"[..]));
    }

    #[tokio::test]
    async fn test_load_entity_maps_failures_to_not_found() {
        let store = InMemoryStore::new();
        store.put_raw("BROKEN", "{").await;
        store
            .put_raw(
                "R1",
                r#"{"code":"R1","requester":"A","type":"request","amount":"1","status":"ACTIVE"}"#,
            )
            .await;

        let mut inv = Invocation::begin(&store, "test");
        for code in ["MISSING", "BROKEN", "R1"] {
            let err = inv.load_entity(code, "requester").await.unwrap_err();
            assert!(matches!(err, LedgerError::NotFound(ref msg) if msg.contains(code)));
        }
    }
}
