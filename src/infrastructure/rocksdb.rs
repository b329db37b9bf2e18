use super::Selection;
use crate::domain::cursor::{KvEntry, QueryCursor};
use crate::domain::ports::{ChangeSet, KeyValueStore};
use crate::domain::selector::QueryDocument;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{SyncSender, sync_channel};
use tokio::sync::{Mutex, oneshot};

/// Column Family holding the ledger keyspace (entities and transactions).
pub const CF_STATE: &str = "state";

/// Matched entries a scan may run ahead of its consumer.
const QUERY_BUFFER: usize = 64;

/// A persistent store implementation using RocksDB.
///
/// Entities and transaction records share one Column Family keyed by code.
/// Commits are serialized through `commit_lock` so the read-set check and
/// the `WriteBatch` apply as one step.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_state = ColumnFamilyDescriptor::new(CF_STATE, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_state])?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn state_cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_STATE).ok_or_else(|| {
            LedgerError::InternalError(Box::new(std::io::Error::other(
                "State column family not found",
            )))
        })
    }
}

#[async_trait]
impl KeyValueStore for RocksDBStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.state_cf()?;
        Ok(self.db.get_cf(cf, key.as_bytes())?)
    }

    /// Scans a snapshot taken before this returns, on a blocking thread.
    ///
    /// Matches stream through a bounded channel. Releasing the cursor drops
    /// the receiving end and flags the scan, which then stops and drops the
    /// snapshot.
    async fn query(&self, query: &QueryDocument) -> Result<QueryCursor> {
        self.state_cf()?;

        let (entries_tx, entries_rx) = sync_channel(QUERY_BUFFER);
        let (ready_tx, ready_rx) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let db = Arc::clone(&self.db);
        let query = query.clone();
        let stop = Arc::clone(&cancelled);
        tokio::task::spawn_blocking(move || scan(&db, &query, &stop, ready_tx, &entries_tx));

        ready_rx.await.map_err(|_| {
            LedgerError::InternalError(Box::new(std::io::Error::other(
                "query scan ended before taking a snapshot",
            )))
        })?;

        Ok(QueryCursor::streaming(entries_rx.into_iter()).on_release(move || {
            cancelled.store(true, Ordering::Release);
            tracing::trace!("rocksdb query snapshot released");
        }))
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        let cf = self.state_cf()?;

        for (key, observed) in &changes.reads {
            let current = self.db.get_cf(cf, key.as_bytes())?;
            if current.as_ref() != observed.as_ref() {
                return Err(LedgerError::Conflict(key.clone()));
            }
        }

        let mut batch = WriteBatch::default();
        for (key, value) in &changes.writes {
            batch.put_cf(cf, key.as_bytes(), value);
        }
        self.db.write(batch)?;

        Ok(())
    }
}

fn scan(
    db: &DB,
    query: &QueryDocument,
    cancelled: &AtomicBool,
    ready: oneshot::Sender<()>,
    out: &SyncSender<Result<KvEntry>>,
) {
    let Some(cf) = db.cf_handle(CF_STATE) else {
        return;
    };
    let snapshot = db.snapshot();
    if ready.send(()).is_err() {
        return;
    }

    let mut selection = Selection::new(query);
    for item in snapshot.iterator_cf(cf, IteratorMode::Start) {
        if cancelled.load(Ordering::Acquire) || selection.is_done() {
            break;
        }
        let entry: Result<KvEntry> = match item {
            Ok((key, value)) => {
                if !selection.admit(&value) {
                    continue;
                }
                decode_key(key).map(|key| KvEntry {
                    key,
                    value: value.into_vec(),
                })
            }
            Err(e) => Err(e.into()),
        };
        let failed = entry.is_err();
        if out.send(entry).is_err() || failed {
            break;
        }
    }
}

fn decode_key(key: Box<[u8]>) -> Result<String> {
    String::from_utf8(key.into_vec()).map_err(|e| {
        LedgerError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Non UTF-8 key in ledger state: {}", e),
        )))
    })
}
