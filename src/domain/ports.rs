use super::cursor::QueryCursor;
use super::selector::QueryDocument;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Buffered effects of one invocation.
///
/// `reads` records what the invocation observed for each key (`None` for
/// absent); `writes` holds the final value per key. A store applies the
/// writes only if every observed value is still current.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChangeSet {
    pub reads: BTreeMap<String, Option<Vec<u8>>>,
    pub writes: BTreeMap<String, Vec<u8>>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// The shared keyspace holding entities and transaction records.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Runs a predicate query. Values that are not JSON objects never match.
    async fn query(&self, query: &QueryDocument) -> Result<QueryCursor>;

    /// Applies `changes.writes` atomically, or nothing on conflict.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

pub type StoreBox = Box<dyn KeyValueStore>;
