//! Storage backends for the ledger keyspace.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::selector::QueryDocument;
use serde_json::Value;

/// Running state of one query scan over values in key order: applies the
/// selector, then `skip`, then `limit`.
pub(crate) struct Selection<'q> {
    query: &'q QueryDocument,
    skipped: usize,
    taken: usize,
}

impl<'q> Selection<'q> {
    pub(crate) fn new(query: &'q QueryDocument) -> Self {
        Self {
            query,
            skipped: 0,
            taken: 0,
        }
    }

    /// True once `limit` results have been admitted.
    pub(crate) fn is_done(&self) -> bool {
        self.query.limit.is_some_and(|limit| self.taken >= limit)
    }

    /// Whether the next scanned value belongs in the result set.
    pub(crate) fn admit(&mut self, value: &[u8]) -> bool {
        if self.is_done() || !matches_document(self.query, value) {
            return false;
        }
        if self.skipped < self.query.skip {
            self.skipped += 1;
            return false;
        }
        self.taken += 1;
        true
    }
}

/// Values that are not JSON objects never match.
fn matches_document(query: &QueryDocument, value: &[u8]) -> bool {
    serde_json::from_slice::<Value>(value)
        .map(|doc| doc.is_object() && query.matches(&doc))
        .unwrap_or(false)
}
