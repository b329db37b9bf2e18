use crate::error::Result;

/// A key/value pair produced by a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: String,
    pub value: Vec<u8>,
}

type ReleaseHook = Box<dyn FnOnce() + Send>;
type Entries = Box<dyn Iterator<Item = Result<KvEntry>> + Send>;

/// Forward-only results of a predicate query.
///
/// Entries may be produced lazily by the store, so iteration itself can fail.
/// The release hook runs exactly once: on [`QueryCursor::close`], or on drop
/// if the consumer bailed out before closing. Closing also drops whatever
/// is still feeding the cursor.
pub struct QueryCursor {
    entries: Entries,
    release: Option<ReleaseHook>,
}

impl QueryCursor {
    /// A cursor over entries that are already materialized.
    pub fn new(entries: Vec<KvEntry>) -> Self {
        Self::streaming(entries.into_iter().map(Ok))
    }

    /// A cursor pulling entries from `entries` on demand.
    pub fn streaming(entries: impl Iterator<Item = Result<KvEntry>> + Send + 'static) -> Self {
        Self {
            entries: Box::new(entries),
            release: None,
        }
    }

    /// Attaches the action that frees the underlying snapshot.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    pub fn is_closed(&self) -> bool {
        self.release.is_none()
    }

    pub fn close(&mut self) {
        if let Some(release) = self.release.take() {
            self.entries = Box::new(std::iter::empty());
            release();
            tracing::trace!("query cursor released");
        }
    }
}

impl Iterator for QueryCursor {
    type Item = Result<KvEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}

impl Drop for QueryCursor {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for QueryCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCursor")
            .field("closed", &self.release.is_none())
            .finish()
    }
}
