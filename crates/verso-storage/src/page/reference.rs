//! Page references.

use verso_common::PageHash;

use super::SharedPage;

/// A mutable descriptor of a page's location, updated by the writer as a
/// side effect of persisting the page.
///
/// Before a write the reference holds the in-memory page; afterwards it
/// additionally carries the absolute byte offset the payload landed at
/// (`key` for the data file, `log_key` for the transaction-intent log) and
/// the page's content hash.
#[derive(Debug, Clone, Default)]
pub struct PageReference {
    page: Option<SharedPage>,
    key: Option<u64>,
    log_key: Option<u64>,
    hash: Option<PageHash>,
}

impl PageReference {
    /// Creates a reference to an in-memory page that has not been
    /// persisted yet.
    #[must_use]
    pub fn new(page: SharedPage) -> Self {
        Self {
            page: Some(page),
            key: None,
            log_key: None,
            hash: None,
        }
    }

    /// The in-memory page, if any.
    pub fn page(&self) -> Option<&SharedPage> {
        self.page.as_ref()
    }

    /// Replaces the in-memory page.
    pub fn set_page(&mut self, page: SharedPage) {
        self.page = Some(page);
    }

    /// Drops the in-memory page, keeping the on-disk coordinates.
    pub fn clear_page(&mut self) {
        self.page = None;
    }

    /// Absolute byte offset of the payload in the data file.
    pub fn key(&self) -> Option<u64> {
        self.key
    }

    /// Records the data-file offset. Called by the writer.
    pub fn set_key(&mut self, key: u64) {
        self.key = Some(key);
    }

    /// Absolute byte offset of the payload in the transaction-intent log.
    pub fn log_key(&self) -> Option<u64> {
        self.log_key
    }

    /// Records the intent-log offset. Called by the writer.
    pub fn set_log_key(&mut self, log_key: u64) {
        self.log_key = Some(log_key);
    }

    /// Content hash recorded at write time.
    pub fn hash(&self) -> Option<PageHash> {
        self.hash
    }

    /// Records the content hash. Called by the writer.
    pub fn set_hash(&mut self, hash: PageHash) {
        self.hash = Some(hash);
    }
}
