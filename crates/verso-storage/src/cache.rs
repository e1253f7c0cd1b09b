//! Revision offset cache.
//!
//! Maps revision numbers to their data-file offsets and commit timestamps.
//! The writer inserts an entry for every committed revision root; the
//! companion reader performs concurrent lookups for already-committed
//! revisions, so the map must tolerate concurrent readers alongside the
//! single writer.

use std::future::Future;

use dashmap::DashMap;

use verso_common::{Revision, Timestamp};

/// Location of a committed revision root in the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionFileData {
    /// Absolute byte offset of the revision root page entry.
    pub offset: u64,
    /// Commit timestamp of the revision.
    pub timestamp: Timestamp,
}

impl RevisionFileData {
    /// Creates a record from its two components.
    #[must_use]
    pub const fn new(offset: u64, timestamp: Timestamp) -> Self {
        Self { offset, timestamp }
    }
}

/// Concurrent cache of [`RevisionFileData`] keyed by revision.
#[derive(Debug, Default)]
pub struct RevisionDataCache {
    map: DashMap<Revision, RevisionFileData>,
}

impl RevisionDataCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached record for `revision`, if present.
    pub fn get(&self, revision: Revision) -> Option<RevisionFileData> {
        self.map.get(&revision).map(|entry| *entry.value())
    }

    /// Inserts the record for `revision`, replacing any previous entry.
    ///
    /// The insert is immediately visible to concurrent readers.
    pub fn insert(&self, revision: Revision, data: RevisionFileData) {
        self.map.insert(revision, data);
    }

    /// Returns the cached record for `revision`, loading and caching it on
    /// a miss.
    pub async fn get_or_try_load<F, Fut, E>(
        &self,
        revision: Revision,
        load: F,
    ) -> Result<RevisionFileData, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RevisionFileData, E>>,
    {
        if let Some(data) = self.get(revision) {
            return Ok(data);
        }
        let data = load().await?;
        self.insert(revision, data);
        Ok(data)
    }

    /// Number of cached revisions.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drops every entry. Used when a resource is truncated to empty.
    pub fn clear(&self) {
        self.map.clear();
    }
}
