//! The companion page reader.
//!
//! Resolves committed pages and revision records back out of the on-disk
//! layout the writer produces. The reader owns the byte-transform chain
//! and shares the revision-data cache with the writer; both stay alive for
//! the writer's whole session, and the reader may serve concurrent
//! lookups of already-committed revisions while the writer appends.

use std::sync::Arc;

use verso_common::{Revision, Timestamp, FIRST_BEACON, OTHER_BEACON, REVISION_RECORD_SIZE};

use crate::cache::{RevisionDataCache, RevisionFileData};
use crate::codec::CodecChain;
use crate::error::{StorageError, StorageResult};
use crate::file::{StdFile, StorageFile};
use crate::page::{PagePersister, PageReference, SharedPage};

use super::{PageTransaction, SerializationKind};

/// Read access to one stored resource.
pub struct PageReader {
    data_file: Arc<StdFile>,
    revisions_file: Arc<StdFile>,
    serialization: SerializationKind,
    persister: Arc<dyn PagePersister>,
    codec: CodecChain,
    cache: Arc<RevisionDataCache>,
}

impl PageReader {
    /// Creates a reader over open resource files.
    pub fn new(
        data_file: Arc<StdFile>,
        revisions_file: Arc<StdFile>,
        serialization: SerializationKind,
        persister: Arc<dyn PagePersister>,
        codec: CodecChain,
        cache: Arc<RevisionDataCache>,
    ) -> Self {
        Self {
            data_file,
            revisions_file,
            serialization,
            persister,
            codec,
            cache,
        }
    }

    /// The data file handle.
    pub fn data_file(&self) -> &Arc<StdFile> {
        &self.data_file
    }

    /// The revisions index file handle.
    pub fn revisions_file(&self) -> &Arc<StdFile> {
        &self.revisions_file
    }

    /// The revision-data cache shared with the writer.
    pub fn cache(&self) -> &Arc<RevisionDataCache> {
        &self.cache
    }

    /// The byte-transform chain shared with the writer.
    pub fn codec(&self) -> &CodecChain {
        &self.codec
    }

    /// The page persistence codec.
    pub fn persister(&self) -> &Arc<dyn PagePersister> {
        &self.persister
    }

    /// Reads the page a reference points at.
    pub async fn read_page(
        &self,
        trx: &dyn PageTransaction,
        reference: &PageReference,
    ) -> StorageResult<SharedPage> {
        let offset = match self.serialization {
            SerializationKind::Data => reference.key(),
            SerializationKind::TransactionIntentLog => reference.log_key(),
        }
        .ok_or_else(|| StorageError::corrupt("page reference has not been persisted"))?;

        self.read_page_at(trx, offset).await
    }

    /// Reads the length-prefixed page entry starting at `offset`.
    pub async fn read_page_at(
        &self,
        trx: &dyn PageTransaction,
        offset: u64,
    ) -> StorageResult<SharedPage> {
        let mut prefix = [0u8; OTHER_BEACON as usize];
        self.data_file.read_exact_at(&mut prefix, offset).await?;
        let payload_len = u32::from_ne_bytes(prefix) as usize;

        let mut payload = vec![0u8; payload_len];
        self.data_file
            .read_exact_at(&mut payload, offset + OTHER_BEACON)
            .await?;

        let serialized = self.codec.decode(&payload)?;
        self.persister
            .deserialize_page(trx, &serialized, self.serialization)
    }

    /// Reads the root page of a committed revision.
    pub async fn read_revision_root(
        &self,
        trx: &dyn PageTransaction,
        revision: Revision,
    ) -> StorageResult<SharedPage> {
        let data = self
            .cache
            .get_or_try_load(revision, || self.revision_file_data(revision))
            .await?;
        self.read_page_at(trx, data.offset).await
    }

    /// Reads the `(offset, timestamp)` index record of a revision.
    pub async fn revision_file_data(&self, revision: Revision) -> StorageResult<RevisionFileData> {
        let record_offset = FIRST_BEACON + u64::from(revision.as_u32()) * REVISION_RECORD_SIZE;

        let mut record = [0u8; REVISION_RECORD_SIZE as usize];
        self.revisions_file
            .read_exact_at(&mut record, record_offset)
            .await?;

        let offset = u64::from_ne_bytes(record[..8].try_into().expect("record is 16 bytes"));
        let millis = i64::from_ne_bytes(record[8..].try_into().expect("record is 16 bytes"));
        Ok(RevisionFileData::new(offset, Timestamp::from_millis(millis)))
    }

    /// Number of committed revisions recorded in the index file.
    pub async fn revision_count(&self) -> StorageResult<u32> {
        let size = self.revisions_file.size().await?;
        if size <= FIRST_BEACON {
            return Ok(0);
        }
        Ok(((size - FIRST_BEACON) / REVISION_RECORD_SIZE) as u32)
    }

    /// Reads both copies of the uber-page beacon from the revisions file.
    ///
    /// On a clean resource the two halves are byte-identical; recovery
    /// compares them to detect a torn write of one copy.
    pub async fn uber_beacons(&self) -> StorageResult<(Vec<u8>, Vec<u8>)> {
        let half = (FIRST_BEACON / 2) as usize;
        let mut first = vec![0u8; half];
        let mut second = vec![0u8; half];
        self.revisions_file.read_exact_at(&mut first, 0).await?;
        self.revisions_file
            .read_exact_at(&mut second, half as u64)
            .await?;
        Ok((first, second))
    }

    /// Reads the most recently committed uber page from the beacon region.
    pub async fn read_uber_page(&self, trx: &dyn PageTransaction) -> StorageResult<SharedPage> {
        let (first, _) = self.uber_beacons().await?;
        let serialized = self.codec.decode(&first)?;
        self.persister
            .deserialize_page(trx, &serialized, self.serialization)
    }
}

impl std::fmt::Debug for PageReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageReader")
            .field("data_file", &self.data_file.path())
            .field("revisions_file", &self.revisions_file.path())
            .field("serialization", &self.serialization)
            .finish()
    }
}
