//! The append-only page writer.
//!
//! One writer exists per resource and write session. Pages are serialized,
//! byte-transformed, and staged in an elastic buffer that flushes to the
//! data file at a size threshold; committing a revision appends an index
//! record to the revisions file, and the uber-page sequence makes the
//! commit durable through the dual beacon write followed by a data sync.
//!
//! Mutation methods take `&mut self` and are awaited to completion before
//! returning, so all file operations of one writer are strictly serial.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::time::timeout;
use tracing::{debug, info};

use verso_common::{hash_bytes, Revision, FIRST_BEACON, INITIAL_WRITE_BUFFER_CAPACITY, OTHER_BEACON};

use crate::cache::{RevisionDataCache, RevisionFileData};
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::file::{IoError, OpenOptions, StdFile, StorageFile};
use crate::page::{PageKind, PagePersister, PageReference, SharedPage};

use super::layout::{first_append_offset, page_layout};
use super::reader::PageReader;
use super::{PageTransaction, SerializationKind, WriteBuffer};

/// How long a revision lookup may take before `truncate_to` gives up.
const CACHE_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Which leg of the dual uber-page commit a page write belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UberWritePhase {
    /// A regular append outside the commit sequence.
    Steady,
    /// First uber copy of the session; triggers the dual beacon write.
    FirstBeacon,
    /// Second uber copy; no beacon side effects.
    SecondBeacon,
}

/// Write access to one stored resource.
///
/// The writer keeps its companion [`PageReader`] alive for its entire
/// lifetime and shares the revision-data cache and content hash function
/// with it. Closing the writer syncs both files; a second close is a
/// no-op.
pub struct PageWriter {
    data_file: Arc<StdFile>,
    revisions_file: Arc<StdFile>,
    serialization: SerializationKind,
    persister: Arc<dyn PagePersister>,
    cache: Arc<RevisionDataCache>,
    reader: PageReader,
    scratch: BytesMut,
    flush_size: usize,
    closed: bool,
}

impl PageWriter {
    /// Creates a writer over the reader's open file handles.
    pub fn new(
        serialization: SerializationKind,
        persister: Arc<dyn PagePersister>,
        reader: PageReader,
        flush_size: usize,
    ) -> Self {
        Self {
            data_file: Arc::clone(reader.data_file()),
            revisions_file: Arc::clone(reader.revisions_file()),
            serialization,
            persister,
            cache: Arc::clone(reader.cache()),
            reader,
            scratch: BytesMut::with_capacity(INITIAL_WRITE_BUFFER_CAPACITY),
            flush_size,
            closed: false,
        }
    }

    /// Opens a resource for writing, creating its directory and files as
    /// needed.
    pub async fn open(
        config: &StorageConfig,
        persister: Arc<dyn PagePersister>,
        serialization: SerializationKind,
    ) -> StorageResult<Self> {
        config.validate().map_err(StorageError::fatal)?;

        tokio::fs::create_dir_all(&config.dir)
            .await
            .map_err(|e| IoError::from_io_with_path(e, &config.dir))?;

        let data_file = StdFile::open(config.data_file_path(), OpenOptions::for_resource()).await?;
        let revisions_file =
            StdFile::open(config.revisions_file_path(), OpenOptions::for_resource()).await?;

        let cache = Arc::new(RevisionDataCache::new());
        let reader = PageReader::new(
            data_file,
            revisions_file,
            serialization,
            Arc::clone(&persister),
            config.codec_chain(),
            cache,
        );

        info!(
            data = %config.data_file_path().display(),
            revisions = %config.revisions_file_path().display(),
            "opened resource for writing"
        );

        Ok(Self::new(
            serialization,
            persister,
            reader,
            config.flush_size,
        ))
    }

    /// The companion reader.
    pub fn reader(&self) -> &PageReader {
        &self.reader
    }

    /// Persists the page a reference holds, recording its offset and
    /// content hash in the reference.
    ///
    /// The entry is staged in `buffer` and reaches the data file when the
    /// buffer crosses the flush threshold or a commit flushes it. Writing
    /// a revision root additionally appends its index record to the
    /// revisions file and populates the shared cache.
    pub async fn write(
        &mut self,
        trx: &dyn PageTransaction,
        reference: &mut PageReference,
        buffer: &mut WriteBuffer,
    ) -> StorageResult<()> {
        self.ensure_open()?;
        let offset = self.next_offset(buffer).await?;
        self.write_page(trx, reference, buffer, offset, UberWritePhase::Steady)
            .await
    }

    /// Commits by writing the uber page twice and making it durable.
    ///
    /// Any staged bytes are flushed first. The uber page is then staged
    /// once per beacon half — the first write also stores both copies in
    /// the revisions file's reserved region and syncs it — and the staged
    /// entries are written to the head of the data file, followed by a
    /// data sync. The transaction ends up with a fresh buffer.
    pub async fn write_uber_page(
        &mut self,
        trx: &dyn PageTransaction,
        reference: &mut PageReference,
        buffer: &mut WriteBuffer,
    ) -> StorageResult<()> {
        self.ensure_open()?;

        if buffer.write_position() > 0 {
            self.flush_buffer(trx, buffer).await?;
        }

        self.write_page(trx, reference, buffer, 0, UberWritePhase::FirstBeacon)
            .await?;
        self.write_page(
            trx,
            reference,
            buffer,
            FIRST_BEACON / 2,
            UberWritePhase::SecondBeacon,
        )
        .await?;

        let staged = mem::take(buffer).freeze();
        self.data_file.write_all_at(&staged, 0).await?;
        self.data_file.datasync().await?;
        *buffer = trx.new_write_buffer();

        info!(bytes = staged.len(), "committed uber page");
        Ok(())
    }

    /// Resets the resource to empty by truncating both files.
    pub async fn truncate(&mut self) -> StorageResult<()> {
        self.ensure_open()?;
        self.data_file.set_len(0).await?;
        self.revisions_file.set_len(0).await?;
        self.cache.clear();
        debug!("truncated resource to empty");
        Ok(())
    }

    /// Rolls the data file back to the end of `revision`'s root page.
    ///
    /// Any failure here — lookup timeout, missing index record, or I/O —
    /// leaves the writer in a fatal state.
    pub async fn truncate_to(&mut self, revision: Revision) -> StorageResult<()> {
        self.ensure_open()?;

        let lookup = self
            .cache
            .get_or_try_load(revision, || self.reader.revision_file_data(revision));
        let data = timeout(CACHE_LOOKUP_TIMEOUT, lookup)
            .await
            .map_err(|_| StorageError::fatal(format!("lookup of revision {revision} timed out")))?
            .map_err(|e| StorageError::fatal(format!("lookup of revision {revision} failed: {e}")))?;

        let mut prefix = [0u8; OTHER_BEACON as usize];
        self.data_file
            .read_exact_at(&mut prefix, data.offset)
            .await
            .map_err(|e| StorageError::fatal(format!("reading length prefix failed: {e}")))?;
        let data_length = u32::from_ne_bytes(prefix);

        let new_len = data.offset + OTHER_BEACON + u64::from(data_length);
        self.data_file
            .set_len(new_len)
            .await
            .map_err(|e| StorageError::fatal(format!("truncating data file failed: {e}")))?;

        debug!(%revision, new_len, "rolled data file back");
        Ok(())
    }

    /// Syncs both files and ends the session. Idempotent.
    pub async fn close(&mut self) -> StorageResult<()> {
        if self.closed {
            return Ok(());
        }
        self.data_file.datasync().await?;
        self.revisions_file.datasync().await?;
        self.closed = true;
        debug!(data = %self.data_file.path().display(), "closed page writer");
        Ok(())
    }

    /// Reads the page a reference points at. Delegates to the reader.
    pub async fn read_page(
        &self,
        trx: &dyn PageTransaction,
        reference: &PageReference,
    ) -> StorageResult<SharedPage> {
        self.reader.read_page(trx, reference).await
    }

    /// Reads the root page of a committed revision. Delegates to the
    /// reader.
    pub async fn read_revision_root(
        &self,
        trx: &dyn PageTransaction,
        revision: Revision,
    ) -> StorageResult<SharedPage> {
        self.reader.read_revision_root(trx, revision).await
    }

    /// Reads the most recent uber page. Delegates to the reader.
    pub async fn read_uber_page(&self, trx: &dyn PageTransaction) -> StorageResult<SharedPage> {
        self.reader.read_uber_page(trx).await
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            Err(StorageError::fatal("writer is closed"))
        } else {
            Ok(())
        }
    }

    /// Absolute offset the next staged payload will begin at.
    async fn next_offset(&self, buffer: &WriteBuffer) -> StorageResult<u64> {
        let file_size = self.data_file.size().await?;
        let base = if file_size == 0 {
            first_append_offset()
        } else {
            file_size
        };
        Ok(base + buffer.write_position() as u64)
    }

    async fn write_page(
        &mut self,
        trx: &dyn PageTransaction,
        reference: &mut PageReference,
        buffer: &mut WriteBuffer,
        mut offset: u64,
        phase: UberWritePhase,
    ) -> StorageResult<()> {
        let page: SharedPage = reference
            .page()
            .cloned()
            .expect("page reference handed to the writer holds no in-memory page");
        let kind = page.kind();

        self.persister
            .serialize_page(trx, &mut self.scratch, page.as_ref(), self.serialization)?;
        let payload = self.reader.codec().encode(&self.scratch)?;
        self.scratch.clear();

        let layout = page_layout(kind, self.serialization, offset, payload.len());
        offset = layout.offset;

        if kind != PageKind::Uber && layout.pad_before > 0 {
            buffer.reserve_zeroed(layout.pad_before as usize);
        }
        buffer.put_u32_native(payload.len() as u32);
        buffer.put_slice(&payload);
        if kind == PageKind::Uber && layout.pad_after > 0 {
            buffer.reserve_zeroed(layout.pad_after as usize);
        }

        if buffer.write_position() > self.flush_size {
            self.flush_buffer(trx, buffer).await?;
        }

        match self.serialization {
            SerializationKind::Data => reference.set_key(offset),
            SerializationKind::TransactionIntentLog => reference.set_log_key(offset),
        }

        match page.content_hash() {
            Some(hash) => reference.set_hash(hash),
            None => reference.set_hash(hash_bytes(&payload)),
        }

        if self.serialization == SerializationKind::Data {
            match kind {
                PageKind::RevisionRoot => self.append_revision_record(&page, offset).await?,
                PageKind::Uber if phase == UberWritePhase::FirstBeacon => {
                    self.write_uber_beacons(&payload).await?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Writes the staged bytes to the end of the data file and hands the
    /// transaction a fresh buffer.
    ///
    /// The old buffer moves into the write; it must not be reused while
    /// the write is in flight.
    async fn flush_buffer(
        &self,
        trx: &dyn PageTransaction,
        buffer: &mut WriteBuffer,
    ) -> StorageResult<()> {
        let file_size = self.data_file.size().await?;
        let offset = if file_size == 0 {
            first_append_offset()
        } else {
            file_size
        };

        let staged = mem::take(buffer).freeze();
        self.data_file.write_all_at(&staged, offset).await?;
        *buffer = trx.new_write_buffer();

        debug!(bytes = staged.len(), offset, "flushed write buffer");
        Ok(())
    }

    /// Appends the `(offset, timestamp)` record for a committed revision
    /// root and publishes it to the shared cache.
    async fn append_revision_record(
        &self,
        page: &SharedPage,
        offset: u64,
    ) -> StorageResult<()> {
        let revision = page
            .revision()
            .expect("revision root page reports no revision");
        let timestamp = page
            .revision_timestamp()
            .expect("revision root page reports no timestamp");

        let mut record = [0u8; 16];
        record[..8].copy_from_slice(&offset.to_ne_bytes());
        record[8..].copy_from_slice(&timestamp.as_millis().to_ne_bytes());

        let file_size = self.revisions_file.size().await?;
        let record_offset = if revision.is_first() {
            file_size + FIRST_BEACON
        } else {
            file_size
        };
        self.revisions_file
            .write_all_at(&record, record_offset)
            .await?;

        self.cache
            .insert(revision, RevisionFileData::new(offset, timestamp));

        debug!(%revision, offset, "indexed revision root");
        Ok(())
    }

    /// Stores the serialized uber page in both halves of the revisions
    /// file's reserved region and syncs it.
    async fn write_uber_beacons(&self, payload: &[u8]) -> StorageResult<()> {
        let half = (FIRST_BEACON / 2) as usize;
        if payload.len() > half {
            return Err(StorageError::corrupt(format!(
                "serialized uber page of {} bytes exceeds its {half}-byte beacon slot",
                payload.len()
            )));
        }

        let mut beacon = vec![0u8; half];
        beacon[..payload.len()].copy_from_slice(payload);
        self.revisions_file.write_all_at(&beacon, 0).await?;
        self.revisions_file
            .write_all_at(&beacon, half as u64)
            .await?;
        self.revisions_file.datasync().await?;
        Ok(())
    }
}

impl std::fmt::Debug for PageWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWriter")
            .field("data_file", &self.data_file.path())
            .field("revisions_file", &self.revisions_file.path())
            .field("serialization", &self.serialization)
            .field("flush_size", &self.flush_size)
            .field("closed", &self.closed)
            .finish()
    }
}
