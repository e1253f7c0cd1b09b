//! End-to-end tests of the append-only page writer and its companion
//! reader, driven through a minimal page model and persister.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use tempfile::TempDir;

use verso_common::{hash_bytes, PageHash, Revision, Timestamp, FIRST_BEACON};
use verso_storage::{
    Compression, Page, PageKind, PagePersister, PageReference, PageTransaction, PageWriter,
    SerializationKind, SharedPage, StorageConfig, StorageError, StorageResult, WriteBuffer,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct TestPage {
    kind: PageKind,
    revision: Option<Revision>,
    timestamp: Option<Timestamp>,
    body: Vec<u8>,
}

impl TestPage {
    fn fragment(body: &[u8]) -> Self {
        Self {
            kind: PageKind::Fragment,
            revision: None,
            timestamp: None,
            body: body.to_vec(),
        }
    }

    fn key_value(body: &[u8]) -> Self {
        Self {
            kind: PageKind::KeyValue,
            revision: None,
            timestamp: None,
            body: body.to_vec(),
        }
    }

    fn revision_root(revision: u32, timestamp: i64, body: &[u8]) -> Self {
        Self {
            kind: PageKind::RevisionRoot,
            revision: Some(Revision::new(revision)),
            timestamp: Some(Timestamp::from_millis(timestamp)),
            body: body.to_vec(),
        }
    }

    fn uber(body: &[u8]) -> Self {
        Self {
            kind: PageKind::Uber,
            revision: None,
            timestamp: None,
            body: body.to_vec(),
        }
    }

    /// The exact bytes `TestPersister` produces for this page.
    fn serialized(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(kind_tag(self.kind));
        out.extend_from_slice(&self.revision.map_or(0, Revision::as_u32).to_ne_bytes());
        out.extend_from_slice(
            &self
                .timestamp
                .map_or(0, Timestamp::as_millis)
                .to_ne_bytes(),
        );
        out.extend_from_slice(&(self.body.len() as u32).to_ne_bytes());
        out.extend_from_slice(&self.body);
        out
    }
}

impl Page for TestPage {
    fn kind(&self) -> PageKind {
        self.kind
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn revision(&self) -> Option<Revision> {
        self.revision
    }

    fn revision_timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    fn content_hash(&self) -> Option<PageHash> {
        (self.kind == PageKind::KeyValue).then(|| hash_bytes(&self.body))
    }
}

fn kind_tag(kind: PageKind) -> u8 {
    match kind {
        PageKind::Uber => 0,
        PageKind::RevisionRoot => 1,
        PageKind::KeyValue => 2,
        PageKind::Fragment => 3,
    }
}

fn tag_kind(tag: u8) -> Option<PageKind> {
    match tag {
        0 => Some(PageKind::Uber),
        1 => Some(PageKind::RevisionRoot),
        2 => Some(PageKind::KeyValue),
        3 => Some(PageKind::Fragment),
        _ => None,
    }
}

/// Persists `TestPage` as `tag | revision | timestamp | body_len | body`,
/// 17 bytes of header plus the body. The format is self-delimiting, so
/// trailing zero padding from beacon reads is ignored.
struct TestPersister;

impl PagePersister for TestPersister {
    fn serialize_page(
        &self,
        _trx: &dyn PageTransaction,
        out: &mut BytesMut,
        page: &dyn Page,
        _kind: SerializationKind,
    ) -> StorageResult<()> {
        let page = page
            .as_any()
            .downcast_ref::<TestPage>()
            .ok_or_else(|| StorageError::corrupt("unknown page type"))?;
        out.put_slice(&page.serialized());
        Ok(())
    }

    fn deserialize_page(
        &self,
        _trx: &dyn PageTransaction,
        bytes: &[u8],
        _kind: SerializationKind,
    ) -> StorageResult<SharedPage> {
        if bytes.len() < 17 {
            return Err(StorageError::corrupt("page header truncated"));
        }
        let kind = tag_kind(bytes[0])
            .ok_or_else(|| StorageError::corrupt(format!("unknown page tag {}", bytes[0])))?;
        let revision = u32::from_ne_bytes(bytes[1..5].try_into().unwrap());
        let timestamp = i64::from_ne_bytes(bytes[5..13].try_into().unwrap());
        let body_len = u32::from_ne_bytes(bytes[13..17].try_into().unwrap()) as usize;
        if bytes.len() < 17 + body_len {
            return Err(StorageError::corrupt("page body truncated"));
        }

        let is_root = kind == PageKind::RevisionRoot;
        Ok(Arc::new(TestPage {
            kind,
            revision: is_root.then(|| Revision::new(revision)),
            timestamp: is_root.then(|| Timestamp::from_millis(timestamp)),
            body: bytes[17..17 + body_len].to_vec(),
        }))
    }
}

#[derive(Default)]
struct TestTrx {
    buffers_created: AtomicUsize,
}

impl PageTransaction for TestTrx {
    fn new_write_buffer(&self) -> WriteBuffer {
        self.buffers_created.fetch_add(1, Ordering::SeqCst);
        WriteBuffer::new()
    }
}

struct Harness {
    _dir: TempDir,
    config: StorageConfig,
    writer: PageWriter,
    trx: TestTrx,
}

impl Harness {
    async fn new(configure: impl FnOnce(StorageConfig) -> StorageConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let config = configure(StorageConfig::new(dir.path()));
        let writer = PageWriter::open(&config, Arc::new(TestPersister), SerializationKind::Data)
            .await
            .unwrap();
        Self {
            _dir: dir,
            config,
            writer,
            trx: TestTrx::default(),
        }
    }

    async fn data(configure: impl FnOnce(StorageConfig) -> StorageConfig) -> (Self, WriteBuffer) {
        let harness = Self::new(configure).await;
        (harness, WriteBuffer::new())
    }

    async fn write(&mut self, page: TestPage, buffer: &mut WriteBuffer) -> PageReference {
        let mut reference = PageReference::new(Arc::new(page));
        self.writer
            .write(&self.trx, &mut reference, buffer)
            .await
            .unwrap();
        reference
    }

    async fn commit(&mut self, uber: TestPage, buffer: &mut WriteBuffer) -> PageReference {
        let mut reference = PageReference::new(Arc::new(uber));
        self.writer
            .write_uber_page(&self.trx, &mut reference, buffer)
            .await
            .unwrap();
        reference
    }

    fn data_bytes(&self) -> Vec<u8> {
        std::fs::read(self.config.data_file_path()).unwrap()
    }

    fn revisions_bytes(&self) -> Vec<u8> {
        std::fs::read(self.config.revisions_file_path()).unwrap()
    }
}

fn as_test_page(page: &SharedPage) -> &TestPage {
    page.as_any().downcast_ref::<TestPage>().unwrap()
}

// ---------------------------------------------------------------------------
// Layout of the first append
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_fragment_lands_past_the_beacon() {
    let (mut h, mut buffer) = Harness::data(|c| c.with_flush_size(1)).await;

    let page = TestPage::fragment(&[]);
    let serialized = page.serialized();
    let reference = h.write(page, &mut buffer).await;

    // The beacon prefix is skipped and advanced one full fragment step.
    assert_eq!(reference.key(), Some(520));

    let data = h.data_bytes();
    assert_eq!(data.len(), 524 + serialized.len());
    assert!(data[..520].iter().all(|&b| b == 0));
    assert_eq!(&data[520..524], &(serialized.len() as u32).to_ne_bytes());
    assert_eq!(&data[524..], &serialized[..]);
}

#[tokio::test]
async fn appends_are_strictly_monotonic() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    let mut last = 0;
    for i in 0..24u8 {
        let page = if i % 3 == 0 {
            TestPage::key_value(&vec![i; 1 + i as usize])
        } else {
            TestPage::fragment(&vec![i; 3 * i as usize])
        };
        let reference = h.write(page, &mut buffer).await;
        let key = reference.key().unwrap();
        assert!(key > last, "offset {key} not beyond {last}");
        assert_eq!(key % 8, 0);
        last = key;
    }
}

// ---------------------------------------------------------------------------
// Revision roots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn revision_root_is_aligned_indexed_and_cached() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    // 59 bytes of body make an 80-byte entry, leaving the next candidate
    // offset at 600, which is not a revision-root boundary.
    h.write(TestPage::fragment(&[7u8; 59]), &mut buffer).await;

    let timestamp = 1_700_000_000_123;
    let root = TestPage::revision_root(0, timestamp, b"rev0 root");
    let reference = h.write(root, &mut buffer).await;

    assert_eq!(reference.key(), Some(768));

    // The index record is written immediately, right behind the reserved
    // beacon region for the first revision.
    let revisions = h.revisions_bytes();
    assert_eq!(revisions.len(), 528);
    assert_eq!(&revisions[512..520], &768u64.to_ne_bytes());
    assert_eq!(&revisions[520..528], &timestamp.to_ne_bytes());

    let cached = h.writer.reader().cache().get(Revision::new(0)).unwrap();
    assert_eq!(cached.offset, 768);
    assert_eq!(cached.timestamp, Timestamp::from_millis(timestamp));
}

#[tokio::test]
async fn later_revisions_append_to_the_index() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    for revision in 0..3u32 {
        h.write(
            TestPage::revision_root(revision, 1_000 + i64::from(revision), b"root"),
            &mut buffer,
        )
        .await;
        h.commit(TestPage::uber(b"uber"), &mut buffer).await;
    }

    let revisions = h.revisions_bytes();
    assert_eq!(revisions.len(), 512 + 3 * 16);
    assert_eq!(h.writer.reader().revision_count().await.unwrap(), 3);

    for revision in 0..3u32 {
        let data = h
            .writer
            .reader()
            .revision_file_data(Revision::new(revision))
            .await
            .unwrap();
        assert_eq!(data.timestamp.as_millis(), 1_000 + i64::from(revision));
    }
}

// ---------------------------------------------------------------------------
// Commit sequence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn commit_writes_identical_uber_beacons() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    h.write(TestPage::fragment(b"payload"), &mut buffer).await;
    h.write(TestPage::revision_root(0, 42, b"root"), &mut buffer)
        .await;

    // 23 bytes of body serialize to 40, so one staged uber entry is
    // 4 + 40 + 56 = 100 bytes.
    let uber = TestPage::uber(&[9u8; 23]);
    let serialized = uber.serialized();
    assert_eq!(serialized.len(), 40);
    let reference = h.commit(uber, &mut buffer).await;

    // The second staged copy's offset is what the reference keeps.
    assert_eq!(reference.key(), Some(FIRST_BEACON / 2));

    // Both halves of the reserved region hold the serialized uber page.
    let (first, second) = h.writer.reader().uber_beacons().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(&first[..40], &serialized[..]);
    assert!(first[40..].iter().all(|&b| b == 0));

    // The staged entries went to the head of the data file.
    let data = h.data_bytes();
    assert_eq!(&data[0..4], &40u32.to_ne_bytes());
    assert_eq!(&data[4..44], &serialized[..]);
    assert_eq!(&data[100..104], &40u32.to_ne_bytes());
    assert_eq!(&data[104..144], &serialized[..]);
}

#[tokio::test]
async fn commit_flushes_pending_bytes_before_the_uber_page() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    let fragment = h.write(TestPage::fragment(&[1u8; 59]), &mut buffer).await;
    let root = h
        .write(TestPage::revision_root(0, 7, b"rev0 root"), &mut buffer)
        .await;
    h.commit(TestPage::uber(b"u"), &mut buffer).await;

    // Batched entries are on disk at the offsets their references record.
    let data = h.data_bytes();
    let fragment_at = fragment.key().unwrap() as usize;
    assert_eq!(&data[fragment_at..fragment_at + 4], &76u32.to_ne_bytes());

    let root_at = root.key().unwrap() as usize;
    assert_eq!(root_at, 768);
    let root_serialized = TestPage::revision_root(0, 7, b"rev0 root").serialized();
    assert_eq!(
        &data[root_at + 4..root_at + 4 + root_serialized.len()],
        &root_serialized[..]
    );
}

#[tokio::test]
async fn committed_revision_root_reads_back() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    let root = TestPage::revision_root(0, 1_700_000_000_000, b"the root");
    h.write(root.clone(), &mut buffer).await;
    h.commit(TestPage::uber(b"uber"), &mut buffer).await;

    let read = h
        .writer
        .read_revision_root(&h.trx, Revision::new(0))
        .await
        .unwrap();
    assert_eq!(as_test_page(&read), &root);
}

#[tokio::test]
async fn committed_uber_page_reads_back_from_the_beacon() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    h.write(TestPage::revision_root(0, 5, b"root"), &mut buffer)
        .await;
    let uber = TestPage::uber(b"current state");
    h.commit(uber.clone(), &mut buffer).await;

    let read = h.writer.read_uber_page(&h.trx).await.unwrap();
    assert_eq!(as_test_page(&read), &uber);
}

// ---------------------------------------------------------------------------
// Hashes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_key_value_pages_hash_their_serialized_bytes() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    let page = TestPage::fragment(b"fragment body");
    let serialized = page.serialized();
    let reference = h.write(page, &mut buffer).await;

    assert_eq!(reference.hash(), Some(hash_bytes(&serialized)));
}

#[tokio::test]
async fn key_value_pages_keep_their_own_hash() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    let page = TestPage::key_value(b"records");
    let own_hash = page.content_hash().unwrap();
    let serialized = page.serialized();
    let reference = h.write(page, &mut buffer).await;

    assert_eq!(reference.hash(), Some(own_hash));
    assert_ne!(reference.hash(), Some(hash_bytes(&serialized)));
}

// ---------------------------------------------------------------------------
// Flush threshold
// ---------------------------------------------------------------------------

#[tokio::test]
async fn crossing_the_threshold_flushes_once_and_swaps_the_buffer() {
    let (mut h, mut buffer) = Harness::data(|c| c.with_flush_size(100)).await;

    // Three 41-byte entries with 7 alignment bytes between them: staged
    // positions 41, 89, 137. Only the third write crosses the threshold.
    for _ in 0..3 {
        h.write(TestPage::fragment(&[5u8; 20]), &mut buffer).await;
    }

    assert_eq!(h.trx.buffers_created.load(Ordering::SeqCst), 1);
    assert_eq!(buffer.write_position(), 0);

    // The flushed batch starts at the first-append offset.
    let data = h.data_bytes();
    assert_eq!(data.len(), 520 + 137);
    assert_eq!(&data[520..524], &37u32.to_ne_bytes());
}

#[tokio::test]
async fn writes_below_the_threshold_stay_buffered() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    h.write(TestPage::fragment(b"small"), &mut buffer).await;

    assert_eq!(h.trx.buffers_created.load(Ordering::SeqCst), 0);
    assert!(buffer.write_position() > 0);
    assert!(!h.config.data_file_path().exists() || h.data_bytes().is_empty());
}

// ---------------------------------------------------------------------------
// Truncation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn truncate_to_cuts_behind_the_revision_root() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    h.write(TestPage::fragment(&[]), &mut buffer).await;
    let root = h
        .write(TestPage::revision_root(0, 11, b"abc"), &mut buffer)
        .await;
    h.commit(TestPage::uber(b"u"), &mut buffer).await;

    // A second committed revision extends the file past the first root.
    h.write(TestPage::fragment(&[2u8; 40]), &mut buffer).await;
    h.write(TestPage::revision_root(1, 12, b"defgh"), &mut buffer)
        .await;
    h.commit(TestPage::uber(b"u2"), &mut buffer).await;

    let root_offset = root.key().unwrap();
    let root_len = TestPage::revision_root(0, 11, b"abc").serialized().len() as u64;
    let expected_len = root_offset + 4 + root_len;

    h.writer.truncate_to(Revision::new(0)).await.unwrap();
    assert_eq!(h.data_bytes().len() as u64, expected_len);
}

#[tokio::test]
async fn truncate_to_loads_the_index_record_on_a_cache_miss() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::new(dir.path());
    let expected_len;

    {
        let mut writer =
            PageWriter::open(&config, Arc::new(TestPersister), SerializationKind::Data)
                .await
                .unwrap();
        let trx = TestTrx::default();
        let mut buffer = WriteBuffer::new();

        let mut root = PageReference::new(Arc::new(TestPage::revision_root(0, 3, b"root")));
        writer.write(&trx, &mut root, &mut buffer).await.unwrap();
        let mut uber = PageReference::new(Arc::new(TestPage::uber(b"u")));
        writer
            .write_uber_page(&trx, &mut uber, &mut buffer)
            .await
            .unwrap();
        writer.close().await.unwrap();

        let root_len = TestPage::revision_root(0, 3, b"root").serialized().len() as u64;
        expected_len = root.key().unwrap() + 4 + root_len;
    }

    // A fresh writer has an empty cache, so the lookup goes to the
    // revisions file.
    let mut writer = PageWriter::open(&config, Arc::new(TestPersister), SerializationKind::Data)
        .await
        .unwrap();
    assert!(writer.reader().cache().is_empty());

    writer.truncate_to(Revision::new(0)).await.unwrap();
    let len = std::fs::metadata(config.data_file_path()).unwrap().len();
    assert_eq!(len, expected_len);
    assert!(!writer.reader().cache().is_empty());
}

#[tokio::test]
async fn truncate_to_unknown_revision_is_fatal() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;
    h.write(TestPage::fragment(b"x"), &mut buffer).await;

    let err = h.writer.truncate_to(Revision::new(9)).await.unwrap_err();
    assert!(matches!(err, StorageError::FatalState { .. }));
}

#[tokio::test]
async fn truncate_is_idempotent() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    h.write(TestPage::revision_root(0, 1, b"root"), &mut buffer)
        .await;
    h.commit(TestPage::uber(b"u"), &mut buffer).await;

    h.writer.truncate().await.unwrap();
    h.writer.truncate().await.unwrap();

    assert!(h.data_bytes().is_empty());
    assert!(h.revisions_bytes().is_empty());
    assert!(h.writer.reader().cache().is_empty());
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_is_idempotent_and_poisons_writes() {
    let (mut h, mut buffer) = Harness::data(|c| c).await;

    h.write(TestPage::fragment(b"x"), &mut buffer).await;
    h.commit(TestPage::uber(b"u"), &mut buffer).await;

    h.writer.close().await.unwrap();
    h.writer.close().await.unwrap();

    let mut reference = PageReference::new(Arc::new(TestPage::fragment(b"y")));
    let err = h
        .writer
        .write(&h.trx, &mut reference, &mut buffer)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::FatalState { .. }));
}

// ---------------------------------------------------------------------------
// Intent-log sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn intent_log_writes_are_unaligned_and_side_effect_free() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::new(dir.path());
    let mut writer = PageWriter::open(
        &config,
        Arc::new(TestPersister),
        SerializationKind::TransactionIntentLog,
    )
    .await
    .unwrap();
    let trx = TestTrx::default();
    let mut buffer = WriteBuffer::new();

    let mut odd = PageReference::new(Arc::new(TestPage::fragment(&[1u8; 3])));
    writer.write(&trx, &mut odd, &mut buffer).await.unwrap();

    let mut root = PageReference::new(Arc::new(TestPage::revision_root(0, 1, b"root")));
    writer.write(&trx, &mut root, &mut buffer).await.unwrap();

    // Offsets land in the log key and follow the previous entry with no
    // padding at all.
    assert_eq!(odd.log_key(), Some(520));
    assert!(odd.key().is_none());
    assert_eq!(root.log_key(), Some(520 + 4 + 20));

    // No revision indexing happens for intent-log sessions.
    assert_eq!(
        std::fs::metadata(config.revisions_file_path()).unwrap().len(),
        0
    );
    assert!(writer.reader().cache().is_empty());
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

#[tokio::test]
async fn compressed_resources_round_trip() {
    let (mut h, mut buffer) =
        Harness::data(|c| c.with_compression(Compression::Zstd { level: 3 })).await;

    let body: Vec<u8> = (0..2048u32).map(|i| (i % 5) as u8).collect();
    let root = TestPage::revision_root(0, 77, &body);
    let reference = h.write(root.clone(), &mut buffer).await;
    let uber = TestPage::uber(b"compressed uber");
    h.commit(uber.clone(), &mut buffer).await;

    // The compressed payload, not the serialized page, is hashed.
    let plain_hash = hash_bytes(&root.serialized());
    assert_ne!(reference.hash(), Some(plain_hash));

    let read = h
        .writer
        .read_revision_root(&h.trx, Revision::new(0))
        .await
        .unwrap();
    assert_eq!(as_test_page(&read), &root);

    // Beacon reads decode despite the zero padding after the frame.
    let read = h.writer.read_uber_page(&h.trx).await.unwrap();
    assert_eq!(as_test_page(&read), &uber);
}
