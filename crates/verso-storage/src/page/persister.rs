//! The pluggable page persistence codec.

use bytes::BytesMut;

use crate::error::StorageResult;
use crate::io::{PageTransaction, SerializationKind};

use super::{Page, SharedPage};

/// Transforms in-memory pages into bytes and back.
///
/// The storage layer never interprets the produced bytes; it only
/// length-prefixes them (after the byte-transform chain) on the way to
/// disk. Implementations may consult the transaction for read-only page
/// state needed during serialization.
pub trait PagePersister: Send + Sync {
    /// Appends the serialized form of `page` to `out`.
    fn serialize_page(
        &self,
        trx: &dyn PageTransaction,
        out: &mut BytesMut,
        page: &dyn Page,
        kind: SerializationKind,
    ) -> StorageResult<()>;

    /// Reconstructs a page from bytes produced by `serialize_page`.
    ///
    /// `bytes` may carry trailing zero padding when read from an aligned
    /// or beacon region; implementations must be self-delimiting.
    fn deserialize_page(
        &self,
        trx: &dyn PageTransaction,
        bytes: &[u8],
        kind: SerializationKind,
    ) -> StorageResult<SharedPage>;
}
