//! # verso-storage
//!
//! Append-only page storage for the verso versioned storage engine.
//!
//! A resource is persisted as two files kept mutually consistent:
//!
//! - the **data file**, an append-only log of length-prefixed, optionally
//!   compressed page payloads laid out with per-class alignment rules
//! - the **revisions index file**, one fixed-size `(offset, timestamp)`
//!   record per committed revision plus a reserved beacon region holding two
//!   copies of the session's first uber page
//!
//! The [`io::PageWriter`] appends pages through an elastic write buffer and
//! makes commits durable with a dual uber-page write followed by a data
//! sync; the [`io::PageReader`] resolves committed pages and revisions back
//! out of the same layout.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod file;
pub mod io;
pub mod page;

pub use cache::{RevisionDataCache, RevisionFileData};
pub use codec::{ByteCodec, CodecChain};
pub use config::{Compression, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use io::{PageReader, PageTransaction, PageWriter, SerializationKind, WriteBuffer};
pub use page::{Page, PageKind, PagePersister, PageReference, SharedPage};
