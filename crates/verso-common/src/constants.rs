//! The on-disk binary contract for verso resources.
//!
//! A verso resource is stored as two files: an append-only data file holding
//! length-prefixed page payloads, and a revisions index file holding one
//! fixed-size record per committed revision. The constants below define the
//! alignment classes and reserved regions both files are laid out with.
//! Changing any of them invalidates every existing resource.

// =============================================================================
// Page alignment classes
// =============================================================================

/// Alignment modulus for uber pages.
///
/// Uber pages are padded *after* the payload so that the full entry
/// (length prefix + payload + padding) is a multiple of this. Not a power
/// of two, so offsets in this class are computed with modulo arithmetic.
pub const UBER_PAGE_BYTE_ALIGN: u64 = 100;

/// Alignment modulus for revision root pages. Must be a power of two.
pub const REVISION_ROOT_PAGE_BYTE_ALIGN: u64 = 256;

/// Alignment modulus for all other data pages. Must be a power of two.
pub const PAGE_FRAGMENT_BYTE_ALIGN: u64 = 8;

// =============================================================================
// File regions
// =============================================================================

/// Reserved prefix of each resource file, in bytes. Always even.
///
/// In the revisions file this region holds two copies of the session's
/// first uber page, each occupying half of it, so a torn write of one copy
/// leaves the other intact.
pub const FIRST_BEACON: u64 = 512;

/// Size of the per-entry length prefix in the data file, in bytes.
pub const OTHER_BEACON: u64 = 4;

/// Size of one `(offset, timestamp)` record in the revisions index file.
pub const REVISION_RECORD_SIZE: u64 = 16;

// =============================================================================
// Write buffering
// =============================================================================

/// Buffer byte threshold that triggers a flush to the data file.
pub const FLUSH_SIZE: usize = 64_000;

/// Initial capacity of a freshly created write buffer.
pub const INITIAL_WRITE_BUFFER_CAPACITY: usize = 1_000;
