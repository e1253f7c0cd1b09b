//! Alignment and layout policy.
//!
//! Each page class starts (or, for uber pages, ends) on its own alignment
//! boundary in the data file. Power-of-two alignments use bitmask
//! arithmetic; the uber alignment of 100 is not a power of two and uses
//! modulo. These are pure functions: the writer applies the returned
//! padding, the policy itself never touches the file.

use verso_common::{
    FIRST_BEACON, OTHER_BEACON, PAGE_FRAGMENT_BYTE_ALIGN, REVISION_ROOT_PAGE_BYTE_ALIGN,
    UBER_PAGE_BYTE_ALIGN,
};

use crate::page::PageKind;

use super::SerializationKind;

/// Where a page entry lands and how much padding surrounds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// Byte offset the length prefix will start at, after before-padding.
    pub offset: u64,
    /// Zero bytes inserted ahead of the length prefix.
    pub pad_before: u64,
    /// Zero bytes appended behind the payload (uber pages only).
    pub pad_after: u64,
}

/// Offset of the first entry appended to an empty data file.
///
/// The reserved beacon prefix is skipped and the result advanced to the
/// next fragment boundary. The advance is unconditional, so an already
/// aligned beacon size still moves a full step.
#[must_use]
pub fn first_append_offset() -> u64 {
    FIRST_BEACON + (PAGE_FRAGMENT_BYTE_ALIGN - (FIRST_BEACON & (PAGE_FRAGMENT_BYTE_ALIGN - 1)))
}

/// Computes the layout for one page entry.
///
/// Intent-log writes are unaligned. For data writes, uber pages pad after
/// the payload so the whole entry is a multiple of the uber alignment;
/// revision roots and fragments pad before the length prefix up to their
/// class boundary.
#[must_use]
pub fn page_layout(
    kind: PageKind,
    serialization: SerializationKind,
    offset: u64,
    payload_len: usize,
) -> PageLayout {
    if serialization != SerializationKind::Data {
        return PageLayout {
            offset,
            pad_before: 0,
            pad_after: 0,
        };
    }

    match kind {
        PageKind::Uber => {
            let entry = payload_len as u64 + OTHER_BEACON;
            let pad_after = UBER_PAGE_BYTE_ALIGN - (entry % UBER_PAGE_BYTE_ALIGN);
            PageLayout {
                offset,
                pad_before: 0,
                pad_after,
            }
        }
        PageKind::RevisionRoot if offset % REVISION_ROOT_PAGE_BYTE_ALIGN != 0 => {
            let pad_before =
                REVISION_ROOT_PAGE_BYTE_ALIGN - (offset & (REVISION_ROOT_PAGE_BYTE_ALIGN - 1));
            PageLayout {
                offset: offset + pad_before,
                pad_before,
                pad_after: 0,
            }
        }
        PageKind::KeyValue | PageKind::Fragment if offset % PAGE_FRAGMENT_BYTE_ALIGN != 0 => {
            let pad_before = PAGE_FRAGMENT_BYTE_ALIGN - (offset & (PAGE_FRAGMENT_BYTE_ALIGN - 1));
            PageLayout {
                offset: offset + pad_before,
                pad_before,
                pad_after: 0,
            }
        }
        _ => PageLayout {
            offset,
            pad_before: 0,
            pad_after: 0,
        },
    }
}
