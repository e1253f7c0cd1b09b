//! The elastic write buffer.
//!
//! Serialized page entries accumulate here between flushes. The write
//! position equals the number of unflushed bytes; flushing consumes the
//! buffer by value, so its storage moves into the in-flight write and the
//! transaction supplies a fresh instance for subsequent appends.

use bytes::{BufMut, Bytes, BytesMut};

use verso_common::INITIAL_WRITE_BUFFER_CAPACITY;

/// An elastic byte buffer for staging page entries.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    bytes: BytesMut,
}

impl WriteBuffer {
    /// Creates a buffer with the default initial capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_WRITE_BUFFER_CAPACITY)
    }

    /// Creates a buffer with the given initial capacity. The buffer grows
    /// past it as needed.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of unflushed bytes.
    #[inline]
    pub fn write_position(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if nothing is staged.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Advances the write position by `n` zero bytes. Used for
    /// before-padding of aligned page entries.
    pub fn reserve_zeroed(&mut self, n: usize) {
        self.bytes.put_bytes(0, n);
    }

    /// Appends a `u32` in native byte order.
    pub fn put_u32_native(&mut self, value: u32) {
        self.bytes.put_u32_ne(value);
    }

    /// Appends raw bytes.
    pub fn put_slice(&mut self, slice: &[u8]) {
        self.bytes.put_slice(slice);
    }

    /// Consumes the buffer, handing its storage to the caller.
    #[must_use]
    pub fn freeze(self) -> Bytes {
        self.bytes.freeze()
    }

    /// Drops all staged bytes, keeping the storage.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// The staged bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}
