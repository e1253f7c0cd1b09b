//! The async file interface.

use std::path::Path;

use super::error::{IoError, IoResult};

/// Position-based async file operations.
///
/// All reads and writes take an absolute offset, so no operation depends on
/// a shared cursor and concurrent readers never interfere. Implementations
/// resolve each future via a kernel- or pool-backed completion mechanism;
/// callers await every operation before issuing the next dependent one.
#[allow(async_fn_in_trait)]
pub trait StorageFile: Send + Sync {
    /// Returns the file path.
    fn path(&self) -> &Path;

    /// Returns the current file size in bytes.
    async fn size(&self) -> IoResult<u64>;

    /// Reads into `buf` starting at `offset`.
    ///
    /// Returns the number of bytes read, which may be less than the buffer
    /// length at end of file.
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> IoResult<usize>;

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    async fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> IoResult<()> {
        let mut total = 0;
        while total < buf.len() {
            let n = self.read_at(&mut buf[total..], offset + total as u64).await?;
            if n == 0 {
                return Err(IoError::short_read(buf.len(), total));
            }
            total += n;
        }
        Ok(())
    }

    /// Writes `buf` starting at `offset`, extending the file as needed.
    ///
    /// Returns the number of bytes written.
    async fn write_at(&self, buf: &[u8], offset: u64) -> IoResult<usize>;

    /// Writes all of `buf` starting at `offset`.
    async fn write_all_at(&self, buf: &[u8], offset: u64) -> IoResult<()> {
        let mut total = 0;
        while total < buf.len() {
            let n = self.write_at(&buf[total..], offset + total as u64).await?;
            if n == 0 {
                return Err(IoError::short_write(buf.len(), total));
            }
            total += n;
        }
        Ok(())
    }

    /// Syncs data and metadata to stable storage.
    async fn sync(&self) -> IoResult<()>;

    /// Syncs data only, establishing the durability boundary for all prior
    /// writes on this file.
    async fn datasync(&self) -> IoResult<()>;

    /// Truncates or extends the file to `len` bytes.
    async fn set_len(&self, len: u64) -> IoResult<()>;
}
