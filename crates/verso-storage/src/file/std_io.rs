//! Tokio-backed file implementation.
//!
//! Wraps a standard file and dispatches every operation to tokio's blocking
//! pool. Each call seeks and transfers under a mutex, so the shared cursor
//! is never observed in an intermediate state even when a reader and the
//! writer touch the same handle.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task;

use super::error::{IoError, IoResult};
use super::handle::StorageFile;
use super::options::OpenOptions;

/// A resource file backed by a standard file handle.
pub struct StdFile {
    file: Arc<Mutex<File>>,
    path: PathBuf,
    writable: bool,
}

impl StdFile {
    /// Opens a file with the given options.
    pub async fn open(path: impl AsRef<Path>, options: OpenOptions) -> IoResult<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let writable = options.is_write();

        let open_path = path.clone();
        let file = task::spawn_blocking(move || {
            options
                .to_std_options()
                .open(&open_path)
                .map_err(|e| IoError::from_io_with_path(e, &open_path))
        })
        .await
        .map_err(IoError::task_failed)??;

        Ok(Arc::new(Self {
            file: Arc::new(Mutex::new(file)),
            path,
            writable,
        }))
    }

    async fn with_file<T, F>(&self, op: F) -> IoResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut File) -> IoResult<T> + Send + 'static,
    {
        let file = Arc::clone(&self.file);
        task::spawn_blocking(move || {
            let mut file = file.lock();
            op(&mut file)
        })
        .await
        .map_err(IoError::task_failed)?
    }

    fn require_writable(&self, operation: &'static str) -> IoResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(IoError::InvalidOperation {
                operation,
                mode: "read-only",
            })
        }
    }
}

impl StorageFile for StdFile {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn size(&self) -> IoResult<u64> {
        self.with_file(|file| Ok(file.metadata()?.len())).await
    }

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> IoResult<usize> {
        let len = buf.len();
        let (n, owned) = self
            .with_file(move |file| {
                let mut owned = vec![0u8; len];
                file.seek(SeekFrom::Start(offset))?;
                let n = file.read(&mut owned)?;
                Ok((n, owned))
            })
            .await?;
        buf[..n].copy_from_slice(&owned[..n]);
        Ok(n)
    }

    async fn write_at(&self, buf: &[u8], offset: u64) -> IoResult<usize> {
        self.require_writable("write")?;
        let owned = buf.to_vec();
        self.with_file(move |file| {
            file.seek(SeekFrom::Start(offset))?;
            Ok(file.write(&owned)?)
        })
        .await
    }

    async fn sync(&self) -> IoResult<()> {
        self.with_file(|file| Ok(file.sync_all()?)).await
    }

    async fn datasync(&self) -> IoResult<()> {
        self.with_file(|file| Ok(file.sync_data()?)).await
    }

    async fn set_len(&self, len: u64) -> IoResult<()> {
        self.require_writable("set_len")?;
        self.with_file(move |file| Ok(file.set_len(len)?)).await
    }
}

impl std::fmt::Debug for StdFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdFile")
            .field("path", &self.path)
            .field("writable", &self.writable)
            .finish()
    }
}
