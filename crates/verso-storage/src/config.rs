//! Resource storage configuration.

use std::path::PathBuf;

use verso_common::{FLUSH_SIZE, INITIAL_WRITE_BUFFER_CAPACITY};

use crate::codec::{ByteCodec, CodecChain};

/// Compression applied to page payloads by the byte-transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Store payloads uncompressed.
    None,
    /// Zstandard at the given level.
    Zstd {
        /// Compression level, 1..=21.
        level: i32,
    },
}

impl Default for Compression {
    fn default() -> Self {
        Self::None
    }
}

/// Configuration for one stored resource.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding the resource's files.
    pub dir: PathBuf,

    /// Payload compression.
    pub compression: Compression,

    /// Write-buffer byte threshold that triggers a flush.
    pub flush_size: usize,

    /// Initial capacity of freshly created write buffers.
    pub write_buffer_capacity: usize,
}

impl StorageConfig {
    /// Creates a configuration for the given resource directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            compression: Compression::default(),
            flush_size: FLUSH_SIZE,
            write_buffer_capacity: INITIAL_WRITE_BUFFER_CAPACITY,
        }
    }

    /// Sets the payload compression.
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the flush threshold.
    #[must_use]
    pub fn with_flush_size(mut self, flush_size: usize) -> Self {
        self.flush_size = flush_size;
        self
    }

    /// Sets the initial write-buffer capacity.
    #[must_use]
    pub fn with_write_buffer_capacity(mut self, capacity: usize) -> Self {
        self.write_buffer_capacity = capacity;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.flush_size == 0 {
            return Err("flush size must be positive".to_string());
        }
        if let Compression::Zstd { level } = self.compression {
            if !(1..=21).contains(&level) {
                return Err(format!("zstd level {level} out of range 1..=21"));
            }
        }
        Ok(())
    }

    /// Path of the append-only data file.
    pub fn data_file_path(&self) -> PathBuf {
        self.dir.join("resource.verso")
    }

    /// Path of the revisions index file.
    pub fn revisions_file_path(&self) -> PathBuf {
        self.dir.join("revisions.verso")
    }

    /// Builds the byte-transform chain shared by reader and writer.
    pub fn codec_chain(&self) -> CodecChain {
        match self.compression {
            Compression::None => CodecChain::identity(),
            Compression::Zstd { level } => CodecChain::identity().with(ByteCodec::Zstd { level }),
        }
    }
}
