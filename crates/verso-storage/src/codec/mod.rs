//! Byte-transform layer.
//!
//! Serialized page bytes pass through a configured chain of transforms
//! before they are length-prefixed and appended to the data file. The
//! reader applies the same chain in reverse, so the chain is built once per
//! resource and shared between the reader and the writer.

use std::io::{Read, Write};

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors from encoding or decoding a payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A transform failed to process the payload.
    #[error("{codec} {operation} failed: {source}")]
    Transform {
        /// Codec name.
        codec: &'static str,
        /// "encode" or "decode".
        operation: &'static str,
        /// Underlying failure.
        source: std::io::Error,
    },
}

impl CodecError {
    fn transform(codec: &'static str, operation: &'static str, source: std::io::Error) -> Self {
        Self::Transform {
            codec,
            operation,
            source,
        }
    }
}

/// A single byte transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteCodec {
    /// Pass bytes through unchanged.
    Identity,
    /// Zstandard compression at the given level.
    Zstd {
        /// Compression level, 1..=21.
        level: i32,
    },
}

impl ByteCodec {
    /// Applies the transform in the write direction.
    pub fn encode(&self, input: &[u8]) -> CodecResult<Vec<u8>> {
        match self {
            Self::Identity => Ok(input.to_vec()),
            Self::Zstd { level } => {
                let mut compressed = Vec::new();
                let mut encoder = zstd::stream::Encoder::new(&mut compressed, *level)
                    .map_err(|e| CodecError::transform("zstd", "encode", e))?;
                encoder
                    .write_all(input)
                    .map_err(|e| CodecError::transform("zstd", "encode", e))?;
                encoder
                    .finish()
                    .map_err(|e| CodecError::transform("zstd", "encode", e))?;
                Ok(compressed)
            }
        }
    }

    /// Applies the transform in the read direction.
    pub fn decode(&self, input: &[u8]) -> CodecResult<Vec<u8>> {
        match self {
            Self::Identity => Ok(input.to_vec()),
            Self::Zstd { .. } => {
                // Single-frame mode tolerates the zero padding that follows
                // payloads read back from aligned or beacon regions.
                let mut decoder = zstd::stream::Decoder::new(input)
                    .map_err(|e| CodecError::transform("zstd", "decode", e))?
                    .single_frame();
                let mut decompressed = Vec::new();
                decoder
                    .read_to_end(&mut decompressed)
                    .map_err(|e| CodecError::transform("zstd", "decode", e))?;
                Ok(decompressed)
            }
        }
    }
}

/// An ordered chain of byte transforms.
///
/// `encode` applies the transforms front to back; `decode` applies their
/// inverses back to front.
#[derive(Debug, Clone, Default)]
pub struct CodecChain {
    codecs: Vec<ByteCodec>,
}

impl CodecChain {
    /// An empty chain that leaves payloads untouched.
    #[must_use]
    pub fn identity() -> Self {
        Self { codecs: vec![] }
    }

    /// Creates a chain from the given transforms.
    #[must_use]
    pub fn new(codecs: Vec<ByteCodec>) -> Self {
        Self { codecs }
    }

    /// Appends a transform to the end of the chain.
    #[must_use]
    pub fn with(mut self, codec: ByteCodec) -> Self {
        self.codecs.push(codec);
        self
    }

    /// Transforms serialized page bytes into the on-disk payload.
    pub fn encode(&self, input: &[u8]) -> CodecResult<Vec<u8>> {
        let mut payload = input.to_vec();
        for codec in &self.codecs {
            payload = codec.encode(&payload)?;
        }
        Ok(payload)
    }

    /// Transforms an on-disk payload back into serialized page bytes.
    pub fn decode(&self, input: &[u8]) -> CodecResult<Vec<u8>> {
        let mut payload = input.to_vec();
        for codec in self.codecs.iter().rev() {
            payload = codec.decode(&payload)?;
        }
        Ok(payload)
    }
}
