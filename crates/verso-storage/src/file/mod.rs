//! Async file layer.
//!
//! Every operation the reader and writer perform against a resource file
//! goes through [`StorageFile`], a position-based (pread/pwrite style)
//! async interface resolved on tokio's blocking pool. The writer awaits
//! each returned future to completion before continuing, so file
//! operations within one writer are strictly serial.

mod error;
mod handle;
mod options;
mod std_io;

pub use error::{IoError, IoResult};
pub use handle::StorageFile;
pub use options::OpenOptions;
pub use std_io::StdFile;
