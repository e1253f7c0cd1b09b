//! Core types shared across verso components.

mod hash;
mod revision;
mod timestamps;

pub use hash::{hash_bytes, PageHash};
pub use revision::Revision;
pub use timestamps::Timestamp;
