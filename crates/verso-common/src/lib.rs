//! # verso-common
//!
//! Common types, constants, and utilities for the verso storage engine.
//!
//! This crate provides the foundational pieces shared across all verso
//! components:
//!
//! - **Types**: `Revision`, `Timestamp`, and the `PageHash` content hash
//! - **Constants**: the on-disk binary contract (alignment moduli, beacon
//!   sizes, flush threshold)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::{hash_bytes, PageHash, Revision, Timestamp};
