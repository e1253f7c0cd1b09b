//! Revision numbers.
//!
//! A revision identifies one committed version of a resource. Revisions are
//! assigned densely starting at zero; the revisions index file stores exactly
//! one record per revision, so a revision number doubles as an index into
//! that file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A committed revision number of a resource.
///
/// # Example
///
/// ```rust
/// use verso_common::Revision;
///
/// let rev = Revision::new(3);
/// assert_eq!(rev.as_u32(), 3);
/// assert!(!rev.is_first());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Revision(u32);

impl Revision {
    /// The first revision of every resource.
    pub const FIRST: Self = Self(0);

    /// Creates a revision from a raw number.
    #[inline]
    #[must_use]
    pub const fn new(revision: u32) -> Self {
        Self(revision)
    }

    /// Returns the raw revision number.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the next revision.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns true for the first revision of a resource.
    ///
    /// The first revision is special on disk: its index record is placed
    /// right behind the reserved beacon region.
    #[inline]
    #[must_use]
    pub const fn is_first(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Revision {
    #[inline]
    fn from(revision: u32) -> Self {
        Self::new(revision)
    }
}

impl From<Revision> for u32 {
    #[inline]
    fn from(revision: Revision) -> Self {
        revision.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_revision() {
        assert!(Revision::FIRST.is_first());
        assert!(!Revision::new(1).is_first());
    }

    #[test]
    fn test_ordering() {
        let r0 = Revision::new(0);
        let r1 = r0.next();
        assert!(r1 > r0);
        assert_eq!(r1.as_u32(), 1);
    }

    #[test]
    fn test_next_saturates() {
        let max = Revision::new(u32::MAX);
        assert_eq!(max.next(), max);
    }
}
