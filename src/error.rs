//! Error types shared by every container in the crate.
//!
//! Absence of a key is never an error: lookups return `Option` and
//! removals return `bool`. The variants here cover the few outcomes a
//! caller has to react to.

use thiserror::Error;

/// Errors reported by the containers.
///
/// # Examples
///
/// ```rust
/// use tessera::CollectionError;
///
/// let error = CollectionError::AllocationFailed { requested: 1543 };
/// assert_eq!(
///     format!("{error}"),
///     "allocation of 1543 additional slots failed"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// Growing internal storage could not reserve memory.
    #[error("allocation of {requested} additional slots failed")]
    AllocationFailed {
        /// Number of slots that were requested.
        requested: usize,
    },

    /// A container would grow past the largest size `usize` can express.
    #[error("growing beyond {current} slots overflows the address space")]
    CapacityOverflow {
        /// Slot count at the time of the failed growth.
        current: usize,
    },

    /// The comparator of a map cannot be replaced once entries are stored,
    /// because the existing layout depends on the old ordering.
    #[error("cannot replace the comparator of a map holding {len} entries")]
    ComparatorOnPopulatedMap {
        /// Number of entries stored when the change was attempted.
        len: usize,
    },

    /// A positional operation addressed an element past the end.
    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the container at the time of the call.
        len: usize,
    },
}

impl CollectionError {
    /// Builds an [`AllocationFailed`](Self::AllocationFailed) error from a
    /// failed `try_reserve`.
    pub(crate) fn allocation(requested: usize, source: &std::collections::TryReserveError) -> Self {
        tracing::warn!(requested, %source, "storage reservation failed");
        Self::AllocationFailed { requested }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_allocation_failed_display() {
        let error = CollectionError::AllocationFailed { requested: 3 };
        assert_eq!(format!("{error}"), "allocation of 3 additional slots failed");
    }

    #[rstest]
    fn test_capacity_overflow_display() {
        let error = CollectionError::CapacityOverflow { current: 9 };
        assert_eq!(
            format!("{error}"),
            "growing beyond 9 slots overflows the address space"
        );
    }

    #[rstest]
    fn test_comparator_on_populated_map_display() {
        let error = CollectionError::ComparatorOnPopulatedMap { len: 7 };
        assert_eq!(
            format!("{error}"),
            "cannot replace the comparator of a map holding 7 entries"
        );
    }

    #[rstest]
    fn test_index_out_of_bounds_display() {
        let error = CollectionError::IndexOutOfBounds { index: 4, len: 2 };
        assert_eq!(format!("{error}"), "index 4 is out of bounds for length 2");
    }

    #[rstest]
    fn test_allocation_from_try_reserve_error() {
        let mut buffer: Vec<u64> = Vec::new();
        let source = buffer
            .try_reserve(usize::MAX)
            .expect_err("reserving usize::MAX elements must fail");
        assert_eq!(
            CollectionError::allocation(usize::MAX, &source),
            CollectionError::AllocationFailed {
                requested: usize::MAX
            }
        );
    }
}
