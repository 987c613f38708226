//! Error types for octree construction.

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// A stage of the construction pipeline.
///
/// Every stage runs to completion before the next one starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reduction of the points to a bounding box.
    BoundingBox,
    /// Computation of the point codes.
    Encode,
    /// Sorting of codes or keys.
    Sort,
    /// Reordering of points into code order.
    Permute,
    /// Flagging and scanning of distinct keys.
    MarkDuplicates,
    /// Collection of the distinct keys and their point ranges.
    UniqueNodes,
    /// Flagging and scanning of sibling blocks.
    SiblingScan,
    /// Materialization of the sibling blocks.
    NodeSetup,
    /// Filling of point ranges and child links.
    NodeFill,
    /// Backfill of parent links into the finer level.
    ParentBackfill,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::BoundingBox => "bounding box",
            Stage::Encode => "encode",
            Stage::Sort => "sort",
            Stage::Permute => "permute",
            Stage::MarkDuplicates => "mark duplicates",
            Stage::UniqueNodes => "unique nodes",
            Stage::SiblingScan => "sibling scan",
            Stage::NodeSetup => "node setup",
            Stage::NodeFill => "node fill",
            Stage::ParentBackfill => "parent backfill",
        };
        write!(f, "{}", name)
    }
}

/// Main error type for octree construction.
#[derive(Debug, Error)]
pub enum OctreeError {
    /// The requested depth cannot be represented by a key.
    #[error("octree depth {depth} is outside of the supported range [1, {max}]")]
    InvalidDepth {
        /// Requested depth.
        depth: usize,
        /// Deepest supported depth.
        max: usize,
    },

    /// The root box has no volume or non-finite bounds.
    #[error("degenerate root box: {0}")]
    DegenerateBox(String),

    /// A coordinate is NaN or infinite.
    #[error("point {index} has a non-finite coordinate")]
    NonFinitePoint {
        /// Index of the point in caller order.
        index: usize,
    },

    /// A point is not contained in a caller provided root box.
    #[error("point {index} lies outside of the root box")]
    PointOutsideBox {
        /// Index of the point in caller order.
        index: usize,
    },

    /// The point ids do not fit into a code.
    #[error("{npoints} points exceed the {max} point ids a code can hold")]
    TooManyPoints {
        /// Number of points supplied.
        npoints: usize,
        /// Number of representable ids.
        max: u64,
    },

    /// A flat coordinate buffer does not hold whole points.
    #[error("flat point buffer of length {len} is not a multiple of 3")]
    InvalidPointBuffer {
        /// Length of the buffer.
        len: usize,
    },

    /// Per-point data does not match the number of points in the tree.
    #[error("expected {expected} values, one per point, got {actual}")]
    LengthMismatch {
        /// Number of points in the tree.
        expected: usize,
        /// Length of the supplied data.
        actual: usize,
    },

    /// A scan-sized buffer could not be allocated.
    #[error("allocation of {len} elements failed in stage '{stage}'")]
    Allocation {
        /// Stage that requested the buffer.
        stage: Stage,
        /// Requested number of elements.
        len: usize,
        /// Underlying allocator error.
        #[source]
        source: TryReserveError,
    },

    /// A builder step was requested out of order.
    #[error("cannot {requested} while the builder is in state {state}")]
    InvalidTransition {
        /// State of the builder.
        state: crate::octree::BuildState,
        /// The requested step.
        requested: &'static str,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OctreeError>;

/// Allocate an empty vector with exactly `len` elements of capacity.
///
/// Scan totals determine every buffer size up front, so a failed
/// reservation is reported together with the stage that requested it.
pub fn try_alloc<T>(len: usize, stage: Stage) -> Result<Vec<T>> {
    let mut buffer = Vec::<T>::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|source| OctreeError::Allocation { stage, len, source })?;
    Ok(buffer)
}

/// Allocate a vector of `len` copies of `value`.
pub fn try_filled<T: Clone>(len: usize, value: T, stage: Stage) -> Result<Vec<T>> {
    let mut buffer = try_alloc(len, stage)?;
    buffer.resize(len, value);
    Ok(buffer)
}

#[cfg(test)]
mod test {
    use super::{try_alloc, try_filled, OctreeError, Stage};

    #[test]
    fn test_try_alloc() {
        let buffer = try_alloc::<u64>(17, Stage::Encode).unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 17);

        let filled = try_filled(5, 3_usize, Stage::NodeSetup).unwrap();
        assert_eq!(filled, vec![3; 5]);
    }

    #[test]
    fn test_failed_allocation_names_stage() {
        let err = try_alloc::<u64>(usize::MAX, Stage::SiblingScan).unwrap_err();
        match err {
            OctreeError::Allocation { stage, len, .. } => {
                assert_eq!(stage, Stage::SiblingScan);
                assert_eq!(len, usize::MAX);
            }
            other => panic!("unexpected error {}", other),
        }
        let err = try_alloc::<u64>(usize::MAX, Stage::SiblingScan).unwrap_err();
        assert!(err.to_string().contains("sibling scan"));
    }
}
