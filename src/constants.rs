//! Crate wide constants.

/// Deepest supported octree level.
///
/// A key holds 3 bits per level and must fit into the upper 32 bits of a code.
pub const MAX_OCTREE_DEPTH: usize = 10;

/// Number of children of an internal node.
pub const NSIBLINGS: usize = 8;

/// Number of bits per level in a key.
pub const LEVEL_BITS: usize = 3;

/// Mask for a single level of a key.
pub const LEVEL_MASK: u32 = 0b111;

/// Shift of the key inside a code.
pub const CODE_KEY_SHIFT: u32 = 32;

/// Mask of the point id inside a code.
pub const CODE_ID_MASK: u64 = 0xFFFF_FFFF;

/// Largest number of points a tree can index.
pub const MAX_POINTS: u64 = 1 << 32;

/// Oversampling factor when picking splitters for the parallel sort.
pub const OVERSAMPLING: usize = 8;

/// Below this size the parallel sort falls back to a single sort call.
pub const PARSORT_THRESHOLD: usize = 4096;

/// Upper bound on the number of buckets of the parallel sort.
pub const MAX_SORT_BUCKETS: usize = 1024;
