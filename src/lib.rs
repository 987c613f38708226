//! Data-parallel construction of complete octrees over 3D point sets.
//!
//! Points are encoded into keys on the leaf level, sorted and compacted into
//! sibling-complete node arrays. Coarser levels are built from the distinct
//! parent keys of the next finer level until a single root remains.
#![cfg_attr(feature = "strict", deny(warnings), deny(unused_crate_dependencies))]
#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod geometry;
pub mod morton;
pub mod octree;
pub mod parsort;
pub mod tools;

pub use error::{OctreeError, Result};
pub use octree::{BuildState, NodeArray, Octree, OctreeBuilder, OctreeOptions};
