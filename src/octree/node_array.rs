//! Sibling-complete arrays of nodes on a single level.

use std::fmt;
use std::ops::Range;

use crate::{
    geometry::PhysicalBox,
    morton::{box_from_key, parent_key, KeyType},
    tools::siblings_per_block,
};

/// All nodes of one octree level.
///
/// Nodes are sorted by key and grouped into consecutive blocks of
/// [NSIBLINGS](crate::constants::NSIBLINGS) siblings, one block per parent, including
/// empty siblings. The root level holds exactly one node.
///
/// Nodes are addressed by their index into the arrays. Geometry is not stored;
/// use [NodeArray::node_box] to reconstruct it from the key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeArray {
    level: usize,
    max_depth: usize,
    keys: Vec<KeyType>,
    parents: Vec<Option<usize>>,
    first_child: Vec<Option<usize>>,
    pt_start: Vec<usize>,
    pt_count: Vec<usize>,
}

impl NodeArray {
    /// Create the leaf level from keys and point ranges.
    pub(crate) fn new_leaf_level(
        level: usize,
        max_depth: usize,
        keys: Vec<KeyType>,
        pt_start: Vec<usize>,
        pt_count: Vec<usize>,
        parents: Vec<Option<usize>>,
    ) -> Self {
        debug_assert_eq!(keys.len(), pt_start.len());
        debug_assert_eq!(keys.len(), pt_count.len());
        debug_assert_eq!(keys.len(), parents.len());
        Self {
            level,
            max_depth,
            keys,
            parents,
            first_child: Vec::new(),
            pt_start,
            pt_count,
        }
    }

    /// Create an internal level from keys and child links.
    pub(crate) fn new_internal_level(
        level: usize,
        max_depth: usize,
        keys: Vec<KeyType>,
        first_child: Vec<Option<usize>>,
        parents: Vec<Option<usize>>,
    ) -> Self {
        debug_assert_eq!(keys.len(), first_child.len());
        debug_assert_eq!(keys.len(), parents.len());
        Self {
            level,
            max_depth,
            keys,
            parents,
            first_child,
            pt_start: Vec::new(),
            pt_count: Vec::new(),
        }
    }

    /// Store the parent links once the next coarser level exists.
    pub(crate) fn set_parents(&mut self, parents: Vec<Option<usize>>) {
        debug_assert_eq!(parents.len(), self.keys.len());
        self.parents = parents;
    }

    /// The level of the nodes.
    pub fn level(&self) -> usize {
        self.level
    }

    /// The depth of the tree the keys are encoded for.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of nodes including empty siblings.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Return true if the level has no nodes.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Return true if this is the leaf level.
    pub fn is_leaf_level(&self) -> bool {
        self.level == self.max_depth
    }

    /// Sorted node keys.
    pub fn keys(&self) -> &[KeyType] {
        &self.keys
    }

    /// Key of a node.
    pub fn key(&self, index: usize) -> KeyType {
        self.keys[index]
    }

    /// Parent links into the next coarser level.
    ///
    /// All entries are `None` until the coarser level has been built. The root
    /// never has a parent.
    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    /// Parent of a node.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents[index]
    }

    /// Key of the parent of a node.
    pub fn parent_key(&self, index: usize) -> KeyType {
        parent_key(self.keys[index], self.level, self.max_depth)
    }

    /// Index of the first child in the next finer level.
    ///
    /// Only occupied nodes of internal levels have children.
    pub fn first_child(&self, index: usize) -> Option<usize> {
        self.first_child.get(index).copied().flatten()
    }

    /// The block of children of a node in the next finer level.
    pub fn children(&self, index: usize) -> Option<Range<usize>> {
        self.first_child(index)
            .map(|first| first..first + siblings_per_block(self.level + 1))
    }

    /// The block of siblings a node belongs to, including the node.
    pub fn siblings(&self, index: usize) -> Range<usize> {
        let block = siblings_per_block(self.level);
        let first = index - index % block;
        first..first + block
    }

    /// Index of the first sorted point of each leaf.
    ///
    /// Empty on internal levels. Empty leaves have start 0.
    pub fn pt_start(&self) -> &[usize] {
        &self.pt_start
    }

    /// Number of points in each leaf. Empty on internal levels.
    pub fn pt_count(&self) -> &[usize] {
        &self.pt_count
    }

    /// Range of sorted points in a leaf.
    ///
    /// Returns `None` on internal levels.
    pub fn point_range(&self, index: usize) -> Option<Range<usize>> {
        if self.pt_start.is_empty() {
            return None;
        }
        let start = self.pt_start[index];
        Some(start..start + self.pt_count[index])
    }

    /// Return true if the node holds points or has children.
    pub fn is_occupied(&self, index: usize) -> bool {
        if self.is_leaf_level() {
            self.pt_count.get(index).is_some_and(|&count| count > 0)
        } else {
            self.first_child(index).is_some()
        }
    }

    /// Number of occupied nodes.
    pub fn noccupied(&self) -> usize {
        (0..self.len())
            .filter(|&index| self.is_occupied(index))
            .count()
    }

    /// Reconstruct the box of a node.
    pub fn node_box(&self, index: usize, root_box: &PhysicalBox) -> PhysicalBox {
        box_from_key(self.keys[index], root_box, self.level, self.max_depth)
    }
}

impl fmt::Display for NodeArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let linked = self.parents.iter().filter(|parent| parent.is_some()).count();
        writeln!(
            f,
            "NodeArray level {} of {}: {} nodes, {} occupied, {} parent links",
            self.level,
            self.max_depth,
            self.len(),
            self.noccupied(),
            linked,
        )?;

        for index in 0..self.len() {
            if !self.is_occupied(index) {
                continue;
            }
            write!(f, "\tnode {:>6}: key {:#o}", index, self.keys[index])?;
            if let Some(parent) = self.parents[index] {
                write!(f, ", parent {}", parent)?;
            }
            if let Some(range) = self.point_range(index) {
                write!(f, ", points [{}, {})", range.start, range.end)?;
            }
            if let Some(children) = self.children(index) {
                write!(f, ", children [{}, {})", children.start, children.end)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
