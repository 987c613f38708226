//! Definition of Octree.
mod internal;
mod leaf;
mod node_array;
mod setup;

use std::fmt;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

pub use node_array::NodeArray;

use crate::{
    constants::{MAX_OCTREE_DEPTH, MAX_POINTS},
    error::{OctreeError, Result, Stage},
    geometry::{PhysicalBox, Point},
    morton::CodeType,
    tools::reorder,
};

use internal::build_internal_level;
use leaf::{build_leaf_level, LeafLevel};

/// Options for the construction of an octree.
#[derive(Clone, Debug, PartialEq)]
pub struct OctreeOptions {
    /// Level of the leaves, between 1 and [MAX_OCTREE_DEPTH].
    pub depth: usize,
    /// Root box to use instead of the cubed bounding box of the points.
    ///
    /// The box is used as given and must contain all points.
    pub root_box: Option<PhysicalBox>,
    /// Number of buckets for the parallel sort. Defaults to the number of
    /// rayon threads.
    pub sort_buckets: Option<usize>,
    /// Seed for the splitter sampling of the parallel sort. The tree does not
    /// depend on the seed.
    pub seed: u64,
}

impl OctreeOptions {
    /// Options for a tree with leaves on `depth`.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            root_box: None,
            sort_buckets: None,
            seed: 0,
        }
    }

    /// Use a fixed root box.
    pub fn with_root_box(mut self, root_box: PhysicalBox) -> Self {
        self.root_box = Some(root_box);
        self
    }

    /// Use `nbuckets` buckets in the parallel sort.
    pub fn with_sort_buckets(mut self, nbuckets: usize) -> Self {
        self.sort_buckets = Some(nbuckets);
        self
    }

    /// Seed the splitter sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Construction state of an [OctreeBuilder].
///
/// Levels are built strictly in order from the leaves to the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildState {
    /// Configuration checked, nothing built yet.
    Unbuilt,
    /// The leaf level exists.
    LeafBuilt,
    /// All levels down to the given level exist.
    Level(usize),
    /// All levels including the root exist.
    Complete,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Unbuilt => write!(f, "Unbuilt"),
            BuildState::LeafBuilt => write!(f, "LeafBuilt"),
            BuildState::Level(level) => write!(f, "Level({})", level),
            BuildState::Complete => write!(f, "Complete"),
        }
    }
}

/// Level by level construction of an [Octree].
///
/// All configuration errors are reported by [OctreeBuilder::new] before any
/// stage runs. A failing step leaves the builder in its previous state; a
/// partially built tree is never handed out.
pub struct OctreeBuilder<'p> {
    points: &'p [Point],
    depth: usize,
    root_box: PhysicalBox,
    nbuckets: usize,
    rng: ChaCha8Rng,
    state: BuildState,
    leaf: Option<LeafLevel>,
    // Internal levels from the finest to the coarsest.
    internal: Vec<NodeArray>,
}

impl<'p> OctreeBuilder<'p> {
    /// Check the configuration and compute the root box.
    pub fn new(points: &'p [Point], options: &OctreeOptions) -> Result<Self> {
        let depth = options.depth;

        if depth == 0 || depth > MAX_OCTREE_DEPTH {
            return Err(OctreeError::InvalidDepth {
                depth,
                max: MAX_OCTREE_DEPTH,
            });
        }

        if points.len() as u64 > MAX_POINTS {
            return Err(OctreeError::TooManyPoints {
                npoints: points.len(),
                max: MAX_POINTS,
            });
        }

        if let Some(index) = points
            .par_iter()
            .position_first(|point| point.iter().any(|value| !value.is_finite()))
        {
            return Err(OctreeError::NonFinitePoint { index });
        }

        let root_box = match options.root_box {
            Some(root_box) => {
                root_box.validate()?;
                if let Some(index) = points
                    .par_iter()
                    .position_first(|point| !root_box.contains(point))
                {
                    return Err(OctreeError::PointOutsideBox { index });
                }
                root_box
            }
            None if points.is_empty() => PhysicalBox::new([-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]),
            None => {
                let root_box = PhysicalBox::from_points(points).cubed();
                root_box.validate()?;
                root_box
            }
        };

        let nbuckets = options
            .sort_buckets
            .unwrap_or_else(rayon::current_num_threads)
            .max(1);

        log::debug!(
            "configured octree of depth {} for {} points in root box {}",
            depth,
            points.len(),
            root_box
        );

        Ok(Self {
            points,
            depth,
            root_box,
            nbuckets,
            rng: ChaCha8Rng::seed_from_u64(options.seed),
            state: BuildState::Unbuilt,
            leaf: None,
            internal: Vec::with_capacity(depth),
        })
    }

    /// The current state.
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// The root box used for the keys.
    pub fn root_box(&self) -> &PhysicalBox {
        &self.root_box
    }

    /// Build the leaf level. Requires [BuildState::Unbuilt].
    pub fn build_leaves(&mut self) -> Result<BuildState> {
        if self.state != BuildState::Unbuilt {
            return Err(OctreeError::InvalidTransition {
                state: self.state,
                requested: "build the leaf level",
            });
        }

        let leaf = build_leaf_level(
            self.points,
            self.depth,
            &self.root_box,
            self.nbuckets,
            &mut self.rng,
        )?;

        self.leaf = Some(leaf);
        self.state = BuildState::LeafBuilt;
        Ok(self.state)
    }

    /// Build the next coarser level.
    ///
    /// Requires [BuildState::LeafBuilt] or an intermediate [BuildState::Level].
    pub fn build_next_level(&mut self) -> Result<BuildState> {
        let invalid = |state| OctreeError::InvalidTransition {
            state,
            requested: "build the next level",
        };

        let level = match self.state {
            BuildState::LeafBuilt => self.depth - 1,
            BuildState::Level(level) if level > 0 => level - 1,
            state => return Err(invalid(state)),
        };

        let finer = match self.internal.last_mut() {
            Some(finer) => finer,
            None => match self.leaf.as_mut() {
                Some(leaf) => &mut leaf.nodes,
                None => return Err(invalid(self.state)),
            },
        };

        let coarser = build_internal_level(finer)?;
        debug_assert_eq!(coarser.level(), level);
        self.internal.push(coarser);

        self.state = if level == 0 {
            BuildState::Complete
        } else {
            BuildState::Level(level)
        };
        Ok(self.state)
    }

    /// Return the finished tree. Requires [BuildState::Complete].
    pub fn finish(self) -> Result<Octree> {
        let (BuildState::Complete, Some(leaf)) = (self.state, self.leaf) else {
            return Err(OctreeError::InvalidTransition {
                state: self.state,
                requested: "finish the tree",
            });
        };

        let LeafLevel {
            nodes,
            sorted_points,
            orig_ids,
            pt_in_node,
            codes,
        } = leaf;

        // Store the levels indexed by level, root first.
        let mut levels = self.internal;
        levels.reverse();
        levels.push(nodes);

        Ok(Octree {
            root_box: self.root_box,
            depth: self.depth,
            sorted_points,
            orig_ids,
            pt_in_node,
            codes,
            levels,
        })
    }

    /// Run all remaining steps and return the tree.
    pub fn build(mut self) -> Result<Octree> {
        if self.state == BuildState::Unbuilt {
            self.build_leaves()?;
        }
        while self.state != BuildState::Complete {
            self.build_next_level()?;
        }
        self.finish()
    }
}

/// A complete octree over a point set.
///
/// Every node has either no children or exactly 8. Level `l` is stored as a
/// sibling-complete [NodeArray]; level 0 holds the root and level `depth` the
/// leaves. Points are stored in key order; [Octree::orig_ids] maps back to the
/// order in which they were given.
pub struct Octree {
    root_box: PhysicalBox,
    depth: usize,
    sorted_points: Vec<Point>,
    orig_ids: Vec<usize>,
    pt_in_node: Vec<usize>,
    codes: Vec<CodeType>,
    levels: Vec<NodeArray>,
}

impl Octree {
    /// Create a new Octree with leaves on `depth`.
    ///
    /// # Arguments
    /// - `points`: The points. Any finite coordinates are allowed.
    /// - `depth`: The level of the leaves, between 1 and [MAX_OCTREE_DEPTH].
    pub fn new(points: &[Point], depth: usize) -> Result<Self> {
        Self::with_options(points, &OctreeOptions::new(depth))
    }

    /// Create a new Octree from a flat `[x0, y0, z0, x1, ...]` buffer.
    pub fn from_flat_points(points: &[f64], depth: usize) -> Result<Self> {
        let points: &[Point] = bytemuck::try_cast_slice(points)
            .map_err(|_| OctreeError::InvalidPointBuffer { len: points.len() })?;
        Self::new(points, depth)
    }

    /// Create a new Octree with the given options.
    pub fn with_options(points: &[Point], options: &OctreeOptions) -> Result<Self> {
        let start = Instant::now();

        let octree = OctreeBuilder::new(points, options)?.build()?;

        log::info!(
            "built octree of depth {} with {} leaves for {} points in {} ms",
            octree.depth,
            octree.leaves().len(),
            octree.npoints(),
            start.elapsed().as_millis()
        );

        Ok(octree)
    }

    /// Level of the leaves.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Return the root box.
    ///
    /// All keys are relative to this box.
    pub fn root_box(&self) -> &PhysicalBox {
        &self.root_box
    }

    /// Number of points.
    pub fn npoints(&self) -> usize {
        self.sorted_points.len()
    }

    /// All levels, root first.
    pub fn levels(&self) -> &[NodeArray] {
        &self.levels
    }

    /// Nodes on a given level.
    pub fn level(&self, level: usize) -> &NodeArray {
        &self.levels[level]
    }

    /// The leaf level.
    pub fn leaves(&self) -> &NodeArray {
        &self.levels[self.depth]
    }

    /// The level holding the root.
    pub fn root(&self) -> &NodeArray {
        &self.levels[0]
    }

    /// Return the points in key order.
    pub fn sorted_points(&self) -> &[Point] {
        &self.sorted_points
    }

    /// Original index of each sorted point.
    pub fn orig_ids(&self) -> &[usize] {
        &self.orig_ids
    }

    /// Leaf that contains each sorted point.
    pub fn pt_in_node(&self) -> &[usize] {
        &self.pt_in_node
    }

    /// Sorted codes of the points.
    pub fn codes(&self) -> &[CodeType] {
        &self.codes
    }

    /// Points of a leaf.
    pub fn leaf_points(&self, leaf: usize) -> &[Point] {
        let leaves = self.leaves();
        let start = leaves.pt_start()[leaf];
        &self.sorted_points[start..start + leaves.pt_count()[leaf]]
    }

    /// Box of a node on a level.
    pub fn node_box(&self, level: usize, index: usize) -> PhysicalBox {
        self.levels[level].node_box(index, &self.root_box)
    }

    /// Maximum number of points in a leaf.
    pub fn max_points_in_leaf(&self) -> usize {
        self.leaves().pt_count().iter().copied().max().unwrap_or(0)
    }

    /// Move per-point data from caller order into sorted order.
    pub fn sort_like<T: Copy + Send + Sync>(&self, data: &[T]) -> Result<Vec<T>> {
        self.check_len(data.len())?;
        reorder(data, &self.orig_ids, Stage::Permute)
    }

    /// Move per-point data from sorted order back into caller order.
    pub fn unsort<T: Copy + Send + Sync>(&self, sorted: &[T]) -> Result<Vec<T>> {
        self.check_len(sorted.len())?;
        let mut output = sorted.to_vec();
        for (&orig, &value) in self.orig_ids.iter().zip(sorted) {
            output[orig] = value;
        }
        Ok(output)
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.npoints() {
            return Err(OctreeError::LengthMismatch {
                expected: self.npoints(),
                actual: len,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Octree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Octree of depth {} with {} points in {}",
            self.depth,
            self.npoints(),
            self.root_box
        )?;
        for nodes in &self.levels {
            write!(f, "{}", nodes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    use super::{BuildState, Octree, OctreeBuilder, OctreeOptions};
    use crate::{
        constants::{MAX_OCTREE_DEPTH, NSIBLINGS},
        error::OctreeError,
        geometry::{PhysicalBox, Point},
        morton::{compute_key, decode_key},
        tools::{generate_random_points, is_sorted_array, seeded_rng},
    };

    fn unit_cube() -> PhysicalBox {
        PhysicalBox::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0])
    }

    // Points sharing two leaves and occupying four distinct parents.
    fn six_points() -> Vec<Point> {
        vec![
            [0.1, 0.1, 0.1],
            [0.9, 0.9, 0.9],
            [0.1, 0.9, 0.5],
            [0.11, 0.12, 0.105],
            [0.9, 0.1, 0.3],
            [0.905, 0.89, 0.91],
        ]
    }

    /// Check the structural properties every complete tree has.
    fn check_tree(octree: &Octree, points: &[Point]) {
        let depth = octree.depth();
        assert_eq!(octree.levels().len(), depth + 1);
        assert_eq!(octree.root().len(), 1);
        assert_eq!(octree.root().key(0), 0);
        assert_eq!(octree.root().parent(0), None);

        for level in 1..=depth {
            let nodes = octree.level(level);
            let coarser = octree.level(level - 1);
            assert_eq!(nodes.len() % NSIBLINGS, 0);
            assert!(is_sorted_array(nodes.keys()));

            for index in 0..nodes.len() {
                let parent = nodes.parent(index).unwrap();
                assert_eq!(coarser.key(parent), nodes.parent_key(index));
                assert!(coarser.children(parent).unwrap().contains(&index));
                assert_eq!(nodes.siblings(index), coarser.children(parent).unwrap());
            }

            // Every occupied node of the coarser level owns one full block.
            let nchildren: usize = (0..coarser.len())
                .filter_map(|index| coarser.children(index))
                .map(|children| children.len())
                .sum();
            assert_eq!(nchildren, nodes.len());
        }

        assert!(is_sorted_array(octree.codes()));
        assert_eq!(octree.npoints(), points.len());

        let leaves = octree.leaves();
        for (sorted_index, &leaf) in octree.pt_in_node().iter().enumerate() {
            let point = &octree.sorted_points()[sorted_index];
            assert_eq!(*point, points[octree.orig_ids()[sorted_index]]);
            assert!(leaves.point_range(leaf).unwrap().contains(&sorted_index));
            assert_eq!(
                leaves.key(leaf),
                compute_key(point, depth, depth, octree.root_box())
            );
            assert!(octree.node_box(depth, leaf).contains(point));
        }

        let total: usize = leaves.pt_count().iter().sum();
        assert_eq!(total, points.len());
    }

    #[test]
    fn test_six_points() {
        let points = six_points();
        let options = OctreeOptions::new(3).with_root_box(unit_cube());
        let octree = Octree::with_options(&points, &options).unwrap();

        check_tree(&octree, &points);

        let keys = octree
            .codes()
            .iter()
            .map(|&code| decode_key(code))
            .collect::<Vec<_>>();
        assert_eq!(keys, vec![0, 0, 0o151, 0o622, 0o777, 0o777]);
        assert_eq!(octree.orig_ids(), &[0, 3, 4, 2, 1, 5]);
        assert_eq!(octree.pt_in_node(), &[0, 0, 9, 18, 31, 31]);

        let leaves = octree.leaves();
        assert_eq!(leaves.len(), 32);
        assert_eq!(leaves.noccupied(), 4);
        assert_eq!(leaves.point_range(0), Some(0..2));
        assert_eq!(leaves.point_range(9), Some(2..3));
        assert_eq!(leaves.point_range(18), Some(3..4));
        assert_eq!(leaves.point_range(31), Some(4..6));
        assert_eq!(leaves.point_range(1), Some(0..0));
        assert_eq!(octree.max_points_in_leaf(), 2);
        assert_eq!(octree.leaf_points(9), &[[0.9, 0.1, 0.3]]);

        for (block, parent) in [0, 13, 18, 31].into_iter().enumerate() {
            for leaf in block * NSIBLINGS..(block + 1) * NSIBLINGS {
                assert_eq!(leaves.parent(leaf), Some(parent));
            }
        }

        let level2 = octree.level(2);
        assert_eq!(level2.len(), 32);
        assert_eq!(level2.key(13), 0o150);
        assert_eq!(level2.first_child(0), Some(0));
        assert_eq!(level2.first_child(13), Some(8));
        assert_eq!(level2.first_child(18), Some(16));
        assert_eq!(level2.first_child(31), Some(24));
        assert_eq!(level2.first_child(1), None);
        assert_eq!(level2.noccupied(), 4);

        let level1 = octree.level(1);
        assert_eq!(level1.len(), 8);
        assert_eq!(level1.keys(), &[0, 0o100, 0o200, 0o300, 0o400, 0o500, 0o600, 0o700]);
        assert_eq!(level1.first_child(0), Some(0));
        assert_eq!(level1.first_child(1), Some(8));
        assert_eq!(level1.first_child(6), Some(16));
        assert_eq!(level1.first_child(7), Some(24));
        assert_eq!(level1.noccupied(), 4);

        assert_eq!(octree.root().first_child(0), Some(0));
    }

    #[test]
    fn test_invalid_depth() {
        let points = six_points();

        assert!(matches!(
            Octree::new(&points, 0),
            Err(OctreeError::InvalidDepth { depth: 0, .. })
        ));
        assert!(matches!(
            Octree::new(&points, MAX_OCTREE_DEPTH + 1),
            Err(OctreeError::InvalidDepth { .. })
        ));
        assert!(Octree::new(&points, MAX_OCTREE_DEPTH).is_ok());
    }

    #[test]
    fn test_single_point() {
        let points = vec![[1.0, 1.0, 1.0]];
        let octree = Octree::new(&points, 3).unwrap();

        check_tree(&octree, &points);

        // The point is the centroid of a unit cube. It goes high on the first
        // level and sits on the lower corner of every box below.
        let leaves = octree.leaves();
        assert_eq!(leaves.len(), 8);
        assert_eq!(leaves.key(0), 0o700);
        assert_eq!(leaves.point_range(0), Some(0..1));
        assert_eq!(leaves.noccupied(), 1);
        assert_eq!(octree.pt_in_node(), &[0]);
        assert_eq!(octree.level(1).first_child(7), Some(0));
        assert_eq!(octree.level(1).noccupied(), 1);

        let diameters = octree.root_box().diameters();
        assert!(diameters.iter().all(|&d| d > 0.0));
    }

    #[test]
    fn test_points_far_from_origin() {
        let points = vec![[1.0e17, 0.0, 0.0]];
        let octree = Octree::new(&points, 3).unwrap();
        check_tree(&octree, &points);
        assert_eq!(octree.leaves().len(), 8);
        assert_eq!(octree.leaves().noccupied(), 1);

        let points = vec![[3.0e16; 3]; 4];
        let octree = Octree::new(&points, 2).unwrap();
        check_tree(&octree, &points);
        assert_eq!(octree.leaves().noccupied(), 1);
        assert_eq!(octree.max_points_in_leaf(), 4);
    }

    #[test]
    fn test_excessive_sort_buckets() {
        let mut rng = seeded_rng(4);
        let points = generate_random_points(10_000, &mut rng);

        let octree = Octree::with_options(
            &points,
            &OctreeOptions::new(4).with_sort_buckets(usize::MAX),
        )
        .unwrap();
        let reference = Octree::new(&points, 4).unwrap();

        check_tree(&octree, &points);
        assert_eq!(octree.codes(), reference.codes());
    }

    #[test]
    fn test_coincident_points() {
        let points = vec![[1.0, 1.0, 1.0]; 5];
        let octree = Octree::new(&points, 2).unwrap();

        check_tree(&octree, &points);
        assert_eq!(octree.leaves().noccupied(), 1);
        assert_eq!(octree.max_points_in_leaf(), 5);
        assert_eq!(octree.orig_ids(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_point_set() {
        let octree = Octree::new(&[], 4).unwrap();

        assert_eq!(octree.npoints(), 0);
        for level in 1..=4 {
            assert!(octree.level(level).is_empty());
        }
        assert_eq!(octree.root().len(), 1);
        assert_eq!(octree.root().first_child(0), None);
        assert_eq!(octree.max_points_in_leaf(), 0);
    }

    #[test]
    fn test_random_points() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut rng = seeded_rng(0);
        let points = generate_random_points(20_000, &mut rng);

        let octree = Octree::with_options(&points, &OctreeOptions::new(6).with_sort_buckets(4))
            .unwrap();
        check_tree(&octree, &points);
    }

    #[test]
    fn test_clustered_points() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let normal = Normal::new(0.0, 0.01).unwrap();

        // Two tight clusters far apart leave most of the tree empty.
        let points = (0..5_000)
            .map(|index| {
                let offset = if index % 2 == 0 { 0.0 } else { 10.0 };
                [
                    offset + normal.sample(&mut rng),
                    offset + normal.sample(&mut rng),
                    offset + normal.sample(&mut rng),
                ]
            })
            .collect::<Vec<Point>>();

        let octree = Octree::new(&points, 8).unwrap();
        check_tree(&octree, &points);
        assert_eq!(octree.level(1).noccupied(), 2);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let mut rng = seeded_rng(5);
        let points = generate_random_points(5_000, &mut rng);

        let first = Octree::with_options(&points, &OctreeOptions::new(5).with_seed(1)).unwrap();
        let second = Octree::with_options(
            &points,
            &OctreeOptions::new(5).with_seed(2).with_sort_buckets(3),
        )
        .unwrap();

        assert_eq!(first.codes(), second.codes());
        assert_eq!(first.orig_ids(), second.orig_ids());
        assert_eq!(first.pt_in_node(), second.pt_in_node());
        assert_eq!(first.levels(), second.levels());
    }

    #[test]
    fn test_builder_state_machine() {
        let points = six_points();
        let options = OctreeOptions::new(2);
        let mut builder = OctreeBuilder::new(&points, &options).unwrap();

        assert_eq!(builder.state(), BuildState::Unbuilt);
        assert!(matches!(
            builder.build_next_level(),
            Err(OctreeError::InvalidTransition {
                state: BuildState::Unbuilt,
                ..
            })
        ));

        assert_eq!(builder.build_leaves().unwrap(), BuildState::LeafBuilt);
        assert!(builder.build_leaves().is_err());
        assert_eq!(builder.state(), BuildState::LeafBuilt);

        assert_eq!(builder.build_next_level().unwrap(), BuildState::Level(1));
        assert_eq!(builder.build_next_level().unwrap(), BuildState::Complete);
        assert!(builder.build_next_level().is_err());
        assert_eq!(builder.state(), BuildState::Complete);

        let octree = builder.finish().unwrap();
        check_tree(&octree, &points);

        let unfinished = OctreeBuilder::new(&points, &options).unwrap();
        let err = unfinished.finish().err().unwrap();
        assert!(err.to_string().contains("Unbuilt"));
    }

    #[test]
    fn test_invalid_input() {
        let points = vec![[0.0, 0.0, 0.0], [f64::NAN, 1.0, 1.0]];
        assert!(matches!(
            Octree::new(&points, 3),
            Err(OctreeError::NonFinitePoint { index: 1 })
        ));

        let points = six_points();
        let small_box = PhysicalBox::new([0.0, 0.0, 0.0, 0.5, 0.5, 0.5]);
        assert!(matches!(
            Octree::with_options(&points, &OctreeOptions::new(3).with_root_box(small_box)),
            Err(OctreeError::PointOutsideBox { index: 1 })
        ));

        let flat_box = PhysicalBox::new([0.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
        assert!(matches!(
            Octree::with_options(&points, &OctreeOptions::new(3).with_root_box(flat_box)),
            Err(OctreeError::DegenerateBox(_))
        ));
    }

    #[test]
    fn test_flat_points() {
        let points = six_points();
        let flat = points.iter().flatten().copied().collect::<Vec<f64>>();

        let from_flat = Octree::from_flat_points(&flat, 3).unwrap();
        let from_points = Octree::new(&points, 3).unwrap();
        assert_eq!(from_flat.levels(), from_points.levels());

        assert!(matches!(
            Octree::from_flat_points(&flat[..flat.len() - 1], 3),
            Err(OctreeError::InvalidPointBuffer { len: 17 })
        ));
    }

    #[test]
    fn test_sort_like_and_unsort() {
        let points = six_points();
        let octree = Octree::new(&points, 3).unwrap();

        let values = (0..points.len()).map(|index| index as f64).collect::<Vec<_>>();
        let sorted = octree.sort_like(&values).unwrap();
        for (sorted_index, &orig) in octree.orig_ids().iter().enumerate() {
            assert_eq!(sorted[sorted_index], values[orig]);
        }
        assert_eq!(octree.unsort(&sorted).unwrap(), values);

        assert!(matches!(
            octree.unsort(&values[1..]),
            Err(OctreeError::LengthMismatch {
                expected: 6,
                actual: 5
            })
        ));
    }
}
