//! Construction of the leaf level directly from the points.
//!
//! Follows the data-parallel octree construction of
//! K. Zhou et al., Data-parallel octrees for surface reconstruction,
//! IEEE TVCG 17(5), 2011.

use std::time::Instant;

use rand::Rng;
use rayon::prelude::*;

use crate::{
    error::{try_alloc, try_filled, Result, Stage},
    geometry::{PhysicalBox, Point},
    morton::{compute_key, decode_id, decode_key, encode, CodeType, IdType, KeyType},
    parsort::parsort,
    tools::{binary_search_codes, mark_duplicates_and_scan, reorder, sibling_count_and_scan},
};

use super::{
    node_array::NodeArray,
    setup::{fill_nodes, node_address, setup_nodes},
};

/// The leaf level together with the sorted point data.
pub(crate) struct LeafLevel {
    pub nodes: NodeArray,
    pub sorted_points: Vec<Point>,
    pub orig_ids: Vec<usize>,
    pub pt_in_node: Vec<usize>,
    pub codes: Vec<CodeType>,
}

/// Build the sibling-complete leaf level on `depth`.
///
/// `root_box` must contain all points and `depth` must be a valid depth;
/// both are checked by the caller before any stage runs.
pub(crate) fn build_leaf_level<R: Rng + ?Sized>(
    points: &[Point],
    depth: usize,
    root_box: &PhysicalBox,
    nbuckets: usize,
    rng: &mut R,
) -> Result<LeafLevel> {
    let start = Instant::now();
    let npoints = points.len();

    // Compute the key of each point and concatenate it with the point id.

    let mut codes = try_alloc::<CodeType>(npoints, Stage::Encode)?;
    points
        .par_iter()
        .enumerate()
        .map(|(id, point)| encode(compute_key(point, depth, depth, root_box), id as IdType))
        .collect_into_vec(&mut codes);

    log::debug!("encoded {} points on level {}", npoints, depth);

    // Sort by key. Equal keys are ordered by point id.

    parsort(&mut codes, nbuckets, rng)?;

    // Move the points into sorted order and remember where they came from.

    let mut orig_ids = try_alloc::<usize>(npoints, Stage::Permute)?;
    codes
        .par_iter()
        .map(|&code| decode_id(code) as usize)
        .collect_into_vec(&mut orig_ids);

    let sorted_points = reorder(points, &orig_ids, Stage::Permute)?;

    // Find the distinct keys. Each of them is an occupied leaf.

    let groups = mark_duplicates_and_scan(&codes, |&code| decode_key(code))?;
    let starts = groups.group_starts(Stage::UniqueNodes)?;

    let mut unique_keys = try_alloc::<KeyType>(groups.ngroups, Stage::UniqueNodes)?;
    starts
        .par_iter()
        .map(|&index| decode_key(codes[index]))
        .collect_into_vec(&mut unique_keys);

    let mut point_ranges = try_alloc::<(usize, usize)>(groups.ngroups, Stage::UniqueNodes)?;
    unique_keys
        .par_iter()
        .map(|&key| {
            let first = binary_search_codes(key, &codes, true);
            let last = binary_search_codes(key, &codes, false);
            (first, last - first + 1)
        })
        .collect_into_vec(&mut point_ranges);

    log::debug!(
        "found {} occupied leaves for {} points",
        groups.ngroups,
        npoints
    );

    // Reserve a full block of siblings for every parent of an occupied leaf.

    let siblings = sibling_count_and_scan(&unique_keys, depth, depth)?;
    let setup = setup_nodes(&unique_keys, &siblings, depth, depth)?;

    let ranges = fill_nodes(&setup, &unique_keys, depth, depth, (0, 0), |unique_index| {
        point_ranges[unique_index]
    })?;

    let mut pt_start = try_alloc::<usize>(ranges.len(), Stage::NodeFill)?;
    let mut pt_count = try_alloc::<usize>(ranges.len(), Stage::NodeFill)?;
    ranges
        .into_par_iter()
        .unzip_into_vecs(&mut pt_start, &mut pt_count);

    // Tag each point with the leaf that contains it.

    let mut pt_in_node = try_alloc::<usize>(npoints, Stage::NodeFill)?;
    (0..npoints)
        .into_par_iter()
        .map(|index| node_address(&siblings, &unique_keys, groups.rank(index), depth, depth))
        .collect_into_vec(&mut pt_in_node);

    debug_assert!(pt_in_node
        .iter()
        .zip(codes.iter())
        .all(|(&node, &code)| setup.keys[node] == decode_key(code)));

    let parents = try_filled(setup.keys.len(), None, Stage::NodeSetup)?;
    let nodes = NodeArray::new_leaf_level(depth, depth, setup.keys, pt_start, pt_count, parents);

    log::debug!(
        "built leaf level {} with {} nodes in {} ms",
        depth,
        nodes.len(),
        start.elapsed().as_millis()
    );

    Ok(LeafLevel {
        nodes,
        sorted_points,
        orig_ids,
        pt_in_node,
        codes,
    })
}
