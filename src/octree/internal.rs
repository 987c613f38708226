//! Construction of a coarser level from the next finer level.

use rayon::prelude::*;

use crate::{
    error::{try_alloc, try_filled, Result, Stage},
    morton::{parent_key, KeyType},
    tools::{find_key_index, mark_duplicates_and_scan, sibling_count_and_scan},
};

use super::{
    node_array::NodeArray,
    setup::{fill_nodes, setup_nodes},
};

/// Build the level above `finer` and backfill the parent links of `finer`.
///
/// `finer` must be sorted and sibling-complete. Its blocks share a parent, so
/// the parent keys of the finer level are already grouped. The parent links of
/// `finer` are only written once the new level is complete.
pub(crate) fn build_internal_level(finer: &mut NodeArray) -> Result<NodeArray> {
    debug_assert!(finer.level() > 0);

    let finer_level = finer.level();
    let level = finer_level - 1;
    let max_depth = finer.max_depth();

    if finer.is_empty() && level == 0 {
        // An empty point set still has a root.
        return Ok(NodeArray::new_internal_level(
            0,
            max_depth,
            vec![0],
            vec![None],
            vec![None],
        ));
    }

    // Find the distinct parents. The first child of each parent starts a group.

    let groups = mark_duplicates_and_scan(finer.keys(), |&key| {
        parent_key(key, finer_level, max_depth)
    })?;
    let first_children = groups.group_starts(Stage::UniqueNodes)?;

    let mut unique_keys = try_alloc::<KeyType>(groups.ngroups, Stage::UniqueNodes)?;
    first_children
        .par_iter()
        .map(|&index| parent_key(finer.key(index), finer_level, max_depth))
        .collect_into_vec(&mut unique_keys);

    // Complete the siblings of the parents.

    let siblings = sibling_count_and_scan(&unique_keys, level, max_depth)?;
    let setup = setup_nodes(&unique_keys, &siblings, level, max_depth)?;

    let first_child = fill_nodes(&setup, &unique_keys, level, max_depth, None, |unique_index| {
        Some(first_children[unique_index])
    })?;

    // Backfill the parent links of the finer level with a keyed lookup.

    let mut finer_parents = try_alloc::<Option<usize>>(finer.len(), Stage::ParentBackfill)?;
    finer
        .keys()
        .par_iter()
        .map(|&key| find_key_index(&setup.keys, parent_key(key, finer_level, max_depth)))
        .collect_into_vec(&mut finer_parents);

    debug_assert!(finer_parents.iter().all(|parent| parent.is_some()));

    let parents = try_filled(setup.keys.len(), None, Stage::NodeSetup)?;
    let nodes = NodeArray::new_internal_level(level, max_depth, setup.keys, first_child, parents);

    finer.set_parents(finer_parents);

    log::debug!(
        "built level {} with {} nodes from {} distinct parents",
        level,
        nodes.len(),
        groups.ngroups
    );

    Ok(nodes)
}

#[cfg(test)]
mod test {
    use super::build_internal_level;
    use crate::{
        constants::NSIBLINGS,
        geometry::PhysicalBox,
        octree::leaf::build_leaf_level,
        tools::{generate_random_points, is_sorted_array, seeded_rng},
    };

    #[test]
    fn test_internal_levels_link_up() {
        let mut rng = seeded_rng(0);
        let points = generate_random_points(2_000, &mut rng);
        let root_box = PhysicalBox::from_points(&points).cubed();
        let depth = 5;

        let mut finer = build_leaf_level(&points, depth, &root_box, 2, &mut rng)
            .unwrap()
            .nodes;

        for level in (0..depth).rev() {
            let coarser = build_internal_level(&mut finer).unwrap();

            assert_eq!(coarser.level(), level);
            assert!(is_sorted_array(coarser.keys()));
            if level > 0 {
                assert_eq!(coarser.len() % NSIBLINGS, 0);
            } else {
                assert_eq!(coarser.len(), 1);
                assert_eq!(coarser.key(0), 0);
            }

            for index in 0..finer.len() {
                let parent = finer.parent(index).unwrap();
                assert_eq!(coarser.key(parent), finer.parent_key(index));
                assert!(coarser.children(parent).unwrap().contains(&index));
            }

            for index in 0..coarser.len() {
                if let Some(children) = coarser.children(index) {
                    assert_eq!(children.len(), NSIBLINGS);
                    for child in children {
                        assert_eq!(finer.parent(child), Some(index));
                    }
                }
            }

            finer = coarser;
        }
    }
}
