//! Routines for working with octree keys and codes.
//!
//! A key addresses a node of the octree. Level `i` of the path from the root
//! is stored in the three bits starting at `3 * (max_depth - i)`, so that the
//! most significant group is the first level below the root. Inside a group
//! the bits have weight 1 for x, 2 for y and 4 for z. Keys of coarser nodes
//! have all bits below their level set to zero, so a key truncated to its top
//! `3 * l` bits is the key of its ancestor on level `l`.
//!
//! A code packs a key together with a 32 bit point id so that sorting codes
//! sorts by key first and by id second.

use crate::{
    constants::{CODE_ID_MASK, CODE_KEY_SHIFT, LEVEL_BITS, LEVEL_MASK, MAX_OCTREE_DEPTH},
    geometry::{PhysicalBox, Point},
};

/// Key type
pub type KeyType = u32;

/// Point id type
pub type IdType = u32;

/// Code type, a key and a point id.
pub type CodeType = u64;

/// Position of the bit group for `level` in a key of width `3 * max_depth`.
#[inline]
fn level_shift(level: usize, max_depth: usize) -> u32 {
    debug_assert!(level <= max_depth && max_depth <= MAX_OCTREE_DEPTH);
    (LEVEL_BITS * (max_depth - level)) as u32
}

/// Compute the key of the node on `target_level` that contains `point`.
///
/// The root box is halved `target_level` times. On each level the point is
/// compared against the centroid of the current box; a coordinate greater or
/// equal to the centroid selects the upper half.
pub fn compute_key(
    point: &Point,
    target_level: usize,
    max_depth: usize,
    root_box: &PhysicalBox,
) -> KeyType {
    debug_assert!(target_level <= max_depth);

    let mut key: KeyType = 0;
    let mut current = *root_box;

    for level in 1..=target_level {
        let octant = current.octant(point);
        key |= (octant as KeyType) << level_shift(level, max_depth);
        current = current.child(octant);
    }

    key
}

/// Pack a key and a point id into one sortable code.
#[inline]
pub fn encode(key: KeyType, id: IdType) -> CodeType {
    ((key as CodeType) << CODE_KEY_SHIFT) | id as CodeType
}

/// Point id of a code.
#[inline]
pub fn decode_id(code: CodeType) -> IdType {
    (code & CODE_ID_MASK) as IdType
}

/// Key of a code.
#[inline]
pub fn decode_key(code: CodeType) -> KeyType {
    (code >> CODE_KEY_SHIFT) as KeyType
}

/// Key of the parent of a node on `level`.
///
/// All bits of `level` and below are cleared. Nodes on level 1 have the root
/// (key 0) as parent; the root itself maps to 0 as well.
#[inline]
pub fn parent_key(key: KeyType, level: usize, max_depth: usize) -> KeyType {
    if level == 0 {
        return 0;
    }
    // The group of `level - 1` starts right above the group of `level`.
    let shift = level_shift(level, max_depth) + LEVEL_BITS as u32;
    match KeyType::MAX.checked_shl(shift) {
        Some(mask) => key & mask,
        None => 0,
    }
}

/// Octant of a node on `level` relative to its parent.
#[inline]
pub fn local_key(key: KeyType, level: usize, max_depth: usize) -> KeyType {
    if level == 0 {
        return 0;
    }
    (key >> level_shift(level, max_depth)) & LEVEL_MASK
}

/// Key of the child `local` of `parent` where the child lives on `level`.
#[inline]
pub fn node_key(parent: KeyType, local: KeyType, level: usize, max_depth: usize) -> KeyType {
    if level == 0 {
        return parent;
    }
    debug_assert!(local <= LEVEL_MASK);
    parent | (local << level_shift(level, max_depth))
}

/// Reconstruct the box of the node with the given key on `level`.
///
/// The walk reads the bit groups instead of comparing coordinates and uses the
/// same bisection as [compute_key], so a point keyed into a node is always
/// contained in the node's box.
pub fn box_from_key(
    key: KeyType,
    root_box: &PhysicalBox,
    level: usize,
    max_depth: usize,
) -> PhysicalBox {
    (1..=level).fold(*root_box, |current, l| {
        current.child(local_key(key, l, max_depth) as usize)
    })
}

/// Return the level-`level` ancestors of a key on `level` down to the root.
///
/// The first element is the key itself, the last one the root key.
pub fn ancestors(key: KeyType, level: usize, max_depth: usize) -> Vec<KeyType> {
    let mut result = Vec::with_capacity(level + 1);
    let mut current = key;
    result.push(current);
    for l in (1..=level).rev() {
        current = parent_key(current, l, max_depth);
        result.push(current);
    }
    result
}

#[cfg(test)]
mod test {
    use rand::Rng;

    use super::{
        ancestors, box_from_key, compute_key, decode_id, decode_key, encode, local_key,
        node_key, parent_key, KeyType,
    };
    use crate::{
        constants::{MAX_OCTREE_DEPTH, NSIBLINGS},
        geometry::PhysicalBox,
        tools::seeded_rng,
    };

    fn unit_box() -> PhysicalBox {
        PhysicalBox::new([-1.0, -1.0, -1.0, 1.0, 1.0, 1.0])
    }

    #[test]
    fn test_compute_key_first_level() {
        let root = unit_box();

        assert_eq!(compute_key(&[-0.5, -0.5, -0.5], 1, 1, &root), 0);
        assert_eq!(compute_key(&[0.5, -0.5, -0.5], 1, 1, &root), 1);
        assert_eq!(compute_key(&[-0.5, 0.5, -0.5], 1, 1, &root), 2);
        assert_eq!(compute_key(&[-0.5, -0.5, 0.5], 1, 1, &root), 4);
        assert_eq!(compute_key(&[0.5, 0.5, 0.5], 1, 1, &root), 7);

        // On the splitting plane the point goes to the upper half.
        assert_eq!(compute_key(&[0.0, 0.0, 0.0], 1, 1, &root), 7);

        // With a deeper key width the group moves to the top.
        assert_eq!(compute_key(&[0.5, -0.5, -0.5], 1, 3, &root), 1 << 6);
    }

    #[test]
    fn test_compute_key_two_levels() {
        let root = unit_box();
        // Octant 7 on level 1, then octant 1 inside [0, 1]^3.
        let key = compute_key(&[0.75, 0.25, 0.25], 2, 2, &root);
        assert_eq!(key, (7 << 3) | 1);
        assert_eq!(local_key(key, 1, 2), 7);
        assert_eq!(local_key(key, 2, 2), 1);
    }

    #[test]
    fn test_encode_decode() {
        let mut rng = seeded_rng(0);

        for _ in 0..1000 {
            let key: KeyType = rng.gen_range(0..1 << (3 * MAX_OCTREE_DEPTH));
            let id: u32 = rng.gen();
            let code = encode(key, id);
            assert_eq!(decode_key(code), key);
            assert_eq!(decode_id(code), id);
        }

        assert_eq!(decode_id(encode(0, u32::MAX)), u32::MAX);
        assert_eq!(decode_key(encode(u32::MAX, 0)), u32::MAX);

        // Codes sort by key first.
        assert!(encode(1, u32::MAX) < encode(2, 0));
        assert!(encode(2, 3) < encode(2, 4));
    }

    #[test]
    fn test_key_composition() {
        let mut rng = seeded_rng(1);
        let max_depth = 6;

        for _ in 0..500 {
            let key: KeyType = rng.gen_range(0..1 << (3 * max_depth));
            for level in 1..=max_depth {
                // Truncate to a valid key on `level`.
                let key = key & !((1 << (3 * (max_depth - level))) - 1);
                let parent = parent_key(key, level, max_depth);
                let local = local_key(key, level, max_depth);
                assert_eq!(node_key(parent, local, level, max_depth), key);
            }
        }
    }

    #[test]
    fn test_parent_key() {
        let key = 0b101_011_110;
        assert_eq!(parent_key(key, 3, 3), 0b101_011_000);
        assert_eq!(parent_key(0b101_011_000, 2, 3), 0b101_000_000);
        assert_eq!(parent_key(0b101_000_000, 1, 3), 0);
        assert_eq!(parent_key(0, 0, 3), 0);

        // The full depth key width still works at the deepest level.
        let deep = 0b111 << 27;
        assert_eq!(parent_key(deep, 1, MAX_OCTREE_DEPTH), 0);
        assert_eq!(local_key(deep, 1, MAX_OCTREE_DEPTH), 7);

        assert_eq!(
            ancestors(key, 3, 3),
            vec![0b101_011_110, 0b101_011_000, 0b101_000_000, 0]
        );
    }

    #[test]
    fn test_parent_key_matches_coarser_key() {
        let mut rng = seeded_rng(2);
        let root = unit_box();
        let depth = 7;

        for _ in 0..500 {
            let point = [
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ];
            let key = compute_key(&point, depth, depth, &root);
            let mut current = key;
            for level in (0..depth).rev() {
                current = parent_key(current, level + 1, depth);
                assert_eq!(current, compute_key(&point, level, depth, &root));
            }
            assert_eq!(current, 0);
        }
    }

    #[test]
    fn test_box_from_key_contains_point() {
        let mut rng = seeded_rng(3);
        let root = PhysicalBox::new([-2.0, 0.0, 1.0, 2.0, 4.0, 5.0]);
        let depth = MAX_OCTREE_DEPTH;

        for _ in 0..500 {
            let point = [
                rng.gen_range(-2.0..2.0),
                rng.gen_range(0.0..4.0),
                rng.gen_range(1.0..5.0),
            ];
            for level in 0..=depth {
                let key = compute_key(&point, level, depth, &root);
                let node_box = box_from_key(key, &root, level, depth);
                assert!(node_box.contains(&point));

                let expected = 4.0 / (1_u64 << level) as f64;
                assert_eq!(node_box.diameters(), [expected; 3]);
            }
        }
    }

    #[test]
    fn test_box_from_key_siblings() {
        let root = unit_box();
        let parent = 5 << 3;
        let parent_box = box_from_key(parent, &root, 1, 2);

        for local in 0..NSIBLINGS as KeyType {
            let child = node_key(parent, local, 2, 2);
            assert_eq!(
                box_from_key(child, &root, 2, 2),
                parent_box.child(local as usize)
            );
        }
    }
}
