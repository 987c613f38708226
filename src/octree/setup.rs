//! Materialization of sibling blocks shared by the leaf and internal levels.

use rayon::prelude::*;

use crate::{
    error::{try_alloc, try_filled, Result, Stage},
    morton::{local_key, node_key, parent_key, KeyType},
    tools::{siblings_per_block, SiblingScan},
};

/// The key layout of a level.
pub(crate) struct NodeSetup {
    /// All keys of the level, including empty siblings.
    pub keys: Vec<KeyType>,
    /// For each sibling block the index of its first distinct key, followed by
    /// the total number of distinct keys. Block `b` owns the distinct keys
    /// `block_first[b]..block_first[b + 1]`.
    pub block_first: Vec<usize>,
    /// Number of nodes per block.
    pub block: usize,
}

/// Address of the distinct key `unique_index` in its level.
#[inline]
pub(crate) fn node_address(
    siblings: &SiblingScan,
    unique_keys: &[KeyType],
    unique_index: usize,
    level: usize,
    max_depth: usize,
) -> usize {
    siblings.addresses[unique_index] + local_key(unique_keys[unique_index], level, max_depth) as usize
}

/// Create all sibling keys of a level from its sorted distinct keys.
///
/// Each block of the output is owned by the distinct key that opened it, which
/// writes the keys of all siblings under the shared parent.
pub(crate) fn setup_nodes(
    unique_keys: &[KeyType],
    siblings: &SiblingScan,
    level: usize,
    max_depth: usize,
) -> Result<NodeSetup> {
    let block = siblings_per_block(level);
    let nblocks = siblings.nnodes / block;

    let mut block_first = try_alloc::<usize>(nblocks + 1, Stage::NodeSetup)?;
    block_first.par_extend((0..unique_keys.len()).into_par_iter().filter(|&index| {
        index == 0 || siblings.addresses[index] > siblings.addresses[index - 1]
    }));
    block_first.push(unique_keys.len());
    debug_assert_eq!(block_first.len(), nblocks + 1);

    let mut keys = try_filled::<KeyType>(siblings.nnodes, 0, Stage::NodeSetup)?;

    keys.par_chunks_mut(block)
        .zip(block_first.par_iter())
        .for_each(|(slots, &first)| {
            let parent = parent_key(unique_keys[first], level, max_depth);
            for (local, slot) in slots.iter_mut().enumerate() {
                *slot = node_key(parent, local as KeyType, level, max_depth);
            }
        });

    Ok(NodeSetup {
        keys,
        block_first,
        block,
    })
}

/// Scatter one value per distinct key into its node, `empty` everywhere else.
///
/// The writes stay inside the block owned by each task.
pub(crate) fn fill_nodes<T, F>(
    setup: &NodeSetup,
    unique_keys: &[KeyType],
    level: usize,
    max_depth: usize,
    empty: T,
    value: F,
) -> Result<Vec<T>>
where
    T: Clone + Send + Sync,
    F: Fn(usize) -> T + Sync,
{
    let mut output = try_filled(setup.keys.len(), empty, Stage::NodeFill)?;

    output
        .par_chunks_mut(setup.block)
        .enumerate()
        .for_each(|(block_index, slots)| {
            let first = setup.block_first[block_index];
            let last = setup.block_first[block_index + 1];
            for unique_index in first..last {
                let local = local_key(unique_keys[unique_index], level, max_depth) as usize;
                slots[local] = value(unique_index);
            }
        });

    Ok(output)
}
