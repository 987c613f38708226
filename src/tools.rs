//! Utility routines.
//!
//! The construction is built from two parallel patterns. A flag pass computes a
//! local predicate for each element; a scan pass turns the flags into ranks or
//! output addresses. Both passes are independent per element except for the
//! scan itself.

use std::ops::Sub;

use itertools::Itertools;
use num::traits::Zero;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::{
    constants::NSIBLINGS,
    error::{try_alloc, Result, Stage},
    geometry::Point,
    morton::{decode_key, parent_key, CodeType, KeyType},
};

/// Length of the chunks each worker scans locally.
fn scan_chunk_len(len: usize) -> usize {
    let nchunks = rayon::current_num_threads().max(1);
    len.div_ceil(nchunks).max(1)
}

/// Perform an inclusive cumulative sum operation.
///
/// For the array `[1, 3, 5, 7]` the output will be `[1, 4, 9, 16]`.
///
/// Each chunk is scanned locally in parallel, the chunk totals are scanned
/// exclusively and finally every chunk is shifted by its offset.
pub fn inclusive_cumsum<T: Zero + Copy + Send + Sync>(arr: &[T], stage: Stage) -> Result<Vec<T>> {
    let mut scan = try_alloc::<T>(arr.len(), stage)?;
    scan.extend_from_slice(arr);

    let chunk_len = scan_chunk_len(arr.len());

    scan.par_chunks_mut(chunk_len).for_each(|chunk| {
        let mut state = T::zero();
        for elem in chunk.iter_mut() {
            state = *elem + state;
            *elem = state;
        }
    });

    let offsets = scan
        .chunks(chunk_len)
        .map(|chunk| chunk[chunk.len() - 1])
        .scan(T::zero(), |acc, x| {
            let tmp = *acc;
            *acc = *acc + x;
            Some(tmp)
        })
        .collect_vec();

    scan.par_chunks_mut(chunk_len)
        .zip(offsets.par_iter())
        .for_each(|(chunk, &offset)| {
            for elem in chunk.iter_mut() {
                *elem = *elem + offset;
            }
        });

    Ok(scan)
}

/// Perform an exclusive cumulative sum operation.
///
/// Returns the scan together with the total. For the array `[3, 4, 5]`
/// the scan is `[0, 3, 7]` and the total is `12`.
pub fn exclusive_cumsum<T>(arr: &[T], stage: Stage) -> Result<(Vec<T>, T)>
where
    T: Zero + Copy + Send + Sync + Sub<Output = T>,
{
    let mut scan = inclusive_cumsum(arr, stage)?;
    let total = scan.last().copied().unwrap_or_else(T::zero);

    scan.par_iter_mut()
        .zip(arr.par_iter())
        .for_each(|(elem, &value)| *elem = *elem - value);

    Ok((scan, total))
}

/// Result of a flag and scan pass over a sorted array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupScan {
    /// Inclusive scan of the group start flags. `flags[i] - 1` is the rank of the
    /// group that element `i` belongs to.
    pub flags: Vec<usize>,
    /// Number of distinct groups.
    pub ngroups: usize,
}

impl GroupScan {
    /// Rank of the group of element `index`.
    #[inline]
    pub fn rank(&self, index: usize) -> usize {
        self.flags[index] - 1
    }

    /// Return true if element `index` starts a new group.
    #[inline]
    pub fn is_group_start(&self, index: usize) -> bool {
        index == 0 || self.flags[index] > self.flags[index - 1]
    }

    /// Indices of the first element of each group, in order.
    pub fn group_starts(&self, stage: Stage) -> Result<Vec<usize>> {
        let mut starts = try_alloc(self.ngroups, stage)?;
        starts.par_extend(
            (0..self.flags.len())
                .into_par_iter()
                .filter(|&index| self.is_group_start(index)),
        );
        debug_assert_eq!(starts.len(), self.ngroups);
        Ok(starts)
    }
}

/// Flag each element whose key differs from its predecessor and scan the flags.
///
/// The input must be sorted by `key`. After the scan `ngroups` is the number of
/// distinct keys and each group starting element knows its 0-based rank.
pub fn mark_duplicates_and_scan<T, F>(arr: &[T], key: F) -> Result<GroupScan>
where
    T: Sync,
    F: Fn(&T) -> KeyType + Sync,
{
    let mut flags = try_alloc::<usize>(arr.len(), Stage::MarkDuplicates)?;

    (0..arr.len())
        .into_par_iter()
        .map(|index| {
            if index == 0 || key(&arr[index]) != key(&arr[index - 1]) {
                1
            } else {
                0
            }
        })
        .collect_into_vec(&mut flags);

    let flags = inclusive_cumsum(&flags, Stage::MarkDuplicates)?;
    let ngroups = flags.last().copied().unwrap_or(0);

    Ok(GroupScan { flags, ngroups })
}

/// Number of nodes in a sibling block on `level`.
///
/// The root level holds a single node, every other level holds full blocks.
#[inline]
pub fn siblings_per_block(level: usize) -> usize {
    if level == 0 {
        1
    } else {
        NSIBLINGS
    }
}

/// Result of a sibling count and scan pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiblingScan {
    /// Start address of the sibling block of each key.
    pub addresses: Vec<usize>,
    /// Number of nodes including all empty siblings.
    pub nnodes: usize,
}

/// Compute the sibling block address of each distinct sorted key on `level`.
///
/// A key whose parent differs from its predecessor's parent opens a new block
/// of [siblings_per_block] nodes. After the inclusive scan of these block sizes
/// every key of a block holds the end of its block, so subtracting the block
/// size gives the block start of every key. The last entry is the size of the
/// level.
pub fn sibling_count_and_scan(
    keys: &[KeyType],
    level: usize,
    max_depth: usize,
) -> Result<SiblingScan> {
    let block = siblings_per_block(level);

    let mut counts = try_alloc::<usize>(keys.len(), Stage::SiblingScan)?;

    (0..keys.len())
        .into_par_iter()
        .map(|index| {
            if index == 0
                || parent_key(keys[index], level, max_depth)
                    != parent_key(keys[index - 1], level, max_depth)
            {
                block
            } else {
                0
            }
        })
        .collect_into_vec(&mut counts);

    let mut addresses = inclusive_cumsum(&counts, Stage::SiblingScan)?;
    let nnodes = addresses.last().copied().unwrap_or(0);

    addresses
        .par_iter_mut()
        .for_each(|address| *address -= block);

    debug_assert_eq!(nnodes % block, 0);

    Ok(SiblingScan { addresses, nnodes })
}

/// Find the first or last index of a key in an array of sorted codes.
///
/// The key must be present.
pub fn binary_search_codes(key: KeyType, sorted_codes: &[CodeType], first: bool) -> usize {
    if first {
        sorted_codes.partition_point(|&code| decode_key(code) < key)
    } else {
        sorted_codes.partition_point(|&code| decode_key(code) <= key) - 1
    }
}

/// For a sorted array return the position of the key if it exists.
pub fn find_key_index(arr: &[KeyType], key: KeyType) -> Option<usize> {
    arr.binary_search(&key).ok()
}

/// Check if an array is sorted.
pub fn is_sorted_array<T: PartialOrd>(arr: &[T]) -> bool {
    arr.iter().tuple_windows().all(|(elem1, elem2)| elem1 <= elem2)
}

/// Gather `arr[permutation[i]]` into position `i`.
pub fn reorder<T: Copy + Send + Sync>(
    arr: &[T],
    permutation: &[usize],
    stage: Stage,
) -> Result<Vec<T>> {
    let mut reordered = try_alloc(permutation.len(), stage)?;
    permutation
        .par_iter()
        .map(|&index| arr[index])
        .collect_into_vec(&mut reordered);
    Ok(reordered)
}

/// Generate random points in the unit cube for testing.
pub fn generate_random_points<R: Rng>(npoints: usize, rng: &mut R) -> Vec<Point> {
    let mut points = Vec::<Point>::with_capacity(npoints);

    for _ in 0..npoints {
        points.push([rng.gen(), rng.gen(), rng.gen()]);
    }

    points
}

/// Get a seeded rng
pub fn seeded_rng(seed: usize) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed as u64)
}
