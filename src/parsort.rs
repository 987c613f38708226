//! Implementation of a parallel samplesort.
//!
//! The array is cut into one chunk per bucket and each chunk is sorted locally.
//! Randomly sampled splitters then define the buckets. Every bucket knows from
//! a scan over the bucket sizes which range of the output it owns, gathers its
//! elements from all sorted chunks and sorts them. The buckets never write
//! outside of their own range, so no synchronization is needed.

use itertools::Itertools;
use rand::{seq::SliceRandom, Rng};
use rayon::prelude::*;

use crate::{
    constants::{MAX_SORT_BUCKETS, OVERSAMPLING, PARSORT_THRESHOLD},
    error::{try_alloc, Result, Stage},
    tools::exclusive_cumsum,
};

/// Sortable trait that each type fed into parsort needs to satisfy.
pub trait ParallelSortable: Copy + Clone + PartialEq + Eq + PartialOrd + Ord + Send + Sync {}

impl<T: Copy + Clone + PartialEq + Eq + PartialOrd + Ord + Send + Sync> ParallelSortable for T {}

/// Pick `nbuckets - 1` sorted splitters from sorted local chunks.
fn get_splitters<T, R>(arr: &[T], nbuckets: usize, rng: &mut R) -> Vec<T>
where
    T: ParallelSortable,
    R: Rng + ?Sized,
{
    let nsamples = usize::min(arr.len(), OVERSAMPLING * nbuckets);

    let mut samples = arr.choose_multiple(rng, nsamples).copied().collect_vec();

    samples.sort_unstable();
    samples.dedup();

    // The first element of each of the `nbuckets` parts is a bucket start.
    // The start of the first part is implied by the smallest element.
    split(&samples, nbuckets)
        .skip(1)
        .map(|slice| slice[0])
        .dedup()
        .collect_vec()
}

/// Parallel sort
///
/// Sorts `arr` in place with `nbuckets` independent buckets. The result is
/// identical to a sequential sort independent of the splitters chosen by `rng`.
///
/// Every bucket holds at least [PARSORT_THRESHOLD] elements on average and
/// at most [MAX_SORT_BUCKETS] buckets are used.
pub fn parsort<T, R>(arr: &mut Vec<T>, nbuckets: usize, rng: &mut R) -> Result<()>
where
    T: ParallelSortable,
    R: Rng + ?Sized,
{
    let nbuckets = nbuckets
        .min(arr.len() / PARSORT_THRESHOLD)
        .min(MAX_SORT_BUCKETS);

    // Small arrays are simply sorted by rayon directly.

    if nbuckets <= 1 || arr.len() < PARSORT_THRESHOLD {
        arr.par_sort_unstable();
        return Ok(());
    }

    // Sort the local chunks.

    let chunk_len = arr.len().div_ceil(nbuckets);
    arr.par_chunks_mut(chunk_len)
        .for_each(|chunk| chunk.sort_unstable());

    // Bucket `b` holds all elements in `[splitters[b - 1], splitters[b])`.

    let splitters = get_splitters(arr, nbuckets, rng);
    let nbuckets = splitters.len() + 1;

    // For each sorted chunk find where each bucket starts. This gives
    // `nbuckets + 1` boundaries per chunk.

    let boundaries = arr
        .par_chunks(chunk_len)
        .map(|chunk| {
            let mut bounds = Vec::with_capacity(nbuckets + 1);
            bounds.push(0);
            bounds.extend(
                splitters
                    .iter()
                    .map(|splitter| chunk.partition_point(|elem| elem < splitter)),
            );
            bounds.push(chunk.len());
            bounds
        })
        .collect::<Vec<_>>();

    let bucket_sizes = (0..nbuckets)
        .map(|bucket| {
            boundaries
                .iter()
                .map(|bounds| bounds[bucket + 1] - bounds[bucket])
                .sum::<usize>()
        })
        .collect_vec();

    let (_, total) = exclusive_cumsum(&bucket_sizes, Stage::Sort)?;
    debug_assert_eq!(total, arr.len());

    // Hand each bucket the output range it owns.

    let mut output = try_alloc::<T>(arr.len(), Stage::Sort)?;
    output.extend_from_slice(arr);

    let mut slots = Vec::<&mut [T]>::with_capacity(nbuckets);
    let mut remainder = output.as_mut_slice();
    for &size in &bucket_sizes {
        let (current, rest) = remainder.split_at_mut(size);
        slots.push(current);
        remainder = rest;
    }

    let chunks = arr.chunks(chunk_len).collect_vec();

    slots
        .into_par_iter()
        .enumerate()
        .for_each(|(bucket, slot)| {
            let mut offset = 0;
            for (chunk, bounds) in chunks.iter().zip(boundaries.iter()) {
                let part = &chunk[bounds[bucket]..bounds[bucket + 1]];
                slot[offset..offset + part.len()].copy_from_slice(part);
                offset += part.len();
            }
            slot.sort_unstable();
        });

    *arr = output;

    Ok(())
}

// The following is a simple iterator that splits a slice into n
// chunks. It is from https://users.rust-lang.org/t/how-to-split-a-slice-into-n-chunks/40008/3

fn split<T>(slice: &[T], n: usize) -> impl Iterator<Item = &[T]> {
    let len = slice.len() / n;
    let rem = slice.len() % n;
    Split { slice, len, rem }
}

struct Split<'a, T> {
    slice: &'a [T],
    len: usize,
    rem: usize,
}

impl<'a, T> Iterator for Split<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        if self.slice.is_empty() {
            return None;
        }
        let mut len = self.len;
        if self.rem > 0 {
            len += 1;
            self.rem -= 1;
        }
        let (chunk, rest) = self.slice.split_at(len);
        self.slice = rest;
        Some(chunk)
    }
}
