//! Distributed odd-even transposition sort over `(depth, index)` pairs
//! (spec.md §4.I step 3), grounded on
//! `examples/original_source/src/transpose_sort.cpp`'s `SortEngine`.
//!
//! Each rank starts with its own locally-sorted slice and exchanges full
//! arrays with a neighbor every step, keeping the lower or upper half of the
//! merged pair depending on which side of the neighbor it sits on. After
//! `size()` steps the concatenation `(rank 0, rank 1, ..., rank size-1)` is
//! globally ascending.

use crate::transport::{TAG_SORT, Transport, TransportError};

/// A depth key paired with the primitive index it came from. `index == -1`
/// is the sentinel used to pad ranks whose local slice is shorter than the
/// widest one, so every exchange moves equal-sized arrays.
pub type DepthIndex = (f32, i32);

const SENTINEL: DepthIndex = (0.0, -1);

fn to_bytes(pairs: &[DepthIndex]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pairs.len() * 8);
    for &(depth, index) in pairs {
        bytes.extend_from_slice(&depth.to_le_bytes());
        bytes.extend_from_slice(&index.to_le_bytes());
    }
    bytes
}

fn from_bytes(bytes: &[u8]) -> Vec<DepthIndex> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let depth = f32::from_le_bytes(chunk[0..4].try_into().expect("4 bytes"));
            let index = i32::from_le_bytes(chunk[4..8].try_into().expect("4 bytes"));
            (depth, index)
        })
        .collect()
}

/// Merges two ascending-sorted equal-length slices and keeps the smallest
/// half (the `n` smallest of the `2n` combined elements), ascending.
fn smallest_half(a: &[DepthIndex], b: &[DepthIndex]) -> Vec<DepthIndex> {
    let n = a.len();
    let mut out = Vec::with_capacity(n);
    let (mut ai, mut bi) = (0usize, 0usize);
    for _ in 0..n {
        if ai < a.len() && (bi >= b.len() || a[ai].0 <= b[bi].0) {
            out.push(a[ai]);
            ai += 1;
        } else {
            out.push(b[bi]);
            bi += 1;
        }
    }
    out
}

/// Merges two ascending-sorted equal-length slices and keeps the largest
/// half, ascending.
fn largest_half(a: &[DepthIndex], b: &[DepthIndex]) -> Vec<DepthIndex> {
    let n = a.len();
    let mut out = vec![SENTINEL; n];
    let (mut ai, mut bi) = (a.len(), b.len());
    for slot in (0..n).rev() {
        if ai > 0 && (bi == 0 || a[ai - 1].0 >= b[bi - 1].0) {
            ai -= 1;
            out[slot] = a[ai];
        } else {
            bi -= 1;
            out[slot] = b[bi];
        }
    }
    out
}

/// This rank's neighbor at transposition `step`, or `None` if this rank has
/// no partner this step (happens at the ends of the rank range).
fn step_neighbor(rank: usize, size: usize, step: usize) -> Option<usize> {
    let odd = (step & 1) as i64;
    let rank = rank as i64;
    let size = size as i64;
    let neighbor = rank + 1 - (((rank ^ odd) & 1) * 2);
    if neighbor < 0 || neighbor >= size {
        None
    } else {
        Some(neighbor as usize)
    }
}

/// Runs the full `size()`-step odd-even transposition sort on `local`,
/// returning this rank's final (still sentinel-padded) slice. All ranks
/// must call this with slices of identical length, padded with `(0.0, -1)`
/// sentinels for any rank owning fewer elements than the widest one.
pub fn odd_even_transposition_sort(
    local: Vec<DepthIndex>,
    transport: &dyn Transport,
) -> Result<Vec<DepthIndex>, TransportError> {
    let rank = transport.rank();
    let size = transport.size();

    let mut local = local;
    local.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("sort requires finite depths"));

    for step in 0..size {
        let Some(neighbor) = step_neighbor(rank, size, step) else {
            continue;
        };

        let other = exchange(&local, rank, neighbor, transport)?;
        local = if rank < neighbor {
            smallest_half(&local, &other)
        } else {
            largest_half(&local, &other)
        };
    }

    Ok(local)
}

/// Exchanges local arrays with `neighbor`: the lower-ranked side sends
/// first and receives second, the higher-ranked side receives first and
/// sends second, avoiding a send/send deadlock on a purely synchronous
/// transport.
fn exchange(
    local: &[DepthIndex],
    rank: usize,
    neighbor: usize,
    transport: &dyn Transport,
) -> Result<Vec<DepthIndex>, TransportError> {
    let out = to_bytes(local);
    let mut in_buf = vec![0u8; out.len()];

    if rank < neighbor {
        transport.send(&out, neighbor, TAG_SORT)?;
        transport.recv(&mut in_buf, neighbor, TAG_SORT)?;
    } else {
        transport.recv(&mut in_buf, neighbor, TAG_SORT)?;
        transport.send(&out, neighbor, TAG_SORT)?;
    }

    Ok(from_bytes(&in_buf))
}

/// Pads `local` with `(0.0, -1)` sentinels up to `width`, the widest local
/// slice across all ranks, so every exchanged array is the same length.
pub fn pad_to_width(mut local: Vec<DepthIndex>, width: usize) -> Vec<DepthIndex> {
    local.resize(width, SENTINEL);
    local
}

/// Drops sentinel entries, returning the real primitive indices in the
/// order they ended up in after sorting.
pub fn drop_sentinels(pairs: &[DepthIndex]) -> Vec<usize> {
    pairs
        .iter()
        .filter(|&&(_, index)| index >= 0)
        .map(|&(_, index)| index as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_transport::ChannelTransport;
    use rand::Rng;
    use std::thread;

    fn strided_depths(xyz: &[f32], rank: usize, size: usize) -> Vec<DepthIndex> {
        xyz.iter()
            .enumerate()
            .skip(rank)
            .step_by(size)
            .map(|(i, &depth)| (depth, i as i32))
            .collect()
    }

    fn run_distributed_sort(xyz: Vec<f32>, size: usize) -> Vec<usize> {
        let transports = ChannelTransport::mesh(size);
        let width = xyz.len().div_ceil(size);

        let handles: Vec<_> = transports
            .into_iter()
            .map(|transport| {
                let xyz = xyz.clone();
                thread::spawn(move || {
                    let local = strided_depths(&xyz, transport.rank(), transport.size());
                    let local = pad_to_width(local, width);
                    odd_even_transposition_sort(local, &transport).expect("sort should not fail")
                })
            })
            .collect();

        let mut flattened = Vec::new();
        for handle in handles {
            flattened.extend(handle.join().expect("worker thread should not panic"));
        }
        drop_sentinels(&flattened)
    }

    #[test]
    fn single_rank_is_a_plain_sort() {
        let xyz = vec![3.0, 1.0, 4.0, 1.5, 2.0];
        let order = run_distributed_sort(xyz.clone(), 1);
        let mut expected: Vec<usize> = (0..xyz.len()).collect();
        expected.sort_by(|&a, &b| xyz[a].partial_cmp(&xyz[b]).unwrap());
        assert_eq!(order, expected);
    }

    /// §8.5 -- globally ascending after concatenation for W in {1..64}.
    #[test]
    fn concatenation_is_globally_ascending_for_varied_world_sizes() {
        let mut rng = rand::rng();
        let xyz: Vec<f32> = (0..500).map(|_| rng.random_range(-100.0..100.0)).collect();

        for size in [1, 2, 3, 4, 7, 16, 31, 64] {
            let order = run_distributed_sort(xyz.clone(), size);
            assert_eq!(order.len(), xyz.len(), "size={size} dropped or duplicated entries");
            for w in order.windows(2) {
                assert!(xyz[w[0]] <= xyz[w[1]], "size={size} not ascending: {w:?}");
            }
        }
    }

    #[test]
    fn handles_n_less_than_world_size() {
        let xyz = vec![5.0, -2.0, 0.5];
        let order = run_distributed_sort(xyz.clone(), 8);
        assert_eq!(order.len(), 3);
        for w in order.windows(2) {
            assert!(xyz[w[0]] <= xyz[w[1]]);
        }
    }
}
