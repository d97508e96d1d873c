//! Depth-order pipeline: stable sort of primitive indices by projected
//! depth, plus the contiguous-block and octant partitioners used by the
//! distributed driver.

use splat_linalg::Vec4;

/// Returns a permutation `pi` of `0..xyz.len()` such that
/// `depth[pi[0]] <= ... <= depth[pi[n-1]]`, where `depth[i] = xyz[i].dot(dir)`.
/// Stable: primitives with equal depth keep their input relative order.
pub fn sort_by_depth(xyz: &[Vec4], dir: Vec4) -> Vec<usize> {
    let depth: Vec<f32> = xyz.iter().map(|&p| p.dot(dir)).collect();
    let mut order: Vec<usize> = (0..xyz.len()).collect();
    order.sort_by(|&a, &b| {
        depth[a]
            .partial_cmp(&depth[b])
            .expect("sort_by_depth requires finite, non-NaN positions")
    });
    order
}

/// Splits a global permutation into `k` contiguous sub-ranges sized
/// `ceil(n/k)` or `floor(n/k)`, with the first `n mod k` blocks receiving
/// the larger size.
pub fn block_partition(perm: &[usize], k: usize) -> Vec<Vec<usize>> {
    assert!(k > 0, "block_partition requires at least one block");
    let n = perm.len();
    let base = n / k;
    let remainder = n % k;

    let mut blocks = Vec::with_capacity(k);
    let mut offset = 0;
    for block_idx in 0..k {
        let size = base + usize::from(block_idx < remainder);
        blocks.push(perm[offset..offset + size].to_vec());
        offset += size;
    }
    blocks
}

/// Recursive KD-like partitioner (spec.md §4.E, optional): cuts the
/// primitive set into `2^depth` octants by alternating sort directions
/// along X, Y, Z and bisecting, selecting the `id`-th leaf.
///
/// Grounded on `get_quad_block` in the original MPI implementation.
pub fn octant_block(xyz: &[Vec4], id: usize, depth: u32) -> Vec<usize> {
    let axes = [
        Vec4::direction(1.0, 0.0, 0.0),
        Vec4::direction(0.0, 1.0, 0.0),
        Vec4::direction(0.0, 0.0, 1.0),
    ];

    let mut idx: Vec<usize> = (0..xyz.len()).collect();
    let (mut lo, mut hi) = (0usize, xyz.len());
    let mut id = id;

    for level in 0..depth {
        let axis = axes[level as usize % 3];
        let view = &mut idx[lo..hi];
        let depth_of = |&i: &usize| xyz[i].dot(axis);
        view.sort_by(|a, b| {
            depth_of(a)
                .partial_cmp(&depth_of(b))
                .expect("octant_block requires finite positions")
        });
        let mid = lo + (hi - lo) / 2;
        if id & 1 == 1 {
            lo = mid;
        } else {
            hi = mid;
        }
        id >>= 1;
    }
    idx[lo..hi].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use splat_linalg::vec4;

    fn pos(z_values: &[f32]) -> Vec<Vec4> {
        z_values.iter().map(|&z| vec4(0.0, 0.0, z, 1.0)).collect()
    }

    #[test]
    fn sorts_ascending_by_dot_product() {
        let xyz = pos(&[3.0, 1.0, 2.0]);
        let order = sort_by_depth(&xyz, Vec4::direction(0.0, 0.0, 1.0));
        assert_eq!(order, vec![1, 2, 0]);
    }

    /// §8.3 -- equal-depth primitives keep input order.
    #[test]
    fn stable_for_equal_depth() {
        let xyz = pos(&[1.0, 1.0, 1.0, 0.0]);
        let order = sort_by_depth(&xyz, Vec4::direction(0.0, 0.0, 1.0));
        assert_eq!(order, vec![3, 0, 1, 2]);
    }

    #[test]
    fn flipping_direction_reverses_effective_order() {
        let xyz = pos(&[3.0, 1.0, 2.0]);
        let fwd = sort_by_depth(&xyz, Vec4::direction(0.0, 0.0, 1.0));
        let rev = sort_by_depth(&xyz, Vec4::direction(0.0, 0.0, -1.0));
        assert_eq!(fwd, rev.into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn block_partition_sizes_larger_blocks_first() {
        let perm: Vec<usize> = (0..10).collect();
        let blocks = block_partition(&perm, 3);
        let sizes: Vec<usize> = blocks.iter().map(std::vec::Vec::len).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(blocks.iter().map(std::vec::Vec::len).sum::<usize>(), 10);
    }

    #[test]
    fn block_partition_handles_more_blocks_than_elements() {
        let perm: Vec<usize> = (0..2).collect();
        let blocks = block_partition(&perm, 5);
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks.iter().filter(|b| !b.is_empty()).count(), 2);
    }

    #[test]
    fn octant_block_covers_all_primitives_exactly_once() {
        let xyz: Vec<Vec4> = (0..16)
            .map(|i| vec4(i as f32, (i * 7 % 5) as f32, (i * 3 % 4) as f32, 1.0))
            .collect();
        let mut seen = vec![false; xyz.len()];
        for id in 0..4 {
            for &i in &octant_block(&xyz, id, 2) {
                assert!(!seen[i], "primitive {i} assigned to more than one octant");
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    /// §8.3 -- stability holds for randomized inputs, not just hand-picked
    /// ones: repeated depths keep their relative input order.
    #[test]
    fn sort_by_depth_is_stable_for_randomized_duplicate_depths() {
        use rand::Rng;
        let mut rng = rand::rng();

        let depths: Vec<f32> = (0..200).map(|_| rng.random_range(0..5) as f32).collect();
        let xyz = pos(&depths);
        let order = sort_by_depth(&xyz, Vec4::direction(0.0, 0.0, 1.0));

        for window in order.windows(2) {
            let (a, b) = (window[0], window[1]);
            assert!(depths[a] <= depths[b], "not ascending: {a}@{} then {b}@{}", depths[a], depths[b]);
            if (depths[a] - depths[b]).abs() < f32::EPSILON {
                assert!(a < b, "equal-depth primitives {a} and {b} were reordered");
            }
        }
    }
}
