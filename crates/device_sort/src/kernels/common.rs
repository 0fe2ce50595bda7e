use std::ops::Range;

use crate::compare::BinaryPredicate;
use crate::runtime::{DeviceCopy, DeviceSlice};

/// Number of elements of the sorted `run` ordered strictly before `key`.
#[inline]
pub fn count_less<K, C: BinaryPredicate<K>>(run: &[K], key: &K, compare: &C) -> usize {
    run.partition_point(|x| compare.less(x, key))
}

/// Number of elements of the sorted `run` not ordered after `key`.
#[inline]
pub fn count_not_greater<K, C: BinaryPredicate<K>>(run: &[K], key: &K, compare: &C) -> usize {
    run.partition_point(|x| !compare.less(key, x))
}

/// Destination of `tile[index]` when the sorted sub-runs of `width` that
/// contain it are merged with their sibling.
///
/// Equal keys from the left sub-run land first, so repeated rounds form a
/// stable sort.
#[inline]
pub fn merged_rank<K, C: BinaryPredicate<K>>(
    tile: &[K],
    index: usize,
    width: usize,
    compare: &C,
) -> usize {
    let base = index / (2 * width) * (2 * width);
    let mid = (base + width).min(tile.len());
    let end = (base + 2 * width).min(tile.len());
    let key = &tile[index];

    if index < mid {
        index + count_less(&tile[mid..end], key, compare)
    } else {
        base + (index - mid) + count_not_greater(&tile[base..mid], key, compare)
    }
}

/// How many of the first `diagonal` outputs of the stable merge of `left`
/// and `right` come from `left`.
///
/// # Safety
///
/// Both ranges must be in bounds for `keys` and not written concurrently.
pub unsafe fn merge_path<K: DeviceCopy, C: BinaryPredicate<K>>(
    keys: &DeviceSlice<K>,
    left: Range<usize>,
    right: Range<usize>,
    diagonal: usize,
    compare: &C,
) -> usize {
    let mut lo = diagonal.saturating_sub(right.len());
    let mut hi = diagonal.min(left.len());

    while lo < hi {
        let mid = lo + ((hi - lo) >> 1);
        let l = unsafe { keys.read(left.start + mid) };
        let r = unsafe { keys.read(right.start + diagonal - 1 - mid) };
        if compare.less(&r, &l) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    lo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Less;
    use crate::runtime::DeviceBuffer;

    #[test]
    fn merged_rank_is_a_stable_permutation() {
        // Sorted sub-runs of width 3: [1 4 4] [2 4 9] [0 5]
        let tile = [1u32, 4, 4, 2, 4, 9, 0, 5];
        let ranks: Vec<usize> = (0..tile.len())
            .map(|i| merged_rank(&tile, i, 3, &Less))
            .collect();
        assert_eq!(ranks, vec![0, 2, 3, 1, 4, 5, 6, 7]);
    }

    #[test]
    fn merged_rank_handles_short_tail() {
        let tile = [3u8, 1];
        assert_eq!(merged_rank(&tile, 0, 1, &Less), 1);
        assert_eq!(merged_rank(&tile, 1, 1, &Less), 0);
        assert_eq!(merged_rank(&tile, 0, 4, &Less), 0);
    }

    #[test]
    fn merge_path_matches_sequential_merge() {
        let left = [1u32, 3, 3, 7, 8];
        let right = [2u32, 3, 4, 9];
        let data: Vec<u32> = left.iter().chain(right.iter()).copied().collect();
        let buffer = DeviceBuffer::from_slice(&data).unwrap();
        let keys = buffer.slice();

        // Left-first merge order: 1L 2R 3L 3L 3R 4R 7L 8L 9R
        let from_left = [0, 1, 1, 2, 3, 3, 3, 4, 5, 5];
        for (diagonal, &expected) in from_left.iter().enumerate() {
            let got = unsafe { merge_path(&keys, 0..5, 5..9, diagonal, &Less) };
            assert_eq!(got, expected, "diagonal={diagonal}");
        }
    }
}
