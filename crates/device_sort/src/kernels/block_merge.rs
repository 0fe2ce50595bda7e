use super::common;
use crate::compare::BinaryPredicate;
use crate::runtime::{DeviceCopy, DeviceSlice, Group, Kernel};
use crate::storage::with_values;

/// One merge pass: pairs of adjacent runs of `run_width` in the input become
/// runs of `2 * run_width` in the output.
///
/// Each group owns one `block_size` window of the output. It finds where
/// that window starts in the two source runs and then merges head to head
/// until the window is full.
pub(crate) struct BlockMergeKernel<K, V, C> {
    pub keys_input: DeviceSlice<K>,
    pub keys_output: DeviceSlice<K>,
    pub values_input: DeviceSlice<V>,
    pub values_output: DeviceSlice<V>,
    pub size: usize,
    pub run_width: usize,
    pub compare: C,
}

impl<K, V, C> BlockMergeKernel<K, V, C>
where
    K: DeviceCopy,
    V: DeviceCopy,
    C: BinaryPredicate<K>,
{
    /// Fills `out_start..out_end`, which must lie inside the run pair that
    /// starts at `base`.
    unsafe fn merge_window(&self, base: usize, out_start: usize, out_end: usize) {
        let mid = base.saturating_add(self.run_width).min(self.size);
        let end = base
            .saturating_add(self.run_width.saturating_mul(2))
            .min(self.size);

        let diagonal = out_start - base;
        let taken = unsafe {
            common::merge_path(&self.keys_input, base..mid, mid..end, diagonal, &self.compare)
        };
        let mut i = base + taken;
        let mut j = mid + (diagonal - taken);

        for out in out_start..out_end {
            let take_left = j >= end
                || (i < mid
                    && unsafe {
                        !self
                            .compare
                            .less(&self.keys_input.read(j), &self.keys_input.read(i))
                    });
            let src = if take_left {
                i += 1;
                i - 1
            } else {
                j += 1;
                j - 1
            };

            unsafe {
                self.keys_output.write(out, self.keys_input.read(src));
                if with_values::<V>() {
                    self.values_output.write(out, self.values_input.read(src));
                }
            }
        }
    }
}

impl<K, V, C> Kernel for BlockMergeKernel<K, V, C>
where
    K: DeviceCopy,
    V: DeviceCopy,
    C: BinaryPredicate<K>,
{
    fn name(&self) -> &'static str {
        "block_merge"
    }

    fn run_group(&self, group: &Group) {
        let start = group.id() * group.block_size();
        let end = start.saturating_add(group.block_size()).min(self.size);
        let pair_width = self.run_width.saturating_mul(2);

        // A window that straddles two run pairs is merged piecewise.
        let mut out = start;
        while out < end {
            let base = out / pair_width * pair_width;
            let segment_end = base.saturating_add(pair_width).min(end);
            unsafe { self.merge_window(base, out, segment_end) };
            out = segment_end;
        }
    }
}
