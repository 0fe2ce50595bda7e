use std::marker::PhantomData;
use std::mem;

use super::common;
use crate::compare::BinaryPredicate;
use crate::cursor::ReadCursor;
use crate::runtime::{DeviceCopy, DeviceSlice, Group, Kernel};
use crate::storage::with_values;

/// Sorts each `block_size` chunk of the input inside its group and writes it
/// to the same window of the output.
pub(crate) struct BlockSortKernel<K, V, KI, VI, C> {
    pub keys_input: KI,
    pub keys_output: DeviceSlice<K>,
    pub values_input: VI,
    pub values_output: DeviceSlice<V>,
    pub size: usize,
    pub compare: C,
    pub _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, KI, VI, C> Kernel for BlockSortKernel<K, V, KI, VI, C>
where
    K: DeviceCopy,
    V: DeviceCopy,
    KI: ReadCursor<K>,
    VI: ReadCursor<V>,
    C: BinaryPredicate<K>,
{
    fn name(&self) -> &'static str {
        "block_sort"
    }

    fn run_group(&self, group: &Group) {
        let offset = group.id() * group.block_size();
        let valid = group.block_size().min(self.size - offset);

        // Lanes past `valid` hold nothing and sit out every round.
        let mut keys = Vec::with_capacity(valid);
        let mut values = Vec::with_capacity(if with_values::<V>() { valid } else { 0 });
        for lane in group.lanes().take(valid) {
            keys.push(unsafe { self.keys_input.read_at(offset + lane) });
            if with_values::<V>() {
                values.push(unsafe { self.values_input.read_at(offset + lane) });
            }
        }
        group.barrier();

        let mut keys_next = keys.clone();
        let mut values_next = values.clone();
        let mut width = 1;
        while width < valid {
            for lane in group.lanes().take(valid) {
                let rank = common::merged_rank(&keys, lane, width, &self.compare);
                keys_next[rank] = keys[lane];
                if with_values::<V>() {
                    values_next[rank] = values[lane];
                }
            }
            group.barrier();
            mem::swap(&mut keys, &mut keys_next);
            mem::swap(&mut values, &mut values_next);
            width <<= 1;
        }

        for lane in group.lanes().take(valid) {
            unsafe {
                self.keys_output.write(offset + lane, keys[lane]);
                if with_values::<V>() {
                    self.values_output.write(offset + lane, values[lane]);
                }
            }
        }
    }
}
