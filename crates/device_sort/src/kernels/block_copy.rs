use crate::runtime::{DeviceCopy, DeviceSlice, Group, Kernel};
use crate::storage::with_values;

/// Copies keys (and values) element for element, one lane per element.
pub(crate) struct BlockCopyKernel<K, V> {
    pub keys_input: DeviceSlice<K>,
    pub keys_output: DeviceSlice<K>,
    pub values_input: DeviceSlice<V>,
    pub values_output: DeviceSlice<V>,
    pub size: usize,
}

impl<K: DeviceCopy, V: DeviceCopy> Kernel for BlockCopyKernel<K, V> {
    fn name(&self) -> &'static str {
        "block_copy"
    }

    fn run_group(&self, group: &Group) {
        let offset = group.id() * group.block_size();
        for lane in group.lanes() {
            let index = offset + lane;
            if index >= self.size {
                break;
            }
            unsafe {
                self.keys_output.write(index, self.keys_input.read(index));
                if with_values::<V>() {
                    self.values_output.write(index, self.values_input.read(index));
                }
            }
        }
    }
}
