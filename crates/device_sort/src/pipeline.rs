//! The merge sort pipeline: group sort, merge passes, copy-back.

use std::marker::PhantomData;

use log::debug;

use crate::compare::BinaryPredicate;
use crate::cursor::ReadCursor;
use crate::diagnostics::StageTimer;
use crate::error::{DeviceError, DeviceResult};
use crate::kernels::{BlockCopyKernel, BlockMergeKernel, BlockSortKernel};
use crate::runtime::{DeviceBuffer, DeviceCopy, DeviceSlice, LaunchConfig, Stream};
use crate::storage::{StorageLayout, with_values};

const OUTPUT: usize = 0;
const SCRATCH: usize = 1;

/// Two-phase sort entry shared by the public call shapes.
///
/// Without `temporary_storage` only `storage_size` is written. With it, the
/// sort is enqueued on `stream`; `storage_size` is left alone.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sort_impl<K, V, KI, VI, C, S>(
    temporary_storage: Option<&DeviceBuffer<u8>>,
    storage_size: &mut usize,
    keys_input: KI,
    keys_output: &DeviceSlice<K>,
    values_input: VI,
    values_output: &DeviceSlice<V>,
    size: usize,
    compare: C,
    stream: &S,
    debug_synchronous: bool,
    block_size: usize,
) -> DeviceResult
where
    K: DeviceCopy,
    V: DeviceCopy,
    KI: ReadCursor<K>,
    VI: ReadCursor<V>,
    C: BinaryPredicate<K>,
    S: Stream,
{
    let layout = StorageLayout::new::<K, V>(size)?;
    let Some(storage) = temporary_storage else {
        *storage_size = layout.storage_size();
        return Ok(());
    };

    if size == 0 {
        return Ok(());
    }
    if block_size == 0 {
        return Err(DeviceError::InvalidValue("block_size must be positive".to_owned()));
    }
    check_output("keys", keys_output.len(), size)?;
    if with_values::<V>() {
        check_output("values", values_output.len(), size)?;
    }

    let keys_scratch = storage.view::<K>(0, size)?;
    let values_scratch = storage.view::<V>(layout.keys_bytes, size)?;

    let config = LaunchConfig {
        grid_size: size.div_ceil(block_size),
        block_size,
    };
    let timer = StageTimer::new(stream, debug_synchronous);
    timer.grid(config.block_size, config.grid_size);

    timer.stage("group_sort", size, |stream| {
        stream.launch(
            config,
            BlockSortKernel {
                keys_input,
                keys_output: keys_output.clone(),
                values_input,
                values_output: values_output.clone(),
                size,
                compare: compare.clone(),
                _marker: PhantomData,
            },
        )
    })?;

    let keys = [keys_output.clone(), keys_scratch];
    let values = [values_output.clone(), values_scratch];
    let mut current = OUTPUT;
    let mut run_width = block_size;
    let mut passes = 0usize;
    while run_width < size {
        let next = current ^ 1;
        let stage = if next == SCRATCH {
            "merge_into_scratch"
        } else {
            "merge_into_output"
        };
        timer.stage(stage, size, |stream| {
            stream.launch(
                config,
                BlockMergeKernel {
                    keys_input: keys[current].clone(),
                    keys_output: keys[next].clone(),
                    values_input: values[current].clone(),
                    values_output: values[next].clone(),
                    size,
                    run_width,
                    compare: compare.clone(),
                },
            )
        })?;
        current = next;
        run_width = run_width.saturating_mul(2);
        passes += 1;
    }

    debug!("sort of {size} elements queued with {passes} merge passes");

    if current == SCRATCH {
        timer.stage("copy_back", size, |stream| {
            stream.launch(
                config,
                BlockCopyKernel {
                    keys_input: keys[SCRATCH].clone(),
                    keys_output: keys[OUTPUT].clone(),
                    values_input: values[SCRATCH].clone(),
                    values_output: values[OUTPUT].clone(),
                    size,
                },
            )
        })?;
    }

    Ok(())
}

fn check_output(what: &str, len: usize, size: usize) -> DeviceResult {
    if len < size {
        return Err(DeviceError::InvalidValue(format!(
            "{what} output holds {len} elements, sort needs {size}"
        )));
    }
    Ok(())
}
