//! Device-resident merge sort.
//!
//! Keys (and optionally values) already living in device memory are sorted
//! by a pipeline of launches on a [`Stream`]: every group sorts one
//! `block_size` chunk, merge passes double the sorted run width until one
//! run covers the input, and a final copy moves the result back into the
//! caller's output when the last pass ended in scratch memory.
//!
//! The entry points follow a two-phase protocol. Called with no scratch
//! buffer they only report the number of scratch bytes needed; called again
//! with a buffer of at least that size they enqueue the sort.
//!
//! ```
//! use device_sort::{DeviceBuffer, HostStream, Less, sort_keys};
//!
//! let stream = HostStream::new()?;
//! let input = DeviceBuffer::from_slice(&[5u32, 3, 1, 4, 2])?;
//! let output = DeviceBuffer::<u32>::zeroed(5)?;
//!
//! let mut storage_size = 0;
//! let (keys, out) = (input.slice(), output.slice());
//! sort_keys(None, &mut storage_size, keys.clone(), &out, 5, Less, &stream, false)?;
//! let scratch = DeviceBuffer::<u8>::zeroed(storage_size)?;
//! sort_keys(Some(&scratch), &mut storage_size, keys, &out, 5, Less, &stream, false)?;
//!
//! assert_eq!(output.to_vec(&stream)?, vec![1, 2, 3, 4, 5]);
//! # Ok::<(), device_sort::DeviceError>(())
//! ```

mod compare;
mod cursor;
mod diagnostics;
mod error;
mod kernels;
mod pipeline;
pub mod runtime;
mod storage;

use bytemuck::{Pod, Zeroable};

pub use compare::{BinaryPredicate, Greater, Less};
pub use cursor::{CountingCursor, ReadCursor};
pub use error::{DeviceError, DeviceResult};
pub use runtime::{
    DeviceBuffer, DeviceCopy, DeviceSlice, HostStream, LaunchConfig, Stream, default_stream,
};
pub use storage::StorageLayout;

#[derive(Clone, Copy, Debug)]
pub struct TunedParams {
    pub block_size: usize,
    pub storage_alignment: usize,
    pub empty_storage_size: usize,
}

pub const TUNED_PARAMS: TunedParams = TunedParams {
    block_size: 256,
    storage_alignment: 256,
    empty_storage_size: 4,
};

/// Value type of a keys-only sort. Zero-sized, so no value is ever stored
/// or moved.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EmptyType;

// SAFETY: a zero-sized type has no bytes to validate.
unsafe impl Zeroable for EmptyType {}
unsafe impl Pod for EmptyType {}

/// Sorts `size` keys from `keys_input` into `keys_output`.
///
/// With `temporary_storage == None` this only writes the required scratch
/// size to `storage_size`. With a scratch buffer of at least that size the
/// sort is enqueued on `stream`; with `debug_synchronous` every stage is
/// waited on and timed on stdout. Input and output may be the same slice.
#[allow(clippy::too_many_arguments)]
pub fn sort_keys<K, KI, C, S>(
    temporary_storage: Option<&DeviceBuffer<u8>>,
    storage_size: &mut usize,
    keys_input: KI,
    keys_output: &DeviceSlice<K>,
    size: usize,
    compare: C,
    stream: &S,
    debug_synchronous: bool,
) -> DeviceResult
where
    K: DeviceCopy,
    KI: ReadCursor<K>,
    C: BinaryPredicate<K>,
    S: Stream,
{
    let values = DeviceSlice::<EmptyType>::dangling(size);
    pipeline::sort_impl(
        temporary_storage,
        storage_size,
        keys_input,
        keys_output,
        values.clone(),
        &values,
        size,
        compare,
        stream,
        debug_synchronous,
        TUNED_PARAMS.block_size,
    )
}

/// Sorts `size` keys and carries each value along with its key.
///
/// Same two-phase protocol as [`sort_keys`].
#[allow(clippy::too_many_arguments)]
pub fn sort_pairs<K, V, KI, VI, C, S>(
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
) -> DeviceResult
where
    K: DeviceCopy,
    V: DeviceCopy,
    KI: ReadCursor<K>,
    VI: ReadCursor<V>,
    C: BinaryPredicate<K>,
    S: Stream,
{
    pipeline::sort_impl(
        temporary_storage,
        storage_size,
        keys_input,
        keys_output,
        values_input,
        values_output,
        size,
        compare,
        stream,
        debug_synchronous,
        TUNED_PARAMS.block_size,
    )
}
