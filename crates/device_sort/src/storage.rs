//! Scratch-memory planning for the two-phase query/execute protocol.

use crate::TUNED_PARAMS;
use crate::error::{DeviceError, DeviceResult};

/// Whether values take part in the sort. Zero-sized value types (such as
/// `EmptyType`) are elided entirely.
#[inline]
pub(crate) const fn with_values<V>() -> bool {
    size_of::<V>() != 0
}

#[inline]
pub(crate) fn align_size(bytes: usize) -> Option<usize> {
    bytes.checked_next_multiple_of(TUNED_PARAMS.storage_alignment)
}

/// Byte layout of the scratch buffer: keys region, then values region.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StorageLayout {
    pub keys_bytes: usize,
    pub values_bytes: usize,
    total: usize,
}

impl StorageLayout {
    pub fn new<K, V>(size: usize) -> DeviceResult<Self> {
        let keys_bytes = region_bytes::<K>(size)?;
        let values_bytes = if with_values::<V>() {
            region_bytes::<V>(size)?
        } else {
            0
        };
        let total = keys_bytes
            .checked_add(values_bytes)
            .ok_or_else(|| overflow(size))?;
        Ok(Self {
            keys_bytes,
            values_bytes,
            total,
        })
    }

    /// Bytes the caller must allocate. Never zero, so an allocation made
    /// from it is always well defined.
    pub fn storage_size(&self) -> usize {
        if self.total == 0 {
            TUNED_PARAMS.empty_storage_size
        } else {
            self.total
        }
    }
}

fn region_bytes<T>(size: usize) -> DeviceResult<usize> {
    size.checked_mul(size_of::<T>())
        .and_then(align_size)
        .ok_or_else(|| overflow(size))
}

fn overflow(size: usize) -> DeviceError {
    DeviceError::InvalidValue(format!("scratch size for {size} elements overflows usize"))
}
