use crate::runtime::{DeviceCopy, DeviceSlice};

/// Random-access, device-side read access to an input sequence.
pub trait ReadCursor<T>: Clone + Send + Sync + 'static {
    /// # Safety
    ///
    /// `index` must be inside the sequence and nothing may be writing it
    /// concurrently.
    unsafe fn read_at(&self, index: usize) -> T;
}

impl<T: DeviceCopy> ReadCursor<T> for DeviceSlice<T> {
    #[inline]
    unsafe fn read_at(&self, index: usize) -> T {
        unsafe { self.read(index) }
    }
}

/// Yields `start + index` without touching memory.
///
/// Pairing it with `sort_pairs` produces the sorting permutation of the keys.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CountingCursor<T> {
    start: T,
}

impl<T> CountingCursor<T> {
    pub fn new(start: T) -> Self {
        Self { start }
    }
}

macro_rules! impl_counting_cursor {
    ($($ty:ty),*) => {
        $(
            impl ReadCursor<$ty> for CountingCursor<$ty> {
                #[inline]
                unsafe fn read_at(&self, index: usize) -> $ty {
                    self.start.wrapping_add(index as $ty)
                }
            }
        )*
    };
}

impl_counting_cursor!(u32, u64, usize, i32, i64);
