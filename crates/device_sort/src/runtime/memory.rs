use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::ops::Range;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use bytemuck::Pod;

use super::Stream;
use crate::error::{DeviceError, DeviceResult};

/// Base alignment of every device allocation.
pub const ALLOCATION_ALIGNMENT: usize = 256;

/// Element types that may live in device memory.
///
/// Device memory is plain bytes shared with the stream worker, so elements
/// must be valid for any bit pattern and free to move between threads.
pub trait DeviceCopy: Pod + Send + Sync {}

impl<T: Pod + Send + Sync> DeviceCopy for T {}

struct Allocation {
    ptr: NonNull<u8>,
    layout: Layout,
}

// Element access goes through raw pointers; kernels only ever touch disjoint
// index ranges from different groups.
unsafe impl Send for Allocation {}
unsafe impl Sync for Allocation {}

impl Allocation {
    fn zeroed(bytes: usize) -> DeviceResult<Self> {
        // Zero-byte buffers still get a real, aligned block so every view has
        // a valid base pointer.
        let layout = Layout::from_size_align(bytes.max(1), ALLOCATION_ALIGNMENT)
            .map_err(|_| DeviceError::OutOfMemory { bytes })?;
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(DeviceError::OutOfMemory { bytes })?;
        Ok(Self { ptr, layout })
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// An owned, zero-initialized region of device memory holding `len` elements.
pub struct DeviceBuffer<T> {
    alloc: Arc<Allocation>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: DeviceCopy> DeviceBuffer<T> {
    pub fn zeroed(len: usize) -> DeviceResult<Self> {
        let bytes = len
            .checked_mul(size_of::<T>())
            .ok_or(DeviceError::OutOfMemory { bytes: usize::MAX })?;
        Ok(Self {
            alloc: Arc::new(Allocation::zeroed(bytes)?),
            len,
            _marker: PhantomData,
        })
    }

    pub fn from_slice(data: &[T]) -> DeviceResult<Self> {
        let buffer = Self::zeroed(data.len())?;
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), buffer.as_ptr(), data.len());
        }
        Ok(buffer)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handle covering the whole buffer.
    pub fn slice(&self) -> DeviceSlice<T> {
        DeviceSlice {
            alloc: Some(Arc::clone(&self.alloc)),
            ptr: self.base(),
            len: self.len,
        }
    }

    pub fn slice_range(&self, range: Range<usize>) -> DeviceResult<DeviceSlice<T>> {
        if range.start > range.end || range.end > self.len {
            return Err(DeviceError::InvalidValue(format!(
                "range {}..{} out of bounds for buffer of {} elements",
                range.start, range.end, self.len
            )));
        }
        let ptr = unsafe { NonNull::new_unchecked(self.as_ptr().add(range.start)) };
        Ok(DeviceSlice {
            alloc: Some(Arc::clone(&self.alloc)),
            ptr,
            len: range.end - range.start,
        })
    }

    /// Waits for `stream` to drain, then copies the buffer back to the host.
    pub fn to_vec<S: Stream>(&self, stream: &S) -> DeviceResult<Vec<T>> {
        stream.synchronize()?;
        let host = unsafe { std::slice::from_raw_parts(self.as_ptr().cast_const(), self.len) };
        Ok(host.to_vec())
    }

    /// Waits for `stream` to drain, then overwrites the buffer with `data`.
    pub fn copy_from_slice<S: Stream>(&self, stream: &S, data: &[T]) -> DeviceResult {
        if data.len() != self.len {
            return Err(DeviceError::InvalidValue(format!(
                "host slice has {} elements, buffer has {}",
                data.len(),
                self.len
            )));
        }
        stream.synchronize()?;
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), self.as_ptr(), data.len());
        }
        Ok(())
    }

    #[inline]
    fn base(&self) -> NonNull<T> {
        self.alloc.ptr.cast()
    }

    #[inline]
    fn as_ptr(&self) -> *mut T {
        self.base().as_ptr()
    }
}

impl DeviceBuffer<u8> {
    /// Reinterprets `len` elements of type `T` starting `offset` bytes into
    /// this byte buffer.
    pub fn view<T: DeviceCopy>(&self, offset: usize, len: usize) -> DeviceResult<DeviceSlice<T>> {
        let end = len
            .checked_mul(size_of::<T>())
            .and_then(|bytes| bytes.checked_add(offset))
            .ok_or_else(|| DeviceError::InvalidValue("scratch view size overflows".to_owned()))?;
        if end > self.len {
            return Err(DeviceError::InvalidValue(format!(
                "scratch view needs {end} bytes, buffer holds {}",
                self.len
            )));
        }
        if (self.as_ptr() as usize + offset) % align_of::<T>() != 0 {
            return Err(DeviceError::InvalidValue(format!(
                "offset {offset} is not aligned to {}",
                align_of::<T>()
            )));
        }
        let ptr = unsafe { NonNull::new_unchecked(self.as_ptr().add(offset)) };
        Ok(DeviceSlice {
            alloc: Some(Arc::clone(&self.alloc)),
            ptr: ptr.cast(),
            len,
        })
    }
}

/// A shared handle to a run of device elements.
///
/// Handles keep their allocation alive, so work queued on a stream may
/// outlive the [`DeviceBuffer`] it was built from.
pub struct DeviceSlice<T> {
    alloc: Option<Arc<Allocation>>,
    ptr: NonNull<T>,
    len: usize,
}

unsafe impl<T: Send> Send for DeviceSlice<T> {}
unsafe impl<T: Sync> Sync for DeviceSlice<T> {}

impl<T> Clone for DeviceSlice<T> {
    fn clone(&self) -> Self {
        Self {
            alloc: self.alloc.clone(),
            ptr: self.ptr,
            len: self.len,
        }
    }
}

impl<T: DeviceCopy> DeviceSlice<T> {
    /// Storage-free handle of `len` zero-sized elements.
    pub(crate) fn dangling(len: usize) -> Self {
        debug_assert_eq!(size_of::<T>(), 0);
        Self {
            alloc: None,
            ptr: NonNull::dangling(),
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    ///
    /// No other lane may write `index` while this read is in flight.
    #[inline]
    pub unsafe fn read(&self, index: usize) -> T {
        assert!(
            index < self.len,
            "device read out of bounds: index {index}, len {}",
            self.len
        );
        unsafe { self.ptr.as_ptr().add(index).read() }
    }

    /// # Safety
    ///
    /// No other lane may read or write `index` while this write is in flight.
    #[inline]
    pub unsafe fn write(&self, index: usize, value: T) {
        assert!(
            index < self.len,
            "device write out of bounds: index {index}, len {}",
            self.len
        );
        unsafe { self.ptr.as_ptr().add(index).write(value) }
    }
}
