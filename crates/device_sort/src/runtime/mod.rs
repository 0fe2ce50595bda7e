//! Host-backed reference runtime.
//!
//! Device memory is ordinary host memory behind shared handles, and each
//! stream is a worker thread that runs launches in the order they were
//! queued. The sort pipeline only talks to it through [`Stream`], [`Kernel`]
//! and the memory handles, the same surface a real accelerator backend would
//! provide.

mod memory;
mod stream;

pub use memory::{ALLOCATION_ALIGNMENT, DeviceBuffer, DeviceCopy, DeviceSlice};
pub use stream::{Group, HostStream, Kernel, LaunchConfig, MAX_BLOCK_SIZE, Stream, default_stream};
