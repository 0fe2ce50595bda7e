//! Device code for the three sort stages.

mod block_copy;
mod block_merge;
mod block_sort;
mod common;

pub(crate) use block_copy::BlockCopyKernel;
pub(crate) use block_merge::BlockMergeKernel;
pub(crate) use block_sort::BlockSortKernel;
