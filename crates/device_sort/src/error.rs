use thiserror::Error;

/// Status of a device operation.
///
/// Every stage of a sort reports through this type and the first error is
/// handed back to the caller untouched. `Clone` lets a stream keep returning
/// the same sticky fault from every later status query.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("invalid launch configuration for `{kernel}`: grid={grid_size}, block={block_size}")]
    InvalidConfiguration {
        kernel: &'static str,
        grid_size: usize,
        block_size: usize,
    },
    #[error("failed to launch `{kernel}`: {reason}")]
    LaunchFailure {
        kernel: &'static str,
        reason: String,
    },
    #[error("kernel `{kernel}` faulted: {message}")]
    KernelFault {
        kernel: &'static str,
        message: String,
    },
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("out of device memory: requested {bytes} bytes")]
    OutOfMemory { bytes: usize },
}

pub type DeviceResult<T = ()> = Result<T, DeviceError>;
