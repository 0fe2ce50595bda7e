use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, warn};
use rayon::prelude::*;

use crate::error::{DeviceError, DeviceResult};

/// Largest group the host runtime accepts.
pub const MAX_BLOCK_SIZE: usize = 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LaunchConfig {
    pub grid_size: usize,
    pub block_size: usize,
}

impl LaunchConfig {
    fn validate(self, kernel: &'static str) -> DeviceResult {
        if self.grid_size == 0 || self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(DeviceError::InvalidConfiguration {
                kernel,
                grid_size: self.grid_size,
                block_size: self.block_size,
            });
        }
        Ok(())
    }
}

/// One group of cooperating lanes, as seen from inside a kernel.
#[derive(Clone, Copy, Debug)]
pub struct Group {
    id: usize,
    block_size: usize,
    grid_size: usize,
}

impl Group {
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    #[inline]
    pub fn lanes(&self) -> Range<usize> {
        0..self.block_size
    }

    /// Full-group barrier.
    ///
    /// The host runtime runs the lanes of a round to completion before the
    /// next statement, so every lane's writes are already visible here.
    #[inline]
    pub fn barrier(&self) {}
}

/// Device code: executed once per group of a launch.
pub trait Kernel: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn run_group(&self, group: &Group);
}

/// An in-order queue of device work.
///
/// `launch` only enqueues. Faults raised by queued work surface through
/// `peek_at_last_error` once they have happened, or through `synchronize`,
/// which blocks until everything queued so far has finished.
pub trait Stream {
    fn launch<K: Kernel>(&self, config: LaunchConfig, kernel: K) -> DeviceResult;

    fn peek_at_last_error(&self) -> DeviceResult;

    fn synchronize(&self) -> DeviceResult;
}

enum Command {
    Launch {
        config: LaunchConfig,
        kernel: Box<dyn Kernel>,
    },
    Fence(Sender<()>),
}

#[derive(Default)]
struct StreamState {
    last_error: Mutex<Option<DeviceError>>,
}

impl StreamState {
    fn last_error(&self) -> Option<DeviceError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, err: DeviceError) {
        let mut slot = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert(err);
    }
}

/// Stream backed by a host worker thread; groups of a launch run in parallel
/// on the rayon pool.
///
/// A kernel fault is sticky: later status queries keep returning it and
/// queued work after the fault is dropped without running.
pub struct HostStream {
    sender: Option<Sender<Command>>,
    state: Arc<StreamState>,
    worker: Option<JoinHandle<()>>,
}

impl HostStream {
    pub fn new() -> DeviceResult<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let state = Arc::new(StreamState::default());
        let worker_state = Arc::clone(&state);
        let worker = thread::Builder::new()
            .name("device-stream".to_owned())
            .spawn(move || drain(&receiver, &worker_state))
            .map_err(|err| DeviceError::LaunchFailure {
                kernel: "<stream>",
                reason: err.to_string(),
            })?;
        Ok(Self {
            sender: Some(sender),
            state,
            worker: Some(worker),
        })
    }

    fn send(&self, kernel: &'static str, command: Command) -> DeviceResult {
        let sender = self.sender.as_ref().ok_or_else(|| shut_down(kernel))?;
        sender.send(command).map_err(|_| shut_down(kernel))
    }
}

impl Stream for HostStream {
    fn launch<K: Kernel>(&self, config: LaunchConfig, kernel: K) -> DeviceResult {
        let name = kernel.name();
        config.validate(name)?;
        debug!(
            "enqueue `{name}` grid={} block={}",
            config.grid_size, config.block_size
        );
        self.send(
            name,
            Command::Launch {
                config,
                kernel: Box::new(kernel),
            },
        )
    }

    fn peek_at_last_error(&self) -> DeviceResult {
        match self.state.last_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn synchronize(&self) -> DeviceResult {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        self.send("<synchronize>", Command::Fence(done_tx))?;
        done_rx.recv().map_err(|_| shut_down("<synchronize>"))?;
        self.peek_at_last_error()
    }
}

impl Drop for HostStream {
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// The process-wide stream used when the caller has none of its own.
pub fn default_stream() -> DeviceResult<&'static HostStream> {
    static DEFAULT: OnceLock<HostStream> = OnceLock::new();
    if let Some(stream) = DEFAULT.get() {
        return Ok(stream);
    }
    let stream = HostStream::new()?;
    Ok(DEFAULT.get_or_init(|| stream))
}

fn shut_down(kernel: &'static str) -> DeviceError {
    DeviceError::LaunchFailure {
        kernel,
        reason: "stream worker is gone".to_owned(),
    }
}

fn drain(receiver: &Receiver<Command>, state: &StreamState) {
    for command in receiver {
        match command {
            Command::Launch { config, kernel } => execute(state, config, kernel.as_ref()),
            Command::Fence(done) => {
                let _ = done.send(());
            }
        }
    }
}

fn execute(state: &StreamState, config: LaunchConfig, kernel: &dyn Kernel) {
    let name = kernel.name();
    if state.last_error().is_some() {
        warn!("skipping `{name}`: stream is in an error state");
        return;
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        (0..config.grid_size).into_par_iter().for_each(|id| {
            kernel.run_group(&Group {
                id,
                block_size: config.block_size,
                grid_size: config.grid_size,
            });
        });
    }));

    if let Err(payload) = outcome {
        let message = panic_message(payload.as_ref());
        error!("kernel `{name}` faulted: {message}");
        state.record(DeviceError::KernelFault {
            kernel: name,
            message,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown fault".to_owned()
    }
}
