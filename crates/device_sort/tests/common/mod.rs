#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use device_sort::runtime::{Group, Kernel};
use device_sort::{
    BinaryPredicate, DeviceBuffer, DeviceCopy, DeviceError, DeviceResult, HostStream,
    LaunchConfig, Stream, sort_keys, sort_pairs,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Runs the full query-then-execute protocol for a keys-only sort and reads
/// the result back.
pub fn device_sort_keys<K, C, S>(
    stream: &S,
    keys: &[K],
    compare: C,
    debug_synchronous: bool,
) -> DeviceResult<Vec<K>>
where
    K: DeviceCopy,
    C: BinaryPredicate<K>,
    S: Stream,
{
    let input = DeviceBuffer::from_slice(keys)?;
    let output = DeviceBuffer::<K>::zeroed(keys.len())?;
    let (keys_in, keys_out) = (input.slice(), output.slice());

    let mut storage_size = 0;
    sort_keys(
        None,
        &mut storage_size,
        keys_in.clone(),
        &keys_out,
        keys.len(),
        compare.clone(),
        stream,
        debug_synchronous,
    )?;
    let scratch = DeviceBuffer::<u8>::zeroed(storage_size)?;
    sort_keys(
        Some(&scratch),
        &mut storage_size,
        keys_in,
        &keys_out,
        keys.len(),
        compare,
        stream,
        debug_synchronous,
    )?;
    output.to_vec(stream)
}

/// Same as [`device_sort_keys`] with values carried along.
pub fn device_sort_pairs<K, V, C, S>(
    stream: &S,
    keys: &[K],
    values: &[V],
    compare: C,
    debug_synchronous: bool,
) -> DeviceResult<(Vec<K>, Vec<V>)>
where
    K: DeviceCopy,
    V: DeviceCopy,
    C: BinaryPredicate<K>,
    S: Stream,
{
    let keys_input = DeviceBuffer::from_slice(keys)?;
    let values_input = DeviceBuffer::from_slice(values)?;
    let keys_output = DeviceBuffer::<K>::zeroed(keys.len())?;
    let values_output = DeviceBuffer::<V>::zeroed(values.len())?;
    let (keys_out, values_out) = (keys_output.slice(), values_output.slice());

    let mut storage_size = 0;
    sort_pairs(
        None,
        &mut storage_size,
        keys_input.slice(),
        &keys_out,
        values_input.slice(),
        &values_out,
        keys.len(),
        compare.clone(),
        stream,
        debug_synchronous,
    )?;
    let scratch = DeviceBuffer::<u8>::zeroed(storage_size)?;
    sort_pairs(
        Some(&scratch),
        &mut storage_size,
        keys_input.slice(),
        &keys_out,
        values_input.slice(),
        &values_out,
        keys.len(),
        compare,
        stream,
        debug_synchronous,
    )?;
    Ok((keys_output.to_vec(stream)?, values_output.to_vec(stream)?))
}

/// No adjacent pair is out of order under `compare`.
pub fn is_ordered_by<K, C: BinaryPredicate<K>>(keys: &[K], compare: &C) -> bool {
    keys.windows(2).all(|w| !compare.less(&w[1], &w[0]))
}

/// Same multiset of (key, value) pairs before and after sorting.
pub fn verify_pairs_preserved<K: Ord + Copy, V: Ord + Copy>(
    orig_keys: &[K],
    orig_vals: &[V],
    sorted_keys: &[K],
    sorted_vals: &[V],
) -> bool {
    if orig_keys.len() != sorted_keys.len() || orig_vals.len() != sorted_vals.len() {
        return false;
    }
    let mut before: Vec<(K, V)> = orig_keys.iter().copied().zip(orig_vals.iter().copied()).collect();
    let mut after: Vec<(K, V)> = sorted_keys
        .iter()
        .copied()
        .zip(sorted_vals.iter().copied())
        .collect();
    before.sort();
    after.sort();
    before == after
}

/// Forwards to a [`HostStream`] and remembers which kernels were launched.
pub struct RecordingStream {
    inner: HostStream,
    launches: Mutex<Vec<&'static str>>,
}

impl RecordingStream {
    pub fn new() -> Self {
        Self {
            inner: HostStream::new().unwrap(),
            launches: Mutex::new(Vec::new()),
        }
    }

    pub fn launches(&self) -> Vec<&'static str> {
        self.launches.lock().unwrap().clone()
    }
}

impl Stream for RecordingStream {
    fn launch<K: Kernel>(&self, config: LaunchConfig, kernel: K) -> DeviceResult {
        self.launches.lock().unwrap().push(kernel.name());
        self.inner.launch(config, kernel)
    }

    fn peek_at_last_error(&self) -> DeviceResult {
        self.inner.peek_at_last_error()
    }

    fn synchronize(&self) -> DeviceResult {
        self.inner.synchronize()
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Injected {
    /// The n-th launch (0-based) is refused.
    RefuseLaunch(usize),
    /// The n-th launch faults while running on the device.
    FaultOnDevice(usize),
}

/// Wraps a kernel so that every group faults.
struct Faulting<K>(K);

impl<K: Kernel> Kernel for Faulting<K> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn run_group(&self, group: &Group) {
        panic!("injected fault in group {}", group.id());
    }
}

/// A stream that misbehaves on one chosen launch.
pub struct FaultyStream {
    inner: HostStream,
    injected: Injected,
    attempts: AtomicUsize,
}

impl FaultyStream {
    pub fn new(injected: Injected) -> Self {
        Self {
            inner: HostStream::new().unwrap(),
            injected,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Launches the pipeline attempted, including the failing one.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Stream for FaultyStream {
    fn launch<K: Kernel>(&self, config: LaunchConfig, kernel: K) -> DeviceResult {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.injected {
            Injected::RefuseLaunch(at) if at == n => Err(DeviceError::LaunchFailure {
                kernel: kernel.name(),
                reason: "injected".to_owned(),
            }),
            Injected::FaultOnDevice(at) if at == n => self.inner.launch(config, Faulting(kernel)),
            _ => self.inner.launch(config, kernel),
        }
    }

    fn peek_at_last_error(&self) -> DeviceResult {
        self.inner.peek_at_last_error()
    }

    fn synchronize(&self) -> DeviceResult {
        self.inner.synchronize()
    }
}
