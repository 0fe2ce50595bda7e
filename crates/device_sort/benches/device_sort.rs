use std::hint::black_box;
use std::time::{Duration, Instant};

use bench::{DISTRIBUTIONS, apply_runtime_for_size, generate_u32};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use device_sort::{
    CountingCursor, DeviceBuffer, HostStream, Less, Stream, sort_keys, sort_pairs,
};

const BENCH_SIZES: [usize; 4] = [4096, 16384, 65536, 262144];

fn bench_device_sort(c: &mut Criterion) {
    let stream = HostStream::new().expect("host stream");

    for &dist in &DISTRIBUTIONS {
        let mut group = c.benchmark_group(format!("device_sort/{}", dist.label()));

        for &size in &BENCH_SIZES {
            apply_runtime_for_size(&mut group, size);
            let base = generate_u32(dist, size, 0xBA5E_0001);
            let input = DeviceBuffer::from_slice(&base).expect("input buffer");
            let output = DeviceBuffer::<u32>::zeroed(size).expect("output buffer");
            let values = DeviceBuffer::<u32>::zeroed(size).expect("values buffer");
            let (keys_in, keys_out, values_out) = (input.slice(), output.slice(), values.slice());

            let mut storage_size = 0;
            sort_pairs(
                None,
                &mut storage_size,
                keys_in.clone(),
                &keys_out,
                CountingCursor::new(0u32),
                &values_out,
                size,
                Less,
                &stream,
                false,
            )
            .expect("query");
            let scratch = DeviceBuffer::<u8>::zeroed(storage_size).expect("scratch buffer");

            group.bench_function(BenchmarkId::new("sort_keys", size), |bencher| {
                bencher.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let start = Instant::now();
                        sort_keys(
                            Some(&scratch),
                            &mut storage_size.clone(),
                            keys_in.clone(),
                            &keys_out,
                            size,
                            Less,
                            &stream,
                            false,
                        )
                        .expect("sort_keys");
                        stream.synchronize().expect("synchronize");
                        total += start.elapsed();
                    }
                    total
                });
            });

            group.bench_function(BenchmarkId::new("sort_pairs_argsort", size), |bencher| {
                bencher.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let start = Instant::now();
                        sort_pairs(
                            Some(&scratch),
                            &mut storage_size.clone(),
                            keys_in.clone(),
                            &keys_out,
                            CountingCursor::new(0u32),
                            &values_out,
                            size,
                            Less,
                            &stream,
                            false,
                        )
                        .expect("sort_pairs");
                        stream.synchronize().expect("synchronize");
                        total += start.elapsed();
                    }
                    total
                });
            });

            group.bench_function(BenchmarkId::new("std_stable", size), |bencher| {
                bencher.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let mut data = base.clone();
                        let start = Instant::now();
                        data.sort();
                        total += start.elapsed();
                        black_box(&data);
                    }
                    total
                });
            });

            group.bench_function(BenchmarkId::new("std_unstable", size), |bencher| {
                bencher.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let mut data = base.clone();
                        let start = Instant::now();
                        data.sort_unstable();
                        total += start.elapsed();
                        black_box(&data);
                    }
                    total
                });
            });
        }

        group.finish();
    }
}

criterion_group!(benches, bench_device_sort);
criterion_main!(benches);
