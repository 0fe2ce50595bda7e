use std::time::Duration;

use criterion::measurement::Measurement;
use criterion::{BenchmarkGroup, SamplingMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SMALL_RUNTIME_SAMPLE_SIZE: usize = 15;
const SMALL_RUNTIME_WARM_UP_MS: u64 = 100;
const SMALL_RUNTIME_MEASURE_MS: u64 = 200;
const MEDIUM_RUNTIME_SAMPLE_SIZE: usize = 15;
const MEDIUM_RUNTIME_WARM_UP_MS: u64 = 500;
const MEDIUM_RUNTIME_MEASURE_MS: u64 = 1000;
const LARGE_RUNTIME_SAMPLE_SIZE: usize = 10;
const LARGE_RUNTIME_WARM_UP_MS: u64 = 800;
const LARGE_RUNTIME_MEASURE_MS: u64 = 1500;
const RNG_SEED: u64 = 0x5EED_2026;

pub fn apply_small_runtime_config<M: Measurement>(group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(SMALL_RUNTIME_SAMPLE_SIZE);
    group.warm_up_time(Duration::from_millis(SMALL_RUNTIME_WARM_UP_MS));
    group.measurement_time(Duration::from_millis(SMALL_RUNTIME_MEASURE_MS));
}

pub fn apply_medium_runtime_config<M: Measurement>(group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(MEDIUM_RUNTIME_SAMPLE_SIZE);
    group.warm_up_time(Duration::from_millis(MEDIUM_RUNTIME_WARM_UP_MS));
    group.measurement_time(Duration::from_millis(MEDIUM_RUNTIME_MEASURE_MS));
}

pub fn apply_large_runtime_config<M: Measurement>(group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(LARGE_RUNTIME_SAMPLE_SIZE);
    group.warm_up_time(Duration::from_millis(LARGE_RUNTIME_WARM_UP_MS));
    group.measurement_time(Duration::from_millis(LARGE_RUNTIME_MEASURE_MS));
}

/// Picks a runtime preset by input size; large inputs switch to flat
/// sampling so a single iteration is never repeated too often.
pub fn apply_runtime_for_size<M: Measurement>(group: &mut BenchmarkGroup<'_, M>, size: usize) {
    if size <= 16384 {
        group.sampling_mode(SamplingMode::Auto);
        apply_small_runtime_config(group);
    } else if size <= 262144 {
        group.sampling_mode(SamplingMode::Flat);
        apply_medium_runtime_config(group);
    } else {
        group.sampling_mode(SamplingMode::Flat);
        apply_large_runtime_config(group);
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Distribution {
    RandomUniform,
    NearlySorted1pctSwaps,
    FewUnique,
}

pub const DISTRIBUTIONS: [Distribution; 3] = [
    Distribution::RandomUniform,
    Distribution::NearlySorted1pctSwaps,
    Distribution::FewUnique,
];

impl Distribution {
    pub fn label(self) -> &'static str {
        match self {
            Self::RandomUniform => "random_uniform",
            Self::NearlySorted1pctSwaps => "nearly_sorted_1pct_swaps",
            Self::FewUnique => "few_unique",
        }
    }
}

pub fn generate_u32(dist: Distribution, size: usize, salt: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(mix_seed(RNG_SEED ^ (size as u64) ^ salt));
    match dist {
        Distribution::RandomUniform => (0..size).map(|_| rng.random()).collect(),
        Distribution::NearlySorted1pctSwaps => {
            let mut data: Vec<u32> = (0..size as u32).collect();
            let swaps = (size / 100).max(1);
            for _ in 0..swaps {
                let a = rng.random_range(0..size);
                let b = rng.random_range(0..size);
                data.swap(a, b);
            }
            data
        }
        Distribution::FewUnique => (0..size).map(|_| rng.random_range(0..16) * 17).collect(),
    }
}

#[inline]
pub fn mix_seed(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
