//! Benchmarks for the per-sample math every engine leans on.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use layered_synth::dsp::{interpolate, limiter, waveform, Adsr, WindowShape};

use crate::BLOCK_SIZES;

pub fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");
    let table: Vec<f32> = (0..2048).map(|i| waveform::sine(i as f32 / 2048.0)).collect();
    let adsr = Adsr::new(0.01, 0.1, 0.7, 0.3);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("envelope", size), &size, |b, _| {
            b.iter(|| {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    *sample = adsr.level(black_box(i as f32 / 44_100.0), None);
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("cubic_read", size), &size, |b, _| {
            b.iter(|| {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    *sample = interpolate::read_cubic(&table, black_box(i as f32 * 10.37));
                }
            })
        });

        // hot input so every sample takes the compression branch
        group.bench_with_input(BenchmarkId::new("soft_limit", size), &size, |b, _| {
            b.iter(|| {
                buffer.fill(1.7);
                limiter::soft_limit_buffer(black_box(&mut buffer), limiter::ENGINE_THRESHOLD);
            })
        });

        group.bench_with_input(BenchmarkId::new("window_blackman", size), &size, |b, _| {
            b.iter(|| {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    *sample = WindowShape::Blackman.value(black_box(i as f32 / size as f32));
                }
            })
        });
    }

    group.finish();
}
