//! Benchmarks for each synthesis engine with a chord held.
//!
//! Voices are started once and left sounding; the voice lifetime is long
//! enough that none are pruned while criterion iterates.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use layered_synth::{engine, EngineConfig, EngineType};

use crate::BLOCK_SIZES;

const CHORD: [u8; 6] = [48, 55, 60, 64, 67, 72];

pub fn bench_engines(c: &mut Criterion) {
    let mut config = EngineConfig::default();
    config.max_voice_lifetime = 1.0e6;

    for kind in EngineType::ALL {
        let mut group = c.benchmark_group(format!("engines/{kind}"));

        for &size in BLOCK_SIZES {
            let mut buffer = vec![0.0f32; size];
            let mut synth = engine::build(kind, &config);
            for note in CHORD {
                synth.note_on(note, 0.8);
            }

            group.bench_with_input(BenchmarkId::new("chord", size), &size, |b, _| {
                b.iter(|| {
                    synth.process_into(black_box(&mut buffer));
                })
            });
        }

        group.finish();
    }
}
