//! Benchmarks for complete manager mixes.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use layered_synth::{EngineConfig, EngineType, SynthesisManager, SynthesisMode};

use crate::BLOCK_SIZES;

const CHORD: [u8; 4] = [57, 60, 64, 67];

fn manager(mode: SynthesisMode) -> SynthesisManager {
    let mut config = EngineConfig::default();
    config.max_voice_lifetime = 1.0e6;
    // overload mitigation would reset voices mid-benchmark
    config.cpu_threshold = 1.0e6;

    let mut manager = SynthesisManager::new(config).expect("valid config");
    manager.set_mode(mode);
    manager
}

pub fn bench_manager(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/manager");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === SINGLE ENGINE ===
        let mut single = manager(SynthesisMode::Single);
        for note in CHORD {
            single.note_on(note, 0.8);
        }
        group.bench_with_input(BenchmarkId::new("single", size), &size, |b, _| {
            b.iter(|| single.process_into(black_box(&mut buffer)))
        });

        // === CROSSFADE ===
        // a very long fade keeps both layers sounding for the whole run
        let mut fading = manager(SynthesisMode::Crossfade);
        fading.set_parameter("crossfadeTime", 10.0);
        for note in CHORD {
            fading.note_on(note, 0.8);
        }
        fading.set_primary_engine(EngineType::Fm);
        for note in CHORD {
            fading.note_on(note, 0.8);
        }
        group.bench_with_input(BenchmarkId::new("crossfade", size), &size, |b, _| {
            b.iter(|| fading.process_into(black_box(&mut buffer)))
        });

        // === ALL LAYERS ===
        let mut layered = manager(SynthesisMode::Layering);
        for engine in EngineType::ALL {
            layered.set_layer_enabled(engine, true);
            layered.set_layer_amplitude(engine, 0.5);
        }
        for note in CHORD {
            layered.note_on(note, 0.8);
        }
        group.bench_with_input(BenchmarkId::new("all_layers", size), &size, |b, _| {
            b.iter(|| layered.process_into(black_box(&mut buffer)))
        });
    }

    group.finish();
}
