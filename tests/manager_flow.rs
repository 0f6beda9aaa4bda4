#![cfg(feature = "rtrb")]

use std::thread;

use rtrb::RingBuffer;

use layered_synth::{
    snapshot::AlgorithmView, EngineConfig, EngineType, SynthEvent, SynthesisManager,
    SynthesisMode,
};

fn manager() -> SynthesisManager {
    SynthesisManager::new(EngineConfig::default().with_cpu_threshold(1_000.0)).unwrap()
}

#[test]
fn control_thread_drives_the_render_loop() {
    let mut manager = manager();
    let mut handle = manager.control_channel(64).unwrap();

    let control = thread::spawn(move || {
        handle.set_mode(SynthesisMode::Layering).unwrap();
        handle.set_primary_engine(EngineType::Fm).unwrap();
        for note in [48, 52, 55] {
            handle.note_on(note, 0.9).unwrap();
        }
        assert!(handle.set_parameter("masterAmplitude", 0.5).unwrap());
        assert!(!handle.set_parameter("unknownKnob", 0.5).unwrap());
    });
    control.join().unwrap();

    let out = manager.process_audio(2048);
    assert_eq!(manager.mode(), SynthesisMode::Layering);
    assert_eq!(manager.primary_engine(), EngineType::Fm);
    // wavetable stays enabled alongside fm in layering mode
    assert_eq!(manager.engine(EngineType::Wavetable).voice_count(), 3);
    assert_eq!(manager.engine(EngineType::Fm).voice_count(), 3);
    assert_eq!(manager.parameter("masterAmplitude"), Some(0.5));
    assert!(out.iter().all(|s| s.is_finite() && s.abs() < 1.95));
    assert!(out.iter().any(|s| s.abs() > 1e-3));
}

#[test]
fn events_reach_a_ring_buffer_observer() {
    let mut manager = manager();
    let (tx, mut rx) = RingBuffer::<SynthEvent>::new(32);
    manager.subscribe(Box::new(tx));

    manager.note_on(60, 1.0);
    manager.set_mode(SynthesisMode::Crossfade);
    manager.set_primary_engine(EngineType::Additive);
    manager.process_audio(44_100);
    manager.note_off(60);

    let mut events = Vec::new();
    while let Ok(event) = rx.pop() {
        events.push(event);
    }

    assert_eq!(
        events.first(),
        Some(&SynthEvent::NoteOn {
            engine: EngineType::Wavetable,
            note: 60,
            velocity: 1.0
        })
    );
    assert!(events.contains(&SynthEvent::PrimaryEngineChanged {
        from: EngineType::Wavetable,
        to: EngineType::Additive
    }));
    assert!(events.contains(&SynthEvent::CrossfadeComplete {
        engine: EngineType::Additive
    }));
    // the wavetable layer was handed off, so nothing was left to release
    assert!(!events
        .iter()
        .any(|event| matches!(event, SynthEvent::NoteOff { .. })));
}

#[test]
fn snapshot_describes_every_engine() {
    let mut manager = manager();
    manager.set_mode(SynthesisMode::Layering);
    for engine in EngineType::ALL {
        manager.set_layer_enabled(engine, true);
    }
    manager.set_parameter("grainDensity", 100.0);
    manager.note_on(57, 1.0);
    manager.process_audio(4096);

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.total_voices, 4);
    assert_eq!(snapshot.algorithm, "wavetable");

    for layer in &snapshot.layers {
        assert_eq!(layer.engine.voice_count, 1);
        match &layer.engine.view {
            AlgorithmView::Wavetable { spectrum, .. } => assert!(!spectrum.is_empty()),
            AlgorithmView::Fm { operator_levels, .. } => {
                assert!(operator_levels.iter().any(|level| *level != 0.0))
            }
            AlgorithmView::Granular { grains, .. } => assert!(!grains.is_empty()),
            AlgorithmView::Additive { template, .. } => assert_eq!(*template, "sawtooth"),
        }
    }
    assert!(snapshot.output.rms > 0.0);
    assert!(snapshot.output.dominant_frequency > 0.0);
}

#[test]
fn invalid_input_never_panics() {
    let mut manager = manager();
    manager.note_on(255, 7.0);
    manager.note_on(60, f32::NAN);
    manager.note_off(12);
    manager.set_parameter("attack", f64::NAN);
    manager.set_parameter("release", -3.0);
    manager.set_layer_amplitude(EngineType::Fm, f32::INFINITY);
    manager.set_layer_pan(EngineType::Fm, -9.0);
    manager.set_sample_rate(0.0);
    manager.set_buffer_size(0);
    manager.process_midi(0xF0, 0x7F, 0x7F);

    let out = manager.process_audio(5000);
    assert!(out.iter().all(|s| s.is_finite()));
    assert_eq!(manager.config().sample_rate, 44_100.0);
    assert_eq!(manager.config().buffer_size, 512);
}
