//! Audio setup and the glue between the audio callback and the UI

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;
use std::sync::{Arc, Mutex};

use layered_synth::{EngineConfig, SynthEvent, SynthesisManager, MAX_BLOCK_SIZE};

use crate::ui::UiApp;

/// Queued note and parameter changes between UI frames
const CONTROL_CAPACITY: usize = 256;
/// Diagnostics waiting to be shown
const EVENT_CAPACITY: usize = 256;
/// Output samples buffered for the oscilloscope
const SCOPE_CAPACITY: usize = 8192;

pub fn run() -> EyreResult<()> {
    // Set up audio
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    let mut manager = SynthesisManager::new(EngineConfig::default().with_sample_rate(sample_rate))
        .wrap_err("failed to build synthesis manager")?;

    let handle = manager
        .control_channel(CONTROL_CAPACITY)
        .wrap_err("failed to open control channel")?;
    let (event_tx, event_rx) = RingBuffer::<SynthEvent>::new(EVENT_CAPACITY);
    manager.subscribe(Box::new(event_tx));
    let (mut scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_CAPACITY);

    // Shared with the UI for snapshots only; notes travel through `handle`
    let manager = Arc::new(Mutex::new(manager));
    let audio_manager = Arc::clone(&manager);
    let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            // never wait for the UI thread; a missed lock plays one block of silence
            let Ok(mut manager) = audio_manager.try_lock() else {
                data.fill(0.0);
                return;
            };
            let total_frames = data.len() / channels;
            let mut frames_written = 0;

            while frames_written < total_frames {
                let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                let block = &mut render_buf[..frames_to_render];
                manager.process_into(block);

                // Copy to output (mono to all channels)
                let out_off = frames_written * channels;
                for (i, &s) in block.iter().enumerate() {
                    for ch in 0..channels {
                        data[out_off + i * channels + ch] = s;
                    }
                    // the scope skips samples when the UI falls behind
                    let _ = scope_tx.push(s);
                }

                frames_written += frames_to_render;
            }
        },
        |err| eprintln!("Audio error: {}", err),
        None,
    )?;

    stream.play()?;

    let mut terminal = ratatui::init();
    let result = UiApp::new(manager, handle, event_rx, scope_rx, sample_rate).run(&mut terminal);
    ratatui::restore();
    result
}
