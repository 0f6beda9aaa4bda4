//! TUI module for layered
//!
//! Keyboard-driven note entry plus live views of the layers, the primary
//! engine's internals and the output.

mod engine_view;
mod layers;
mod waveform;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use layered_synth::{
    analysis::{OutputAnalyzer, ANALYSIS_SIZE},
    EngineType, SynthEvent, SynthHandle, SynthSnapshot, SynthesisManager, SynthesisMode,
};

use engine_view::render_engine_view;
use layers::render_layers;
use waveform::render_waveform;

/// Audio visualization buffer size
const VIS_BUFFER_SIZE: usize = 1024;

/// Diagnostic lines kept on screen
const EVENT_LINES: usize = 6;

/// Terminals report key presses only, so notes are released after this long
const NOTE_LENGTH: Duration = Duration::from_millis(400);

/// One octave of white and black keys, home row and the row above
const PIANO_KEYS: [(char, u8); 13] = [
    ('a', 0),
    ('w', 1),
    ('s', 2),
    ('e', 3),
    ('d', 4),
    ('f', 5),
    ('t', 6),
    ('g', 7),
    ('y', 8),
    ('h', 9),
    ('u', 10),
    ('j', 11),
    ('k', 12),
];

pub struct UiApp {
    manager: Arc<Mutex<SynthesisManager>>,
    handle: SynthHandle,
    event_rx: Consumer<SynthEvent>,
    scope_rx: Consumer<f32>,
    scope: Vec<f32>,
    events: VecDeque<String>,
    snapshot: Option<SynthSnapshot>,
    analyzer: OutputAnalyzer,
    held: Vec<(u8, Instant)>,
    base_note: u8,
    master: f64,
    sample_rate: f32,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        manager: Arc<Mutex<SynthesisManager>>,
        handle: SynthHandle,
        event_rx: Consumer<SynthEvent>,
        scope_rx: Consumer<f32>,
        sample_rate: f32,
    ) -> Self {
        Self {
            manager,
            handle,
            event_rx,
            scope_rx,
            scope: vec![0.0; VIS_BUFFER_SIZE],
            events: VecDeque::with_capacity(EVENT_LINES),
            snapshot: None,
            analyzer: OutputAnalyzer::new(ANALYSIS_SIZE),
            held: Vec::new(),
            base_note: 60,
            master: 0.75,
            sample_rate,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_scope();
            self.poll_events();
            self.release_expired();
            self.refresh_snapshot();

            terminal.draw(|frame| self.render(frame))?;

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        let _ = self.handle.all_notes_off();
        Ok(())
    }

    /// Keep the last VIS_BUFFER_SIZE output samples
    fn poll_scope(&mut self) {
        while let Ok(sample) = self.scope_rx.pop() {
            self.scope.push(sample);
        }
        if self.scope.len() > VIS_BUFFER_SIZE {
            let excess = self.scope.len() - VIS_BUFFER_SIZE;
            self.scope.drain(0..excess);
        }
    }

    fn poll_events(&mut self) {
        while let Ok(event) = self.event_rx.pop() {
            let line = match event {
                // per-note traffic is too busy to read
                SynthEvent::NoteOn { .. } | SynthEvent::NoteOff { .. } => continue,
                SynthEvent::VoiceStolen { engine, note } => {
                    format!("{engine}: stole voice playing note {note}")
                }
                SynthEvent::Overload {
                    engine,
                    cpu_usage,
                    voice_count,
                } => format!(
                    "overload ({:.0}% cpu, {voice_count} voices): reset {engine}",
                    cpu_usage * 100.0
                ),
                SynthEvent::PrimaryEngineChanged { from, to } => format!("primary {from} -> {to}"),
                SynthEvent::CrossfadeComplete { engine } => format!("crossfade to {engine} complete"),
            };
            self.log(line);
        }
    }

    fn log(&mut self, line: String) {
        if self.events.len() == EVENT_LINES {
            self.events.pop_front();
        }
        self.events.push_back(line);
    }

    fn release_expired(&mut self) {
        let now = Instant::now();
        let mut i = 0;
        while i < self.held.len() {
            let (note, pressed) = self.held[i];
            if now.duration_since(pressed) >= NOTE_LENGTH {
                self.held.swap_remove(i);
                if let Err(err) = self.handle.note_off(note) {
                    self.log(err.to_string());
                }
            } else {
                i += 1;
            }
        }
    }

    /// Copy state out under the lock, then run the FFT after releasing it so
    /// the audio callback never waits on analysis.
    fn refresh_snapshot(&mut self) {
        let taken = match self.manager.lock() {
            Ok(manager) => Some((manager.mix_snapshot(), manager.output_history().to_vec())),
            Err(_) => None,
        };
        if let Some((mut snapshot, history)) = taken {
            snapshot.output = self.analyzer.analyze(&history, self.sample_rate);
            self.snapshot = Some(snapshot);
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        let result = match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                Ok(())
            }
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                self.handle.set_primary_engine(EngineType::ALL[index])
            }
            KeyCode::Char('m') => {
                let next = match self.snapshot.as_ref().map(|s| s.mode) {
                    Some(SynthesisMode::Single) => SynthesisMode::Crossfade,
                    Some(SynthesisMode::Crossfade) => SynthesisMode::Layering,
                    _ => SynthesisMode::Single,
                };
                self.handle.set_mode(next)
            }
            KeyCode::Char('z') => {
                self.base_note = self.base_note.saturating_sub(12).max(24);
                Ok(())
            }
            KeyCode::Char('x') => {
                self.base_note = (self.base_note + 12).min(96);
                Ok(())
            }
            KeyCode::Char('-') | KeyCode::Char('+') | KeyCode::Char('=') => {
                let step = if key == KeyCode::Char('-') { -0.05 } else { 0.05 };
                self.master = (self.master + step).clamp(0.0, 1.0);
                self.handle
                    .set_parameter("masterAmplitude", self.master)
                    .map(|_| ())
            }
            KeyCode::Char(' ') => {
                self.held.clear();
                self.handle.all_notes_off()
            }
            KeyCode::Char(c) => match PIANO_KEYS.iter().find(|(k, _)| *k == c) {
                Some(&(_, offset)) => {
                    let note = self.base_note + offset;
                    self.held.push((note, Instant::now()));
                    self.handle.note_on(note, 0.8)
                }
                None => Ok(()),
            },
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.log(err.to_string());
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Length(6), // Layers
                Constraint::Min(8),    // Engine view
                Constraint::Length(8), // Waveform
                Constraint::Length(EVENT_LINES as u16 + 2),
                Constraint::Length(1), // Help bar
            ])
            .split(area);

        self.render_status(frame, chunks[0]);

        if let Some(snapshot) = &self.snapshot {
            render_layers(frame, chunks[1], snapshot);
            if let Some(layer) = snapshot.layer(snapshot.primary) {
                render_engine_view(frame, chunks[2], &layer.engine);
            }
        }

        render_waveform(frame, chunks[3], &self.scope);

        let lines: Vec<Line> = self.events.iter().map(|e| Line::from(e.as_str())).collect();
        let events = Paragraph::new(lines).block(Block::default().title(" Events ").borders(Borders::ALL));
        frame.render_widget(events, chunks[4]);

        let help = Paragraph::new(
            " [A-K] Play  [Z/X] Octave  [1-4] Engine  [M] Mode  [-/+] Volume  [Space] Panic  [Q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[5]);
    }

    fn render_status(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let block = Block::default().title(" layered ").borders(Borders::ALL);

        let mut spans = vec![Span::styled(
            format!(" {:.1}kHz  ", self.sample_rate / 1000.0),
            Style::default().fg(Color::DarkGray),
        )];
        if let Some(snapshot) = &self.snapshot {
            spans.push(Span::styled(
                format!("Engine: {}  ", snapshot.algorithm),
                Style::default().fg(Color::Cyan),
            ));
            spans.push(Span::styled(
                format!("Mode: {:?}  ", snapshot.mode),
                Style::default().fg(Color::White),
            ));
            if let Some((target, progress)) = snapshot.crossfade {
                spans.push(Span::styled(
                    format!("-> {target} {:.0}%  ", progress * 100.0),
                    Style::default().fg(Color::Yellow),
                ));
            }
            spans.push(Span::styled(
                format!(
                    "Voices: {}  CPU: {:.1}%  ",
                    snapshot.total_voices,
                    snapshot.total_cpu * 100.0
                ),
                Style::default().fg(Color::Green),
            ));
            let out = &snapshot.output;
            spans.push(Span::styled(
                format!(
                    "Peak: {:.2}  RMS: {:.2}  {:.0}Hz",
                    out.peak, out.rms, out.dominant_frequency
                ),
                Style::default().fg(Color::Magenta),
            ));
        }
        spans.push(Span::styled(
            format!("  Octave: C{}", self.base_note / 12 - 1),
            Style::default().fg(Color::DarkGray),
        ));

        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }
}
