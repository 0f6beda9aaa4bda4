//! Layer table: mix state, voices and CPU for every engine

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Row, Table},
    Frame,
};

use layered_synth::SynthSnapshot;

pub fn render_layers(frame: &mut Frame, area: Rect, snapshot: &SynthSnapshot) {
    let header = Row::new(["Engine", "On", "Amp", "Pan", "M/S", "Voices", "CPU"])
        .style(Style::default().fg(Color::DarkGray));

    let rows = snapshot.layers.iter().map(|layer| {
        let engine = &layer.engine;
        let flags = match (layer.muted, layer.solo) {
            (true, true) => "M S",
            (true, false) => "M",
            (false, true) => "S",
            (false, false) => "",
        };
        let mut style = Style::default().fg(if layer.enabled {
            Color::White
        } else {
            Color::DarkGray
        });
        if engine.engine == snapshot.primary {
            style = style.add_modifier(Modifier::BOLD);
        }

        Row::new(vec![
            engine.engine.to_string(),
            if layer.enabled { "on" } else { "-" }.to_string(),
            format!("{:.2}", layer.amplitude),
            format!("{:+.2}", layer.pan),
            flags.to_string(),
            format!("{}/{}", engine.voice_count, engine.max_voices),
            format!("{:.1}%", engine.cpu_usage * 100.0),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(10),
        Constraint::Length(4),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(5),
        Constraint::Length(8),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(" Layers ").borders(Borders::ALL));
    frame.render_widget(table, area);
}
