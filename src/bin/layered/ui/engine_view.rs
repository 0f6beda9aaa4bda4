//! Engine introspection: spectra, operator levels and grain clouds

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::Line,
    widgets::{Axis, BarChart, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use layered_synth::snapshot::{AlgorithmView, EngineSnapshot};

pub fn render_engine_view(frame: &mut Frame, area: Rect, engine: &EngineSnapshot) {
    match &engine.view {
        AlgorithmView::Wavetable {
            table,
            category,
            spectrum,
        } => {
            let title = format!(" Wavetable: {table} ({category:?}) ");
            render_spectrum(frame, area, &title, spectrum);
        }
        AlgorithmView::Additive { template, spectrum } => {
            let title = format!(" Additive: {template} ");
            render_spectrum(frame, area, &title, spectrum);
        }
        AlgorithmView::Fm {
            algorithm,
            operator_levels,
        } => {
            let labels = ["op1", "op2", "op3", "op4", "op5", "op6"];
            let data: Vec<(&str, u64)> = labels
                .iter()
                .zip(operator_levels.iter())
                .map(|(label, level)| (*label, (level.abs().min(1.0) * 100.0) as u64))
                .collect();

            let chart = BarChart::default()
                .block(
                    Block::default()
                        .title(format!(" FM: {algorithm} "))
                        .borders(Borders::ALL),
                )
                .data(data.as_slice())
                .max(100)
                .bar_width(5)
                .bar_gap(2)
                .bar_style(Style::default().fg(Color::Yellow));
            frame.render_widget(chart, area);
        }
        AlgorithmView::Granular {
            source,
            window,
            grains,
        } => {
            let block = Block::default()
                .title(format!(
                    " Granular: {source} / {} - {} grains ",
                    window.name(),
                    grains.len()
                ))
                .borders(Borders::ALL);

            // each grain as a point: x = progress, y = pan
            let points: Vec<(f64, f64)> = grains
                .iter()
                .map(|grain| (grain.progress as f64, grain.pan as f64))
                .collect();
            if points.is_empty() {
                frame.render_widget(Paragraph::new(Line::from(" silent")).block(block), area);
                return;
            }

            let dataset = Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(Color::Magenta))
                .data(&points);
            let chart = Chart::new(vec![dataset])
                .block(block)
                .x_axis(Axis::default().bounds([0.0, 1.0]))
                .y_axis(Axis::default().bounds([-1.0, 1.0]));
            frame.render_widget(chart, area);
        }
    }
}

fn render_spectrum(frame: &mut Frame, area: Rect, title: &str, spectrum: &[f32]) {
    // harmonic number against normalised level
    let data: Vec<(f64, f64)> = spectrum
        .iter()
        .enumerate()
        .map(|(i, &level)| ((i + 1) as f64, level as f64))
        .collect();

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Bar)
        .style(Style::default().fg(Color::Green))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([0.0, spectrum.len().max(1) as f64 + 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(chart, area);
}
