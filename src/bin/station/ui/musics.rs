//! Play station: session status and the spectrum bars.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};
use saavy_station::{BarStyle, SessionState};

use crate::app::App;

/// Bar heights are fractional; the chart wants integers.
const HEIGHT_RESOLUTION: f32 = 10.0;

pub fn render_musics(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(4)])
        .split(area);

    render_status(frame, chunks[0], app);
    render_bars(frame, chunks[1], &app.bars, app.policy.max_height());
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let session = &app.session;
    let state = session.state();
    let (symbol, color) = match state {
        SessionState::Playing => ("▶", Color::Green),
        SessionState::Starting => ("…", Color::Yellow),
        SessionState::Stopping | SessionState::Idle => ("■", Color::DarkGray),
    };

    let track = session
        .current_track()
        .map(|t| t.file_name().to_string())
        .unwrap_or_else(|| "-".into());
    let position = session
        .media()
        .map(|m| format!("{:.1}s / {:.1}s", m.position_seconds(), m.duration_seconds()))
        .unwrap_or_default();

    let first = Line::from(vec![
        Span::styled(format!(" {symbol} {state}  "), Style::default().fg(color)),
        Span::styled(format!("{track}  "), Style::default().fg(Color::White)),
        Span::styled(position, Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("  {} tracks", session.catalog_len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let chain = session.current_chain().unwrap_or_default();
    let second = Line::from(Span::styled(
        format!(" {chain}"),
        Style::default().fg(Color::Magenta),
    ));

    let paragraph = Paragraph::new(vec![first, second])
        .block(Block::default().title(" Play Station ").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// Opacity mapped onto brightness, since terminals have no alpha.
fn bar_color(opacity: f32) -> Color {
    let level = (opacity.clamp(0.0, 1.0) * 255.0) as u8;
    Color::Rgb(level / 3, level, level)
}

fn render_bars(frame: &mut Frame, area: Rect, bars: &[BarStyle], max_height: f32) {
    let chart_bars: Vec<Bar> = bars
        .iter()
        .map(|style| {
            Bar::default()
                .value((style.height * HEIGHT_RESOLUTION) as u64)
                .text_value(String::new())
                .style(Style::default().fg(bar_color(style.opacity)))
        })
        .collect();

    let inner_width = area.width.saturating_sub(2);
    let count = bars.len().max(1) as u16;
    let bar_width = (inner_width / count).saturating_sub(1).max(1);

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL))
        .data(BarGroup::default().bars(&chart_bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .max((max_height * HEIGHT_RESOLUTION) as u64);
    frame.render_widget(chart, area);
}
