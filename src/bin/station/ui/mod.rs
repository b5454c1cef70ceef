//! TUI for station
//!
//! Page tabs on top, the active page in the middle, key help at the bottom.

mod blog;
mod musics;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};
use saavy_station::site::Page;

use crate::app::App;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(8),    // Page
            Constraint::Length(1), // Help bar
        ])
        .split(frame.area());

    render_tabs(frame, chunks[0], app.nav.active());

    match app.nav.active() {
        Page::Top => render_top(frame, chunks[1]),
        Page::Musics => musics::render_musics(frame, chunks[1], app),
        Page::Blog => blog::render_blog(frame, chunks[1], app.blog_view.as_ref(), app.blog_scroll),
    }

    let trigger = if app.hold_to_play {
        "[Space] Hold to play"
    } else {
        "[Space] Play/Stop"
    };
    let help = Paragraph::new(format!(
        " [Q] Quit  [1-3/Tab] Pages  {trigger}  [↑↓] Scroll blog"
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[2]);
}

fn render_tabs(frame: &mut Frame, area: Rect, active: Page) {
    let titles = Page::ALL.iter().map(|page| match page {
        Page::Top => "Top",
        Page::Musics => "Musics",
        Page::Blog => "Blog",
    });
    let tabs = Tabs::new(titles)
        .block(Block::default().title(" saavy station ").borders(Borders::ALL))
        .select(active.index())
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_top(frame: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "saavy station",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Every play picks a random track and a random effects chain."),
        Line::from("Head to Musics and hold the trigger."),
    ];
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}
