//! Blog page: one bordered panel per block.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use saavy_station::blog::{BlogBlock, BlogView};

pub fn render_blog(frame: &mut Frame, area: Rect, view: Option<&BlogView>, scroll: u16) {
    let block = Block::default().title(" Blog ").borders(Borders::ALL);

    let lines = match view {
        None => vec![Line::from("Loading…")],
        Some(BlogView::Error(message)) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        ))],
        Some(BlogView::Blocks(blocks)) if blocks.is_empty() => vec![Line::from("Nothing here yet.")],
        Some(BlogView::Blocks(blocks)) => blocks.iter().flat_map(block_lines).collect(),
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn block_lines(block: &BlogBlock) -> Vec<Line<'static>> {
    let background = block
        .background
        .as_ref()
        .map(|bg| format!(" [{}]", bg.file_name()))
        .unwrap_or_default();

    let mut lines = vec![Line::from(Span::styled(
        format!("──{background}"),
        Style::default().fg(Color::DarkGray),
    ))];
    lines.extend(markdown_lines(&block.markdown));
    lines.push(Line::from(""));
    lines
}

/// Render markdown into styled terminal lines: headings, emphasis, inline
/// code, code blocks, nested lists and links (shown with their target).
fn markdown_lines(markdown: &str) -> Vec<Line<'static>> {
    let mut writer = LineWriter::default();
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        writer.event(event);
    }
    writer.finish()
}

#[derive(Default)]
struct LineWriter {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// Next number per open list; `None` for bullets.
    lists: Vec<Option<u64>>,
    links: Vec<String>,
    in_code_block: bool,
}

impl LineWriter {
    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, style: Style) {
        self.styles.push(self.style().patch(style));
    }

    fn text(&mut self, text: String) {
        let style = self.style();
        self.spans.push(Span::styled(text, style));
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    /// Close a top-level block with a blank separator line.
    fn end_block(&mut self) {
        self.flush();
        if self.lists.is_empty() {
            self.lines.push(Line::from(""));
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { .. }) => self.push_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Event::Start(Tag::Emphasis) => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Event::Start(Tag::Strong) => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Event::Start(Tag::Strikethrough) => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.in_code_block = true;
                self.push_style(Style::default().fg(Color::Yellow));
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.links.push(dest_url.to_string());
                self.push_style(
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push(start);
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        *n += 1;
                        format!("{}. ", *n - 1)
                    }
                    _ => "• ".to_string(),
                };
                self.spans.push(Span::raw(format!("{}{marker}", "  ".repeat(depth + 1))));
            }
            Event::End(TagEnd::Heading(_)) => {
                self.styles.pop();
                self.end_block();
            }
            Event::End(TagEnd::Paragraph) => self.end_block(),
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough) => {
                self.styles.pop();
            }
            Event::End(TagEnd::CodeBlock) => {
                self.styles.pop();
                self.in_code_block = false;
                self.end_block();
            }
            Event::End(TagEnd::Link) => {
                self.styles.pop();
                if let Some(url) = self.links.pop() {
                    self.spans.push(Span::styled(
                        format!(" ({url})"),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
            Event::End(TagEnd::Item) => self.flush(),
            Event::End(TagEnd::List(_)) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.end_block();
                }
            }
            Event::Text(text) if self.in_code_block => {
                for line in text.lines() {
                    self.text(format!("  {line}"));
                    self.flush();
                }
            }
            Event::Text(text) => self.text(text.into_string()),
            Event::Code(code) => {
                let style = self.style().fg(Color::Yellow);
                self.spans.push(Span::styled(code.into_string(), style));
            }
            Event::SoftBreak => self.text(" ".to_string()),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(24),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}
