use std::time::Instant;

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Padding, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Focus, Screen};
use crate::session::{Message, Sender};
use crate::ui::{ACCENT, BORDER, DIM};

const USER_COLOR: Color = Color::Rgb(122, 162, 247);
const ASSISTANT_COLOR: Color = Color::Rgb(158, 206, 106);

pub fn render_title(f: &mut Frame, app: &App, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            " llm-playground ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} ", app.store.model()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!(" {} ", app.pipeline.endpoint()),
            Style::default().fg(DIM),
        ),
    ]);
    f.render_widget(Paragraph::new(title), area);
}

pub fn render_conversation(f: &mut Frame, app: &App, area: Rect) {
    match app.screen {
        Screen::Welcome => render_welcome(f, app, area),
        Screen::Conversation => render_messages(f, app, area),
    }
}

fn render_welcome(f: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "LLM Playground",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Chatting with {}", app.store.model()),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Type a message below and press Enter",
            Style::default().fg(DIM),
        )),
        Line::from(Span::styled(
            "Ctrl+S opens the settings panel, F1 shows all keys",
            Style::default().fg(DIM),
        )),
    ];
    let top = area.height.saturating_sub(lines.len() as u16) / 3;
    let body = Rect::new(
        area.x,
        area.y + top,
        area.width,
        area.height.saturating_sub(top),
    );
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), body);
}

fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let (name, color) = match message.sender {
        Sender::User => ("You", USER_COLOR),
        Sender::Assistant => ("Assistant", ASSISTANT_COLOR),
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(
            name.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", message.timestamp.format("%H:%M")),
            Style::default().fg(DIM),
        ),
    ])];
    lines.extend(
        message
            .content
            .lines()
            .map(|l| Line::from(Span::raw(l.to_string()))),
    );
    lines.push(Line::from(""));
    lines
}

fn typing_line(started_at: Instant, now: Instant) -> Line<'static> {
    let dots = (now.saturating_duration_since(started_at).as_millis() / 400 % 4) as usize;
    Line::from(Span::styled(
        format!("Assistant is typing{}", ".".repeat(dots)),
        Style::default()
            .fg(ASSISTANT_COLOR)
            .add_modifier(Modifier::ITALIC),
    ))
}

/// Rows `lines` take once wrapped to `width` columns.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| {
            let w: usize = line.spans.iter().map(|s| s.content.width()).sum();
            w.div_ceil(width).max(1)
        })
        .sum::<usize>()
        .min(u16::MAX as usize) as u16
}

/// Offset from the top that shows the bottom of the conversation,
/// moved up by `scroll` lines.
fn scroll_offset(total: u16, visible: u16, scroll: u16) -> u16 {
    total.saturating_sub(visible).saturating_sub(scroll)
}

fn render_messages(f: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = app
        .session
        .history()
        .iter()
        .flat_map(message_lines)
        .collect();
    if let Some(pending) = app.pipeline.pending() {
        lines.push(typing_line(pending.started_at, Instant::now()));
    }

    let block = Block::default()
        .borders(Borders::NONE)
        .padding(Padding::horizontal(1));
    let inner = block.inner(area);
    let total = wrapped_height(&lines, inner.width);
    let offset = scroll_offset(total, inner.height, app.scroll);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    f.render_widget(paragraph, area);
}

pub fn render_composer(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Composer;
    let border = if focused { ACCENT } else { BORDER };
    let title = composer_title(app.pipeline.is_busy(), app.session.is_first_message());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(title, Style::default().fg(border)));

    let mut spans = vec![Span::styled(
        app.input.clone(),
        Style::default().fg(Color::White),
    )];
    if focused {
        spans.push(Span::styled("_", Style::default().fg(ACCENT)));
    }

    // Keep the tail of long input visible.
    let inner_width = block.inner(area).width as usize;
    let input_width = app.input.width() + 1;
    let hscroll = input_width.saturating_sub(inner_width).min(u16::MAX as usize) as u16;

    f.render_widget(
        Paragraph::new(Line::from(spans))
            .block(block)
            .scroll((0, hscroll)),
        area,
    );
}

fn composer_title(busy: bool, first_message: bool) -> &'static str {
    if busy {
        " Message (waiting for reply) "
    } else if first_message {
        " Start a conversation "
    } else {
        " Message "
    }
}

pub fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(ref msg) = app.status_message {
        Line::from(Span::styled(
            format!(" {}", msg),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        let hints = match app.focus {
            Focus::Composer => " Enter send | Ctrl+S settings | Ctrl+E export | F1 help",
            Focus::Settings if app.text_edit.is_some() => {
                " Enter commit | Esc cancel | Ctrl+U clear"
            }
            Focus::Settings => {
                " \u{2191}\u{2193} focus | \u{2190}\u{2192} adjust | Enter edit | r seed | x clear | Ctrl+R reset"
            }
        };
        Line::from(Span::styled(hints, Style::default().fg(DIM)))
    };
    f.render_widget(Paragraph::new(line), area);
}
