use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::ui::{ACCENT, DIM};

pub fn render_help(f: &mut Frame) {
    let area = f.area();
    let width = area.width.saturating_sub(6).clamp(40, 80);
    let height = area.height.saturating_sub(4).clamp(12, 24);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let popup = Rect::new(x, y, width, height).intersection(area);

    f.render_widget(Clear, popup);

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "Commands",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Global", Style::default().fg(ACCENT))),
        Line::from("  F1: toggle help  |  Ctrl+C: quit  |  Ctrl+S/F2: settings"),
        Line::from("  Ctrl+R: reset settings  |  Ctrl+E: export conversation"),
        Line::from(""),
        Line::from(Span::styled("Composer", Style::default().fg(ACCENT))),
        Line::from("  Enter: send  |  PgUp/PgDn: scroll  |  Esc: quit"),
        Line::from(""),
        Line::from(Span::styled("Settings", Style::default().fg(ACCENT))),
        Line::from("  Up/Down: focus  |  Left/Right: adjust  |  Shift: x10"),
        Line::from("  Enter: edit text  |  r: random seed  |  x: clear value"),
        Line::from("  editing: Enter commit, Esc cancel, Ctrl+U clear"),
        Line::from("  mouse: click or drag a track"),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to close",
            Style::default().fg(DIM),
        )),
    ];

    let max_body_lines = popup.height.saturating_sub(2) as usize;
    if lines.len() > max_body_lines {
        lines.truncate(max_body_lines);
    }

    let block = Block::default()
        .title(Span::styled(" Help ", Style::default().fg(ACCENT)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block);
    f.render_widget(paragraph, popup);
}
