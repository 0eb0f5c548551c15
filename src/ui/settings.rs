use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{App, Focus, SettingsRow};
use crate::color::SliderPaint;
use crate::settings::provider_for;
use crate::slider::{ChannelId, SliderChannel};
use crate::ui::{ACCENT, BORDER, DIM};

/// Rows of the settings panel and the slider tracks inside them.
pub struct SettingsLayout {
    pub rows: Vec<(SettingsRow, Rect)>,
    pub tracks: Vec<(ChannelId, Rect)>,
}

fn panel_block() -> Block<'static> {
    Block::default()
        .borders(Borders::LEFT)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Settings ", Style::default().fg(ACCENT)))
}

/// Every row takes two lines: a label line and a value (or track) line.
pub fn settings_layout(area: Rect) -> SettingsLayout {
    let inner = panel_block().inner(area);
    let mut rows = Vec::new();
    let mut tracks = Vec::new();
    let mut y = inner.y;

    for row in SettingsRow::all() {
        if y + 2 > inner.y + inner.height {
            break;
        }
        let rect = Rect::new(inner.x, y, inner.width, 2);
        rows.push((row, rect));
        if let SettingsRow::Slider(id) = row {
            let track = Rect::new(inner.x + 2, y + 1, inner.width.saturating_sub(4), 1);
            tracks.push((id, track));
        }
        y += 2;
    }

    SettingsLayout { rows, tracks }
}

pub fn render_settings(f: &mut Frame, app: &App, area: Rect) {
    f.render_widget(panel_block(), area);
    let layout = settings_layout(area);
    let selected = app.selected_row();

    for (row, rect) in &layout.rows {
        let is_selected = app.focus == Focus::Settings && *row == selected;
        render_label(f, app, *row, *rect, is_selected);

        let value_area = Rect::new(rect.x, rect.y + 1, rect.width, 1);
        match row {
            SettingsRow::Slider(id) => {
                if let Some((_, track)) = layout.tracks.iter().find(|(t, _)| t == id) {
                    render_track(f, app.engine.channel(*id), *track);
                }
            }
            _ => render_text_value(f, app, *row, value_area),
        }
    }
}

fn render_label(f: &mut Frame, app: &App, row: SettingsRow, rect: Rect, selected: bool) {
    let indicator = if selected { ">" } else { " " };
    let label_style = if selected {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let mut spans = vec![
        Span::styled(format!("{} ", indicator), Style::default().fg(ACCENT)),
        Span::styled(row.label(), label_style),
    ];

    // Slider value text is read straight from the channel so it never lags.
    if let SettingsRow::Slider(id) = row {
        let ch = app.engine.channel(id);
        let text = ch.value_label();
        let pad = (rect.width as usize).saturating_sub(2 + row.label().len() + text.len() + 1);
        spans.push(Span::raw(" ".repeat(pad)));
        spans.push(Span::styled(
            text,
            Style::default().fg(ch.paint().active.to_ratatui_color()),
        ));
    }

    f.render_widget(
        Paragraph::new(Line::from(spans)),
        Rect::new(rect.x, rect.y, rect.width, 1),
    );
}

fn render_text_value(f: &mut Frame, app: &App, row: SettingsRow, area: Rect) {
    let settings = app.store.settings();
    let editing = app
        .text_edit
        .as_ref()
        .filter(|_| app.focus == Focus::Settings && row == app.selected_row());

    let line = if let Some(edit) = editing {
        Line::from(vec![
            Span::raw("  "),
            Span::styled(edit.buffer.clone(), Style::default().fg(Color::White)),
            Span::styled("_", Style::default().fg(ACCENT)),
        ])
    } else {
        let (text, placeholder) = match row {
            SettingsRow::Model => (model_label(&settings.model), false),
            SettingsRow::Seed => match settings.seed {
                Some(seed) => (seed.to_string(), false),
                None => ("random (r to roll)".to_string(), true),
            },
            SettingsRow::StopSequence if settings.stop_sequence.is_empty() => {
                ("none".to_string(), true)
            }
            SettingsRow::StopSequence => (settings.stop_sequence.clone(), false),
            SettingsRow::SystemPrompt if settings.system_prompt.is_empty() => {
                ("none".to_string(), true)
            }
            SettingsRow::SystemPrompt => (single_line(&settings.system_prompt), false),
            SettingsRow::Slider(_) => (String::new(), true),
        };
        let style = if placeholder {
            Style::default().fg(DIM)
        } else {
            Style::default().fg(Color::White)
        };
        Line::from(vec![Span::raw("  "), Span::styled(text, style)])
    };

    f.render_widget(Paragraph::new(line), area);
}

/// Model id between cycle arrows, followed by the catalogue provider.
fn model_label(model: &str) -> String {
    let provider = provider_for(model).unwrap_or("custom");
    format!("\u{2039} {} \u{203a}  {}", model, provider)
}

fn single_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().to_string()
}

/// Paint a track cell by cell: active color up to the value, the neutral
/// track color after it, and the thumb with its glow behind it.
fn render_track(f: &mut Frame, channel: &SliderChannel, area: Rect) {
    let width = area.width as usize;
    if width == 0 {
        return;
    }
    let paint = channel.paint();
    let thumb = thumb_cell(paint, width);

    let spans: Vec<Span> = (0..width)
        .map(|i| {
            if i == thumb {
                Span::styled(
                    "\u{25cf}",
                    Style::default()
                        .fg(paint.thumb.to_ratatui_color())
                        .bg(paint.thumb_glow.to_ratatui_color()),
                )
            } else {
                let position = (i as f64 + 0.5) / width as f64 * 100.0;
                Span::styled(
                    "\u{2501}",
                    Style::default().fg(paint.color_at(position).to_ratatui_color()),
                )
            }
        })
        .collect();

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn thumb_cell(paint: &SliderPaint, width: usize) -> usize {
    let last = width.saturating_sub(1);
    ((paint.percentage / 100.0 * last as f64).round() as usize).min(last)
}
