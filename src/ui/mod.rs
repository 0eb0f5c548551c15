mod chat;
mod help;
pub(crate) mod settings;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Color;
use ratatui::Frame;

use crate::app::App;

pub use settings::settings_layout;

pub(crate) const ACCENT: Color = Color::Rgb(187, 154, 247);
pub(crate) const DIM: Color = Color::Rgb(100, 100, 120);
pub(crate) const BORDER: Color = Color::Rgb(60, 60, 80);

/// Width of the settings panel when it is open.
const SETTINGS_WIDTH: u16 = 46;

/// Screen regions, shared by rendering and mouse hit testing.
pub struct MainLayout {
    pub title: Rect,
    pub conversation: Rect,
    pub settings: Option<Rect>,
    pub composer: Rect,
    pub status: Rect,
}

pub fn main_layout(area: Rect, settings_open: bool) -> MainLayout {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    let (conversation, settings) = if settings_open {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(SETTINGS_WIDTH)])
            .split(outer[1]);
        (columns[0], Some(columns[1]))
    } else {
        (outer[1], None)
    };

    MainLayout {
        title: outer[0],
        conversation,
        settings,
        composer: outer[2],
        status: outer[3],
    }
}

pub fn render(f: &mut Frame, app: &App) {
    let layout = main_layout(f.area(), app.settings_open);

    chat::render_title(f, app, layout.title);
    chat::render_conversation(f, app, layout.conversation);
    if let Some(area) = layout.settings {
        settings::render_settings(f, app, area);
    }
    chat::render_composer(f, app, layout.composer);
    chat::render_status(f, app, layout.status);

    if app.show_help {
        help::render_help(f);
    }
}
