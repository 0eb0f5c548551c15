use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::layout::Rect;

use crate::backend::ChatBackend;
use crate::config::AppConfig;
use crate::export;
use crate::pipeline::{MessagePipeline, Submit};
use crate::session::ConversationSession;
use crate::settings::{SettingField, SettingsStore};
use crate::slider::{ChannelId, SliderEngine, TrackBounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Before the first message is sent.
    Welcome,
    Conversation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Composer,
    Settings,
}

/// One row of the settings panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    Model,
    Slider(ChannelId),
    Seed,
    StopSequence,
    SystemPrompt,
}

impl SettingsRow {
    pub fn all() -> Vec<SettingsRow> {
        let mut rows = vec![SettingsRow::Model];
        rows.extend(ChannelId::ALL.iter().map(|id| SettingsRow::Slider(*id)));
        rows.extend([
            SettingsRow::Seed,
            SettingsRow::StopSequence,
            SettingsRow::SystemPrompt,
        ]);
        rows
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingsRow::Model => SettingField::Model.label(),
            SettingsRow::Slider(id) => id.field().label(),
            SettingsRow::Seed => SettingField::Seed.label(),
            SettingsRow::StopSequence => SettingField::StopSequence.label(),
            SettingsRow::SystemPrompt => SettingField::SystemPrompt.label(),
        }
    }

    fn text_field(self) -> Option<SettingField> {
        match self {
            SettingsRow::Seed => Some(SettingField::Seed),
            SettingsRow::StopSequence => Some(SettingField::StopSequence),
            SettingsRow::SystemPrompt => Some(SettingField::SystemPrompt),
            _ => None,
        }
    }
}

/// In-progress edit of a text-valued setting.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEdit {
    pub field: SettingField,
    pub buffer: String,
}

/// Pointer x at the center of a terminal cell.
fn cell_center(column: u16) -> f64 {
    column as f64 + 0.5
}

fn track_bounds(rect: Rect) -> TrackBounds {
    TrackBounds {
        left: rect.x as f64,
        width: rect.width as f64,
    }
}

pub struct App {
    pub screen: Screen,
    pub focus: Focus,
    pub settings_open: bool,
    pub settings_cursor: usize,
    pub text_edit: Option<TextEdit>,
    pub show_help: bool,
    pub store: SettingsStore,
    pub engine: SliderEngine,
    pub session: ConversationSession,
    pub pipeline: MessagePipeline,
    pub input: String,
    /// Lines scrolled up from the bottom of the conversation.
    pub scroll: u16,
    pub status_message: Option<String>,
    pub should_quit: bool,
    pub config: AppConfig,
    /// Channel being dragged and the track it started on.
    drag: Option<(ChannelId, Rect)>,
}

impl App {
    pub fn new(config: AppConfig, backend: Arc<dyn ChatBackend>) -> Self {
        let store = SettingsStore::new(config.default_model.clone());
        let engine = SliderEngine::new(config.engine_config(), &store);
        Self {
            screen: Screen::Welcome,
            focus: Focus::Composer,
            settings_open: false,
            settings_cursor: 0,
            text_edit: None,
            show_help: false,
            store,
            engine,
            session: ConversationSession::new(),
            pipeline: MessagePipeline::new(backend),
            input: String::new(),
            scroll: 0,
            status_message: None,
            should_quit: false,
            config,
            drag: None,
        }
    }

    // -----------------------------------------------------------------------
    // Conversation
    // -----------------------------------------------------------------------

    pub fn submit_input(&mut self) {
        match self.pipeline.submit(&self.input, &self.store, &mut self.session) {
            Submit::Ignored => {}
            Submit::Busy => {
                self.status_message = Some("Still waiting for the previous response".into());
            }
            Submit::Dispatched { first_message, .. } => {
                self.input.clear();
                self.scroll = 0;
                if first_message {
                    self.enter_conversation();
                }
            }
        }
    }

    fn enter_conversation(&mut self) {
        self.screen = Screen::Conversation;
        tracing::info!("conversation started");
    }

    /// Drain background work: exchange results and slider timers.
    pub fn poll_background(&mut self, now: Instant) {
        if let Some(resolution) = self.pipeline.poll(&mut self.session) {
            if let Some(kind) = resolution.outcome.error_kind() {
                self.status_message = Some(kind.label().to_string());
            }
            self.scroll = 0;
        }
        self.engine.tick(now);
    }

    /// Upper bound on how long the event loop may sleep.
    pub fn poll_timeout(&self, now: Instant, idle: Duration) -> Duration {
        self.engine
            .next_wakeup(now)
            .map(|d| d.min(idle))
            .unwrap_or(idle)
    }

    pub fn export_conversation(&mut self) -> Option<PathBuf> {
        if self.session.is_empty() {
            self.status_message = Some("Nothing to export yet".into());
            return None;
        }
        let dir = self.config.export_dir();
        match export::export_conversation(
            &self.session.snapshot(),
            self.store.settings(),
            &dir,
            chrono::Utc::now(),
        ) {
            Ok(path) => {
                self.status_message = Some(format!("Exported to {}", path.display()));
                Some(path)
            }
            Err(e) => {
                tracing::error!(error = %e, "export failed");
                self.status_message = Some(format!("Export failed: {}", e));
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Settings panel
    // -----------------------------------------------------------------------

    pub fn toggle_settings(&mut self) {
        self.settings_open = !self.settings_open;
        self.focus = if self.settings_open {
            Focus::Settings
        } else {
            Focus::Composer
        };
        self.text_edit = None;
    }

    pub fn selected_row(&self) -> SettingsRow {
        let rows = SettingsRow::all();
        rows[self.settings_cursor.min(rows.len() - 1)]
    }

    pub fn select_next_row(&mut self) {
        self.settings_cursor = (self.settings_cursor + 1).min(SettingsRow::all().len() - 1);
    }

    pub fn select_prev_row(&mut self) {
        self.settings_cursor = self.settings_cursor.saturating_sub(1);
    }

    /// Left/Right on the selected row.
    pub fn adjust_selected(&mut self, steps: i32, now: Instant) {
        match self.selected_row() {
            SettingsRow::Model => {
                let model = self.store.cycle_model(steps > 0).to_string();
                self.status_message = Some(format!("Model: {}", model));
            }
            SettingsRow::Slider(id) => {
                self.engine.step(id, steps, &mut self.store, now);
            }
            SettingsRow::Seed => {
                let current = self.store.settings().seed.unwrap_or(0) as f64;
                self.store
                    .set_number(SettingField::Seed, current + steps as f64);
            }
            SettingsRow::StopSequence | SettingsRow::SystemPrompt => {}
        }
    }

    pub fn reset_settings(&mut self) {
        self.store.reset();
        self.engine.sync_from_store(&self.store);
        // A release after reset must not land as a click.
        self.drag = None;
        self.text_edit = None;
        self.status_message = Some("Settings reset to defaults".into());
    }

    pub fn randomize_seed(&mut self) {
        let seed = self.store.randomize_seed();
        self.status_message = Some(format!("Seed: {}", seed));
    }

    /// Clear the selected row's value, if it has one that clears.
    pub fn clear_selected(&mut self) {
        match self.selected_row() {
            SettingsRow::Seed => self.store.clear_seed(),
            SettingsRow::StopSequence => self.store.clear_stop_sequence(),
            SettingsRow::SystemPrompt => self.store.clear_system_prompt(),
            SettingsRow::Model | SettingsRow::Slider(_) => {}
        }
    }

    pub fn begin_text_edit(&mut self) {
        let Some(field) = self.selected_row().text_field() else {
            return;
        };
        let settings = self.store.settings();
        let buffer = match field {
            SettingField::Seed => settings.seed.map(|s| s.to_string()).unwrap_or_default(),
            SettingField::StopSequence => settings.stop_sequence.clone(),
            _ => settings.system_prompt.clone(),
        };
        self.text_edit = Some(TextEdit { field, buffer });
    }

    pub fn commit_text_edit(&mut self) {
        if let Some(edit) = self.text_edit.take() {
            self.store.set(edit.field, &edit.buffer);
        }
    }

    pub fn cancel_text_edit(&mut self) {
        self.text_edit = None;
    }

    // -----------------------------------------------------------------------
    // Pointer
    // -----------------------------------------------------------------------

    /// `tracks` are the slider track rectangles from the last layout.
    pub fn mouse_down(&mut self, column: u16, row: u16, tracks: &[(ChannelId, Rect)]) {
        let hit = tracks.iter().find(|(_, r)| {
            row >= r.y && row < r.y + r.height && column >= r.x && column < r.x + r.width
        });
        if let Some((id, rect)) = hit {
            self.drag = Some((*id, *rect));
            self.engine.pointer_down(*id, cell_center(column));
            if let Some(index) = SettingsRow::all()
                .iter()
                .position(|r| *r == SettingsRow::Slider(*id))
            {
                self.settings_cursor = index;
            }
        }
    }

    pub fn mouse_drag(&mut self, column: u16, now: Instant) {
        if let Some((id, rect)) = self.drag {
            self.engine.pointer_move(
                id,
                cell_center(column),
                track_bounds(rect),
                &mut self.store,
                now,
            );
        }
    }

    /// Ends a drag; a release with no movement counts as a click.
    pub fn mouse_up(&mut self, column: u16, now: Instant) {
        if let Some((id, rect)) = self.drag.take() {
            self.engine.pointer_up(id, now);
            self.engine.click(
                id,
                cell_center(column),
                track_bounds(rect),
                &mut self.store,
                now,
            );
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use crate::backend::ChatEnvelope;
    use crate::error::BackendError;
    use crate::session::Sender;

    fn app_with(results: Vec<Result<ChatEnvelope, BackendError>>) -> App {
        App::new(AppConfig::default(), Arc::new(ScriptedBackend::new(results)))
    }

    fn tracks() -> Vec<(ChannelId, Rect)> {
        ChannelId::ALL
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, Rect::new(20, 4 + i as u16 * 2, 40, 1)))
            .collect()
    }

    fn wait_for_reply(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.pipeline.is_busy() && Instant::now() < deadline {
            app.poll_background(Instant::now());
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn first_submit_switches_to_conversation() {
        let mut app = app_with(vec![Ok(ChatEnvelope::ok("Hi!")), Ok(ChatEnvelope::ok("again"))]);
        assert_eq!(app.screen, Screen::Welcome);
        app.input = "Hello".into();
        app.submit_input();
        assert_eq!(app.screen, Screen::Conversation);
        assert!(app.input.is_empty());
        wait_for_reply(&mut app);
        assert_eq!(app.session.history()[1].content, "Hi!");

        app.input = "More".into();
        app.submit_input();
        wait_for_reply(&mut app);
        assert_eq!(app.screen, Screen::Conversation);
        assert_eq!(app.session.len(), 4);
    }

    #[test]
    fn blank_input_stays_on_welcome() {
        let mut app = app_with(vec![]);
        app.input = "   ".into();
        app.submit_input();
        assert_eq!(app.screen, Screen::Welcome);
        assert!(app.session.is_empty());
    }

    #[test]
    fn classified_error_sets_status() {
        let mut app = app_with(vec![Ok(ChatEnvelope::failure("nope", "server_error"))]);
        app.input = "x".into();
        app.submit_input();
        wait_for_reply(&mut app);
        assert_eq!(app.status_message.as_deref(), Some("Server Error"));
        assert_eq!(app.session.history()[1].sender, Sender::Assistant);
    }

    #[test]
    fn click_on_track_sets_value() {
        let mut app = app_with(vec![]);
        let tracks = tracks();
        let now = Instant::now();
        // Last cell of the top-p track.
        app.mouse_down(59, 12, &tracks);
        app.mouse_up(59, now);
        assert_eq!(app.store.settings().top_p, 1.0);
        app.mouse_down(20, 12, &tracks);
        app.mouse_up(20, now);
        assert_eq!(app.store.settings().top_p, 0.0);
        assert_eq!(app.selected_row(), SettingsRow::Slider(ChannelId::TopP));
    }

    #[test]
    fn drag_continues_outside_track_row() {
        let mut app = app_with(vec![]);
        let tracks = tracks();
        let t0 = Instant::now();
        app.mouse_down(30, 6, &tracks);
        app.mouse_drag(200, t0);
        app.mouse_up(200, t0);
        assert_eq!(app.store.settings().max_tokens, 4096);
    }

    #[test]
    fn miss_does_nothing() {
        let mut app = app_with(vec![]);
        app.mouse_down(2, 2, &tracks());
        app.mouse_up(2, Instant::now());
        assert_eq!(app.store.settings(), &crate::settings::Settings::default());
    }

    #[test]
    fn reset_resynchronizes_sliders() {
        let mut app = app_with(vec![]);
        let now = Instant::now();
        app.settings_cursor = 1;
        app.adjust_selected(5, now);
        assert_eq!(app.store.settings().temperature, 1.2);
        app.reset_settings();
        assert_eq!(app.store.settings().temperature, 0.7);
        assert_eq!(app.engine.channel(ChannelId::Temperature).current_value, 0.7);
    }

    #[test]
    fn empty_conversation_is_not_exported() {
        let mut app = app_with(vec![]);
        assert_eq!(app.export_conversation(), None);
        assert_eq!(app.status_message.as_deref(), Some("Nothing to export yet"));
    }

    #[test]
    fn reset_mid_drag_discards_the_release() {
        let mut app = app_with(vec![]);
        let tracks = tracks();
        let t0 = Instant::now();
        app.mouse_down(30, 10, &tracks);
        app.mouse_drag(50, t0);
        assert_ne!(app.store.settings().frequency_penalty, 0.0);
        app.reset_settings();
        app.mouse_up(20, t0 + Duration::from_millis(5));
        assert_eq!(app.store.settings().frequency_penalty, 0.0);
        assert!(!app.engine.channel(ChannelId::FrequencyPenalty).is_dragging);
    }

    #[test]
    fn text_edit_commits_through_store() {
        let mut app = app_with(vec![]);
        app.settings_cursor = SettingsRow::all()
            .iter()
            .position(|r| *r == SettingsRow::StopSequence)
            .unwrap();
        app.begin_text_edit();
        app.text_edit.as_mut().unwrap().buffer.push_str("###");
        app.commit_text_edit();
        assert_eq!(app.store.settings().stop_sequence, "###");
        app.clear_selected();
        assert!(app.store.settings().stop_sequence.is_empty());
    }

    #[test]
    fn model_row_cycles_catalogue() {
        let mut app = app_with(vec![]);
        app.settings_cursor = 0;
        app.adjust_selected(1, Instant::now());
        assert_eq!(app.store.model(), "gpt-4-turbo");
        app.adjust_selected(-1, Instant::now());
        assert_eq!(app.store.model(), "gpt-4o");
    }

    #[test]
    fn poll_timeout_shrinks_for_pending_recompute() {
        let mut app = app_with(vec![]);
        let now = Instant::now();
        let idle = Duration::from_millis(50);
        assert_eq!(app.poll_timeout(now, idle), idle);
        app.settings_cursor = 1;
        app.adjust_selected(1, now);
        assert_eq!(app.poll_timeout(now, idle), Duration::from_millis(10));
    }
}
