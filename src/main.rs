mod app;
mod backend;
mod cli;
mod color;
mod config;
mod error;
mod export;
mod logging;
mod pipeline;
mod session;
mod settings;
mod slider;
mod timer;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Position, Rect};
use ratatui::Terminal;

use app::{App, Focus};
use backend::HttpBackend;
use cli::{Cli, Commands, ConfigAction};
use config::AppConfig;
use pipeline::{ExchangeOutcome, MessagePipeline, Submit};
use session::ConversationSession;
use settings::{SettingField, SettingsStore};

/// Longest the event loop sleeps when nothing is scheduled.
const IDLE_POLL: Duration = Duration::from_millis(50);

fn main() {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let log_path = logging::init_file_logging(&config::log_dir());
            let config = effective_config(cli.backend, cli.model);
            if let Err(e) = &log_path {
                eprintln!("Warning: file logging disabled: {}", e);
            }
            if let Err(e) = run_tui(config) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Some(cmd) => {
            logging::init_stderr_logging();
            let config = effective_config(cli.backend, cli.model);
            dispatch_command(cmd, config);
        }
    }
}

/// Flag > environment > config file > defaults.
fn effective_config(backend: Option<String>, model: Option<String>) -> AppConfig {
    let mut config = config::load_config().with_env(|key| std::env::var(key).ok());
    if let Some(url) = backend {
        config.backend_url = url;
    }
    if let Some(model) = model {
        config.default_model = model;
    }
    config
}

fn connect(config: &AppConfig) -> HttpBackend {
    match HttpBackend::new(&config.backend_url, config.request_timeout()) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn dispatch_command(cmd: Commands, config: AppConfig) {
    match cmd {
        Commands::Ask {
            message,
            temperature,
            max_tokens,
            system,
        } => run_ask(&config, &message, temperature, max_tokens, system),
        Commands::Models => {
            let backend = connect(&config);
            match backend.fetch_models() {
                Ok(list) => {
                    if list.models.is_empty() {
                        println!("The backend reported no models.");
                        return;
                    }
                    let width = list.models.keys().map(|k| k.len()).max().unwrap_or(0);
                    for (model, provider) in &list.models {
                        println!("  {:<width$}  {}", model, provider, width = width);
                    }
                    if !list.available_providers.is_empty() {
                        println!();
                        println!("Available: {}", list.available_providers.join(", "));
                    }
                }
                Err(e) => {
                    eprintln!("Error fetching models: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Health => {
            let backend = connect(&config);
            match backend.health() {
                Ok(health) => {
                    println!("Backend:   {}", backend.base_url());
                    println!("Status:    {}", health.status);
                    println!("Providers: {}", health.available_providers.join(", "));
                    println!("Models:    {}", health.supported_models.len());
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Config { action } => handle_config(action, &config),
    }
}

fn run_ask(
    config: &AppConfig,
    message: &str,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    system: Option<String>,
) {
    let mut store = SettingsStore::new(config.default_model.clone());
    if let Some(t) = temperature {
        store.set_number(SettingField::Temperature, t);
    }
    if let Some(n) = max_tokens {
        store.set_number(SettingField::MaxTokens, n as f64);
    }
    if let Some(prompt) = system {
        store.set(SettingField::SystemPrompt, &prompt);
    }

    let mut session = ConversationSession::new();
    let mut pipeline = MessagePipeline::new(Arc::new(connect(config)));
    if !matches!(
        pipeline.submit(message, &store, &mut session),
        Submit::Dispatched { .. }
    ) {
        eprintln!("Error: message is empty");
        std::process::exit(1);
    }

    match pipeline.wait(&mut session).map(|r| r.outcome) {
        Some(ExchangeOutcome::Reply(text)) => println!("{}", text),
        Some(ExchangeOutcome::Failed { message, .. }) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
        None => {
            eprintln!("Error: no exchange was pending");
            std::process::exit(1);
        }
    }
}

fn handle_config(action: ConfigAction, config: &AppConfig) {
    let path = config::config_path();
    match action {
        ConfigAction::Show => match serde_json::to_string_pretty(config) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init => {
            if path.exists() {
                println!("Config already exists at {}", path.display());
                return;
            }
            match config::write_config(&path, &AppConfig::default()) {
                Ok(()) => println!("Wrote default config to {}", path.display()),
                Err(e) => {
                    eprintln!("Error writing config: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn run_tui(config: AppConfig) -> io::Result<()> {
    let backend = HttpBackend::new(&config.backend_url, config.request_timeout())
        .map_err(|e| io::Error::other(e.to_string()))?;
    tracing::info!(backend = %config.backend_url, model = %config.default_model, "starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app = App::new(config, Arc::new(backend));
    let result = run_app(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    tracing::info!(messages = app.session.len(), "exiting");
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), io::Error> {
    loop {
        app.poll_background(Instant::now());

        terminal.draw(|f| ui::render(f, app))?;

        // Wake early when a slider recompute is due.
        let timeout = app.poll_timeout(Instant::now(), IDLE_POLL);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    handle_mouse(app, mouse, Rect::new(0, 0, size.width, size.height));
                }
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Ctrl+C always quits
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    if app.show_help {
        app.show_help = false;
        return;
    }

    // Clear status message on any keypress
    app.status_message = None;

    match (key.code, ctrl) {
        (KeyCode::F(1), _) => {
            app.show_help = true;
            return;
        }
        (KeyCode::F(2), _) | (KeyCode::Char('s'), true) => {
            app.toggle_settings();
            return;
        }
        (KeyCode::Char('r'), true) => {
            app.reset_settings();
            return;
        }
        (KeyCode::Char('e'), true) => {
            app.export_conversation();
            return;
        }
        _ => {}
    }

    match app.focus {
        Focus::Composer => handle_composer_input(app, key),
        Focus::Settings if app.text_edit.is_some() => handle_text_edit_input(app, key),
        Focus::Settings => handle_settings_input(app, key),
    }
}

fn handle_composer_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab if app.settings_open => app.focus = Focus::Settings,
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::PageUp => app.scroll_up(5),
        KeyCode::PageDown => app.scroll_down(5),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.input.clear();
        }
        KeyCode::Char(c) => app.input.push(c),
        _ => {}
    }
}

fn handle_text_edit_input(app: &mut App, key: KeyEvent) {
    let Some(edit) = app.text_edit.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Enter => app.commit_text_edit(),
        KeyCode::Esc => app.cancel_text_edit(),
        KeyCode::Backspace => {
            edit.buffer.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            edit.buffer.clear();
        }
        KeyCode::Char(c) => edit.buffer.push(c),
        _ => {}
    }
}

fn handle_settings_input(app: &mut App, key: KeyEvent) {
    let steps = if key.modifiers.contains(KeyModifiers::SHIFT) {
        10
    } else {
        1
    };
    let now = Instant::now();
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.select_prev_row(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next_row(),
        KeyCode::Left | KeyCode::Char('h') => app.adjust_selected(-steps, now),
        KeyCode::Right | KeyCode::Char('l') => app.adjust_selected(steps, now),
        KeyCode::Enter => app.begin_text_edit(),
        KeyCode::Char('r') => app.randomize_seed(),
        KeyCode::Char('x') => app.clear_selected(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.clear_selected();
        }
        KeyCode::Tab => app.focus = Focus::Composer,
        KeyCode::Esc => app.toggle_settings(),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, area: Rect) {
    let now = Instant::now();
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let Some(panel) = ui::main_layout(area, app.settings_open).settings else {
                return;
            };
            let tracks = ui::settings_layout(panel).tracks;
            let at = Position::new(mouse.column, mouse.row);
            if tracks.iter().any(|(_, rect)| rect.contains(at)) {
                app.focus = Focus::Settings;
                app.cancel_text_edit();
            }
            app.mouse_down(mouse.column, mouse.row, &tracks);
        }
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(mouse.column, now),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(mouse.column, now),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}
