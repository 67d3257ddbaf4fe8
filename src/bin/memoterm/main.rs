//! memoterm binary: terminal voice memos as structured memory cards.

mod app;
mod ui;

use anyhow::{Context, Result};
use app::App;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use memoterm::audio::input_device_names;
use memoterm::config::{default_store_path, AppConfig};
use memoterm::llm::{CardModel, OpenAiGenerator};
use memoterm::logging::{init_logging, log_panic};
use memoterm::store::JsonCardStore;
use memoterm::stt::{DeepgramTranscriber, SpeechToText};
use memoterm::telemetry::init_tracing;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use std::time::Duration;

const UI_POLL_MS: u64 = 50;

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config);
    init_tracing(&config);

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log_panic(info);
        restore_terminal_best_effort();
        default_hook(info);
    }));

    if config.list_input_devices {
        match input_device_names() {
            Ok(names) if names.is_empty() => {
                println!("No audio input devices detected.");
            }
            Ok(names) => {
                println!("Detected audio input devices:");
                for name in names {
                    println!("  {name}");
                }
            }
            Err(err) => println!("Failed to list audio input devices: {err}"),
        }
        return Ok(());
    }

    let store_path = config
        .store_path
        .clone()
        .unwrap_or_else(default_store_path);
    let store = Arc::new(
        JsonCardStore::open(&store_path)
            .with_context(|| format!("failed to open card store at {}", store_path.display()))?,
    );

    let mut startup_note = String::new();
    let (stt, model): (
        Option<Arc<dyn SpeechToText + Send + Sync>>,
        Option<Arc<dyn CardModel + Send + Sync>>,
    ) = if config.offline {
        startup_note = "Offline mode: recordings are metered, then discarded".to_string();
        (None, None)
    } else {
        let stt = match DeepgramTranscriber::new(config.deepgram_api_key.clone()) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn SpeechToText + Send + Sync>),
            Err(err) => {
                startup_note = err.to_string();
                None
            }
        };
        let model = match OpenAiGenerator::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
        ) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn CardModel + Send + Sync>),
            Err(err) => {
                startup_note = err.to_string();
                None
            }
        };
        (stt, model)
    };

    let mut app = App::new(config, store, stt, model)?;
    app.status = startup_note;

    run_tui(&mut app)
}

fn run_tui(app: &mut App) -> Result<()> {
    enable_raw_mode().context("failed to enable raw terminal mode")?;
    execute!(io::stdout(), EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend).context("failed to start terminal UI")?;

    let result = event_loop(app, &mut terminal);
    restore_terminal_best_effort();
    result
}

fn event_loop(app: &mut App, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    loop {
        app.poll_background();
        terminal.draw(|frame| ui::draw(frame, app))?;

        if !event::poll(Duration::from_millis(UI_POLL_MS))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
            _ => {}
        }
        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: event::KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }
    match key.code {
        KeyCode::Char(' ') => app.toggle_recording(),
        KeyCode::Char('q') => app.quit(),
        KeyCode::Down | KeyCode::Char('j') => app.feed.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.feed.select_prev(),
        KeyCode::Enter => app.open_detail(),
        KeyCode::Esc => app.close_detail(),
        KeyCode::Char('d') => app.delete_selected(),
        _ => {}
    }
}

fn restore_terminal_best_effort() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}
