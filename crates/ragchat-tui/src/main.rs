use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ragchat_client::{open_store, Backend, ChatController, HttpGateway, SessionIdentity};
use ragchat_config::{default_log_path, ConfigManager, LoggingConfig, ServerConfig};
use ragchat_observability::{create_session_span, LogManager, LogOptions};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info, Instrument};

mod app;
mod ui;

use app::{App, InputMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let manager = match std::env::var("RAGCHAT_CONFIG") {
        Ok(path) => ConfigManager::load(&PathBuf::from(path)).await?,
        Err(_) => ConfigManager::load_default().await?,
    };
    let config = manager.snapshot().await;

    // The terminal belongs to the UI, so logs always go to a file
    let _logging = init_logging(&config.logging)?;

    let server = match std::env::args().nth(1) {
        Some(url) => ServerConfig {
            base_url: ServerConfig::new(url).base_url,
            ..config.server.clone()
        },
        None => config.server.clone(),
    };

    let store = open_store(&config.storage);
    let session_id = SessionIdentity::get_or_create(store.as_ref());
    let gateway = HttpGateway::new(&server)?;
    info!("Starting TUI against {} with session {}", gateway.base_url(), session_id);

    let span = create_session_span(&session_id);
    let controller = ChatController::new(gateway, session_id);
    let mut app = App::new(controller);
    span.in_scope(|| app.refresh());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).instrument(span).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("TUI exited with error: {:?}", err);
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<LogManager> {
    let mut options = LogOptions::from(config);
    if options.file_path.is_none() {
        if let Some(path) = default_log_path() {
            options = options.with_log_file(path);
        }
    }
    options.ansi_colors = false;
    Ok(LogManager::init(options)?)
}

async fn run_app<T, B>(terminal: &mut Terminal<T>, app: &mut App<B>) -> anyhow::Result<()>
where
    T: ratatui::backend::Backend,
    B: Backend + 'static,
{
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(100));

    loop {
        app.sync();
        terminal.draw(|f| ui::draw(f, app))?;

        tokio::select! {
            _ = ticker.tick() => app.on_tick(),
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if handle_key_event(app, key) {
                        return Ok(());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
        }
    }
}

/// Returns true when the user asked to quit
fn handle_key_event<B: Backend + 'static>(app: &mut App<B>, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    if ctrl && key.code == KeyCode::Char('c') {
        return true;
    }

    match app.input_mode() {
        InputMode::UploadPath => match key.code {
            KeyCode::Enter => app.submit_upload_path(),
            KeyCode::Esc => app.cancel_upload_prompt(),
            KeyCode::Char(c) => app.push_input(c),
            KeyCode::Backspace => app.pop_input(),
            _ => {}
        },
        InputMode::Normal => match key.code {
            KeyCode::Char('o') if ctrl => app.start_upload_prompt(),
            KeyCode::Char('d') if ctrl => app.delete_selected(),
            KeyCode::Delete => app.delete_selected(),
            KeyCode::Char('r') if ctrl => app.refresh(),
            KeyCode::Char('l') if ctrl => app.dismiss_toasts(),
            KeyCode::Up if alt => app.select_previous_document(),
            KeyCode::Down if alt => app.select_next_document(),
            KeyCode::Enter => app.send_message(),
            KeyCode::Tab => app.next_suggestion(),
            KeyCode::Char(c) => app.push_input(c),
            KeyCode::Backspace => app.pop_input(),
            KeyCode::Up => app.scroll_up(),
            KeyCode::Down => app.scroll_down(),
            KeyCode::PageUp => app.scroll_page_up(),
            KeyCode::PageDown => app.scroll_page_down(),
            KeyCode::End => app.scroll_to_bottom(),
            _ => {}
        },
    }
    false
}
