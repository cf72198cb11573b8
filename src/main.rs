use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use chaterm::api::ChatClient;
use chaterm::app::App;
use chaterm::config::{Config, DEFAULT_ENDPOINT, DEFAULT_TYPING_DELAY_MS};
use chaterm::store::StateStore;
use chaterm::{handler, logging, tui, ui};

#[derive(Parser)]
#[command(name = "chaterm")]
#[command(about = "Terminal chat client talking to a chat backend over HTTP")]
struct Cli {
    /// Base URL of the chat backend
    #[arg(long, env = "CHATERM_ENDPOINT")]
    endpoint: Option<String>,

    /// Per-character delay of the simulated token reveal, in milliseconds
    #[arg(long)]
    typing_delay_ms: Option<u64>,

    /// Drop the saved conversation and start fresh
    #[arg(long)]
    reset: bool,

    /// Log file path (defaults to the config directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|_| Config::new());
    let endpoint = cli
        .endpoint
        .or(config.endpoint)
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let typing_delay_ms = cli
        .typing_delay_ms
        .or(config.typing_delay_ms)
        .unwrap_or(DEFAULT_TYPING_DELAY_MS);

    let log_path = match cli.log_file {
        Some(path) => path,
        None => logging::default_log_path()?,
    };
    logging::init(&log_path)?;
    tracing::info!(%endpoint, typing_delay_ms, "starting chaterm");

    // Seed the config on first run with whatever was resolved
    if !Config::is_saved() {
        let seeded = Config {
            endpoint: Some(endpoint.clone()),
            typing_delay_ms: Some(typing_delay_ms),
        };
        if let Err(err) = seeded.save() {
            tracing::warn!(error = %err, "failed to write initial config");
        }
    }

    let store = StateStore::open()?;
    if cli.reset {
        store.clear()?;
    }
    let chat_state = store.load();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let mut app = App::new(
        chat_state,
        store,
        ChatClient::new(&endpoint),
        Duration::from_millis(typing_delay_ms),
        events.sender(),
    );

    let result = run(&mut terminal, &mut events, &mut app).await;
    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, events: &mut tui::EventHandler, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event)?;

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
