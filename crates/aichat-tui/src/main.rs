use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use aichat_core::config::ENDPOINT_ENV;
use aichat_core::{ChatSession, Config, EndpointClient, RequestFailed};
use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod markdown;
mod tui;
mod ui;

#[cfg(test)]
mod test_support;

use app::App;
use tui::{AppEvent, EventHandler, Tui};

const DEFAULT_LOG_FILTER: &str = "aichat=info";

#[derive(Parser)]
#[command(name = "aichat", version)]
#[command(about = "Chat with a hosted text-generation endpoint from the terminal")]
struct Cli {
    /// Generate endpoint URL (overrides AICHAT_ENDPOINT and the config file)
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// Log filter, e.g. "aichat=debug" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(e)),
    };

    let filter = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    // The TUI owns the terminal, so it logs to a file instead
    let log_file = init_logging(&filter, cli.command.is_none())?;
    if let Some(path) = &log_file {
        tracing::info!("Logging to {}", path.display());
    }
    if let Some(e) = config_error {
        tracing::warn!("Config load failed, using defaults: {e}");
    }

    let env_endpoint = std::env::var(ENDPOINT_ENV).ok();
    let endpoint = config.resolve_endpoint(cli.endpoint.as_deref(), env_endpoint.as_deref())?;
    let client = Arc::new(EndpointClient::new(&endpoint));
    tracing::info!("aichat v{} using endpoint {}", env!("CARGO_PKG_VERSION"), client.url());

    match cli.command {
        Some(Commands::Ask { prompt }) => ask(client, &prompt).await,
        None => run_tui(client).await,
    }
}

fn init_logging(filter: &str, to_file: bool) -> Result<Option<PathBuf>> {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if !to_file {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    }

    let log_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?
        .join("aichat");
    fs::create_dir_all(&log_dir)?;
    let path = log_dir.join("aichat.log");
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(Some(path))
}

async fn ask(client: Arc<EndpointClient>, prompt: &str) -> Result<()> {
    let mut session = ChatSession::new(client);

    if !session.submit(prompt).await {
        bail!("Nothing to ask: the prompt is empty");
    }

    if let Some(answer) = session.last_answer() {
        println!("{}", answer);
    }

    Ok(())
}

async fn run_tui(client: Arc<EndpointClient>) -> Result<()> {
    tui::install_panic_hook();

    let endpoint = client.url().to_string();

    let mut events = EventHandler::new();

    // Every session transition wakes the loop so it re-renders and follows the bottom
    let notify = events.sender();
    let session = ChatSession::new(client).with_observer(move |event| {
        tracing::debug!(?event, "session changed");
        let _ = notify.send(AppEvent::SessionChanged);
    });
    let mut app = App::new(session, endpoint);

    let mut terminal = tui::init()?;
    let result = run(&mut app, &mut events, &mut terminal).await;
    tui::restore()?;

    result
}

enum Step {
    Event(AppEvent),
    Settled(Result<String, RequestFailed>),
    Closed,
}

async fn run(app: &mut App, events: &mut EventHandler, terminal: &mut Tui) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let step = tokio::select! {
            event = events.next() => match event {
                Some(event) => Step::Event(event),
                None => Step::Closed,
            },
            outcome = app.wait_request() => Step::Settled(outcome),
        };

        match step {
            Step::Event(event) => handler::handle_event(app, event)?,
            Step::Settled(outcome) => app.session.finish(outcome),
            Step::Closed => break,
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}
