//! reportwatch - live monitor for report generation runs
//!
//! Terminal UI that follows the agent and console logs of one report while it
//! is being generated.

mod app;
mod message_format;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use reportwatch_core::{Config, ReportClient};

use crate::app::App;

#[derive(Parser)]
#[command(name = "reportwatch")]
#[command(about = "Watch a report being generated")]
#[command(version)]
struct Args {
    /// Report to watch (press `r` in the UI to pick one later)
    report_id: Option<String>,

    /// Backend base URL, overrides `server.base_url` from the config file
    #[arg(long)]
    server: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;
    if let Some(server) = args.server {
        config.server.base_url = server;
    }

    // Initialize logging (to file, not stdout since we have a TUI)
    let _log_guard = reportwatch_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!(base_url = %config.server.base_url, "reportwatch TUI starting up");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    // Pollers are spawned from the UI thread.
    let _runtime_guard = runtime.enter();

    let client = ReportClient::new(&config.server).context("invalid server configuration")?;
    let mut app = App::new(
        Arc::new(client),
        config.polling.clone(),
        config.session.outline_policy,
    );
    if let Some(report_id) = &args.report_id {
        app.watch(report_id);
    }

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    tracing::info!("reportwatch TUI shutting down");

    result
}

/// Run the main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.drain_updates();

        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
