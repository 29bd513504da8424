//! gangterm - Head Honcho control panel
//!
//! Terminal UI that drives one remote session: connection log, interactive
//! remote terminal, script execution, workspace snapshots, internal state,
//! and chat.

mod app;
mod input;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gangterm_core::{Config, Session, SessionSettings, WsTransport};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::App;

#[derive(Parser, Debug)]
#[command(name = "gangterm")]
#[command(about = "Terminal control panel for a Head Honcho backend")]
#[command(version)]
struct Args {
    /// Head Honcho WebSocket URL (overrides the config file)
    #[arg(long)]
    url: Option<String>,

    /// Config file to use instead of ~/.config/gangterm/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Script file to load into the Exec tab
    #[arg(long)]
    script: Option<PathBuf>,

    /// Validate the configuration, print a summary and exit
    #[arg(long)]
    check: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    if let Some(url) = &args.url {
        config.remote.url = Some(url.clone());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn print_summary(config: &Config) {
    println!("gangterm configuration");
    println!(
        "  Remote URL:      {}",
        config.remote.url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  Connect timeout: {}s",
        config.remote.connect_timeout_secs
    );
    println!("  Auto connect:    {}", config.remote.auto_connect);
    println!(
        "  Sync target:     {}",
        config
            .remote
            .workspace_sync_target
            .as_deref()
            .unwrap_or("(not set)")
    );
    println!("  Guardian mode:   {}", config.guardian.security_level.label());
    println!("  Log file:        {}", Config::log_path().display());
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.check {
        print_summary(&config);
        return Ok(());
    }

    // Initialize logging (to file, not stdout since we have a TUI)
    let _log_guard =
        gangterm_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("gangterm starting up");

    // Connection tasks run here; the UI loop stays on the main thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let (transport, events) =
        WsTransport::new(runtime.handle().clone(), config.remote.connect_timeout());
    let session = Session::new(transport, SessionSettings::from_config(&config));
    let mut app = App::new(session, events, args.script.clone())?;

    if config.remote.auto_connect {
        // Rejections are already in the connection log.
        let _ = app.session.connect();
    }

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    // Run the main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )
    .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    if app.session.connection_id().is_some() {
        app.session.disconnect();
    }
    runtime.shutdown_timeout(Duration::from_millis(500));

    tracing::info!("gangterm shutting down");

    result
}

/// Run the main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.pump_events();

        terminal.draw(|frame| ui::render(frame, app))?;

        // Short poll keeps remote terminal output flowing while idle
        if event::poll(Duration::from_millis(30))? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => app.handle_key(key),
                Event::Paste(text) => app.handle_paste(&text),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
