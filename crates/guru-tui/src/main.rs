use std::fs::{self, OpenOptions};
use std::sync::{Arc, Mutex};
use anyhow::{bail, Result};
use clap::Parser;
use guru_core::{AuthMode, Config, HttpTransport, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "guru")]
#[command(version, about = "Terminal client for the GURU school assistant")]
struct Cli {
    /// Base URL of the GURU backend API
    #[arg(long, env = "GURU_API_URL")]
    api_url: Option<String>,

    /// How requests are authenticated: bearer or cookie
    #[arg(long, env = "GURU_AUTH_MODE")]
    auth_mode: Option<String>,

    /// Keep the session in memory only
    #[arg(long)]
    no_persist: bool,

    /// Clear the stored session and exit
    #[arg(long)]
    logout: bool,

    /// Write the given --api-url/--auth-mode to the config file
    #[arg(long)]
    save_config: bool,
}

/// Log to a file; the terminal belongs to the UI
fn init_logging() -> Result<()> {
    let dir = Config::config_dir()?;
    fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("guru.log"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,guru_core=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;

    if let Some(url) = &cli.api_url {
        config.api_url = Some(url.clone());
    }
    if let Some(mode) = &cli.auth_mode {
        if AuthMode::from_str(mode).is_none() {
            bail!("Unknown auth mode '{}', expected 'bearer' or 'cookie'", mode);
        }
        config.auth_mode = Some(mode.to_lowercase());
    }

    if cli.save_config {
        config.save()?;
        tracing::info!("Saved configuration");
    }

    Ok(config)
}

fn load_session(cli: &Cli) -> Result<Session> {
    if cli.no_persist {
        return Ok(Session::ephemeral());
    }
    let path = Session::default_path()?;
    match Session::load(&path) {
        Ok(session) => Ok(session),
        Err(e) => {
            tracing::warn!("Ignoring unreadable session file: {}", e);
            eprintln!("Could not read {:?}, starting signed out", path);
            Ok(Session::ephemeral())
        }
    }
}

async fn run(mut terminal: tui::Tui, mut app: App) -> Result<()> {
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(&mut app, event);
        app.poll_tasks().await;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {}", e);
    }

    let config = load_config(&cli)?;
    let mut session = load_session(&cli)?;

    if cli.logout {
        session.clear();
        println!("Signed out.");
        return Ok(());
    }

    let api_url = config.api_url();
    let auth_mode = config.auth_mode();
    tracing::info!("Starting GURU client against {} ({})", api_url, auth_mode.as_str());

    let transport = HttpTransport::from_config(&config)?;
    let app = App::new(session, Arc::new(transport), &api_url, auth_mode);

    tui::install_panic_hook();
    let terminal = tui::init()?;
    let result = run(terminal, app).await;
    tui::restore()?;

    result
}
