//! ---
//! ems_section: "12-gui-setup-wizard"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Terminal dashboard for the EV charging-queue simulation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use evq_client::HttpSimulationClient;
use evq_common::{init_tracing, DashboardConfig, LogSink};
use evq_core::{ControllerSettings, SessionController};
use evq_logging::{log_system_event, SystemEventOutcome};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use url::Url;

mod draw;
mod input;
mod view;

use input::{Action, UiState};
use view::SharedView;

const CONFIG_CANDIDATES: &[&str] = &["configs/evq.toml", "evq.toml"];

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Watch and drive an EV charging-queue simulation from the terminal"
)]
struct Cli {
    /// Configuration file (defaults to EVQ_CONFIG, then configs/evq.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Backend base URL, overriding the configuration file
    #[arg(long, env = "EVQ_BACKEND_URL")]
    base_url: Option<Url>,
    /// Initial speed multiplier
    #[arg(long)]
    speed: Option<u32>,
}

type DashboardTerminal = Terminal<CrosstermBackend<io::Stdout>>;

fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_path(path)?,
        None => DashboardConfig::load(CONFIG_CANDIDATES)?,
    };
    if let Some(base_url) = &cli.base_url {
        config.backend.base_url = base_url.clone();
    }
    if let Some(speed) = cli.speed {
        config.polling.initial_speed = speed;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing("evq-ui", &config.logging, LogSink::FileOnly)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, Hide)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    let result = runtime.block_on(run_app(&mut terminal, config));
    cleanup_terminal(&mut terminal)?;
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
    Ok(())
}

fn cleanup_terminal(terminal: &mut DashboardTerminal) -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Forward terminal events from a blocking reader thread.
fn spawn_input_reader() -> mpsc::Receiver<Event> {
    let (tx, rx) = mpsc::channel(64);
    thread::spawn(move || loop {
        match event::read() {
            Ok(event) => {
                if tx.blocking_send(event).is_err() {
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "terminal input closed");
                break;
            }
        }
    });
    rx
}

async fn run_app(terminal: &mut DashboardTerminal, config: DashboardConfig) -> Result<()> {
    let client = HttpSimulationClient::from_config(&config.backend)?;
    let view = SharedView::default();
    let settings = ControllerSettings::from(&config);
    let max_speed = settings.max_speed;
    let mut controller = SessionController::new(Arc::new(client), view.surface_set(), settings);
    log_system_event(
        None,
        "ui.start",
        &format!("dashboard attached to {}", config.backend.base_url),
        SystemEventOutcome::Success,
    );

    let mut ui = UiState::default();
    let mut events = spawn_input_reader();
    loop {
        {
            let model = view.lock();
            input::clamp_cursor(&mut ui, &model);
            terminal.draw(|frame| draw::draw_ui(frame, &model, &ui))?;
        }
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let Event::Key(key) = event else { continue };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let action = input::handle_key(key, &mut ui, &mut view.lock(), max_speed);
                match action {
                    Action::Quit => break,
                    // Rejections are already on the status line.
                    Action::Dispatch(command) => {
                        let _ = controller.handle_command(command);
                    }
                    Action::None => {}
                }
            }
            _ = controller.step() => {}
        }
    }
    controller.shutdown();
    log_system_event(None, "ui.stop", "dashboard closed", SystemEventOutcome::Success);
    Ok(())
}
