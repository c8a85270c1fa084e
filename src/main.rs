// Main entry point - CLI parsing, dependency wiring and the render loop
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use crossterm::execute;
use crossterm::terminal::{LeaveAlternateScreen, disable_raw_mode};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::application::display_controller::DisplayController;
use crate::application::display_loop::{frame_interval, run_display};
use crate::application::frame_composer::FrameComposer;
use crate::infrastructure::avwx_source::AvwxSource;
use crate::infrastructure::config::{ConfigOverrides, load_hud_config};
use crate::presentation::matrix_canvas::{MatrixCanvas, StreamPanel};
use crate::presentation::terminal_canvas::TerminalCanvas;

/// Log file used while the simulator owns the terminal.
const SIMULATOR_LOG_FILE: &str = "metar-hud.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Terminal rendering of the matrix
    Simulator,
    /// RGB24 frame stream to a matrix driver
    Matrix,
}

#[derive(Parser)]
#[command(name = "metar-hud")]
#[command(about = "Aviation weather HUD for RGB LED matrices", long_about = None)]
struct Args {
    /// ICAO airport code (e.g. KJFK)
    airport: Option<String>,

    /// Configuration file
    #[arg(long, default_value = "config/hud.toml")]
    config: PathBuf,

    /// AVWX API token; without one the display runs on demo weather
    #[arg(long)]
    token: Option<String>,

    /// Seconds between weather updates
    #[arg(long)]
    update: Option<u64>,

    /// Matrix width in LEDs
    #[arg(long)]
    width: Option<u32>,

    /// Matrix height in LEDs
    #[arg(long)]
    height: Option<u32>,

    /// Brightness, 0-100
    #[arg(long)]
    brightness: Option<u32>,

    /// Screenshot pixels per LED
    #[arg(long, default_value = "10")]
    size: u32,

    /// Output backend
    #[arg(long, value_enum, default_value = "simulator")]
    backend: Backend,

    /// Device or FIFO the matrix driver reads frames from
    #[arg(long, required_if_eq("backend", "matrix"))]
    device: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.backend)?;

    // Load configuration
    let overrides = ConfigOverrides {
        airport: args.airport.clone(),
        api_token: args.token.clone(),
        width: args.width,
        height: args.height,
        brightness: args.brightness,
        update_interval: args.update,
    };
    let settings = load_hud_config(&args.config, &overrides)?.into_settings()?;
    tracing::info!(
        "Display {}x{} for {}, updating every {}s",
        settings.width,
        settings.height,
        settings.airport,
        settings.update_interval.as_secs()
    );

    // Live source only when a token exists; otherwise the controller runs on demo data
    let live_source = match &settings.api_token {
        Some(token) => Some(Arc::new(AvwxSource::new(&settings.api_base_url, token)?)),
        None => None,
    };
    let composer = FrameComposer::new(settings.width, settings.height);
    let mut controller =
        DisplayController::new(settings.controller_settings(), live_source, composer);
    let interval = frame_interval(settings.frame_rate);

    match args.backend {
        Backend::Simulator => {
            if !io::stdout().is_terminal() {
                anyhow::bail!(
                    "The simulator needs an interactive terminal; use --backend matrix otherwise"
                );
            }
            install_terminal_panic_hook();
            let mut canvas = TerminalCanvas::new(
                settings.width,
                settings.height,
                settings.brightness,
                args.size,
            )?;
            run_display(&mut controller, &mut canvas, interval, shutdown_signal()).await
        }
        Backend::Matrix => {
            let device = args
                .device
                .as_deref()
                .context("--device is required for the matrix backend")?;
            let panel = StreamPanel::open(device, settings.width, settings.height)?;
            let mut canvas = MatrixCanvas::new(panel, settings.brightness);
            run_display(&mut controller, &mut canvas, interval, shutdown_signal()).await
        }
    }
}

fn init_tracing(backend: Backend) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The simulator draws on the terminal, so its logs go to a file
    let (writer, ansi) = match backend {
        Backend::Simulator => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(SIMULATOR_LOG_FILE)
                .with_context(|| format!("Failed to open log file {}", SIMULATOR_LOG_FILE))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        Backend::Matrix => (BoxMakeWriter::new(io::stderr), true),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .init();
    Ok(())
}

fn install_terminal_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
