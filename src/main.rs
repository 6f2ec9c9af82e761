mod app;
mod collectors;
mod config;
mod display;
mod prompt;
mod state;
mod tray;

use clap::Parser;
use collectors::Collector;
use config::Config;
use state::Position;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "statlay")]
#[command(version)]
#[command(about = "Always-on-top overlay with CPU, RAM, disk and GPU usage")]
struct Cli {
    /// Config file; ./statlay.yaml is used when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Screen corner; skips the interactive prompt.
    #[arg(long, value_enum)]
    position: Option<Position>,
    #[arg(long)]
    print_default_config: bool,
    /// Print one snapshot as JSON and exit.
    #[arg(long)]
    once: bool,
    #[arg(long)]
    no_tray: bool,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return ExitCode::SUCCESS;
    }

    let cfg = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load config");
            return ExitCode::FAILURE;
        }
    };

    if cli.once {
        return print_snapshot(&cfg);
    }

    let position = match cli.position.or(cfg.position) {
        Some(position) => position,
        None => ask_position(),
    };

    match app::run(cfg, position, !cli.no_tray) {
        Ok(()) => {
            info!("overlay closed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "overlay window failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn ask_position() -> Position {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    match prompt::prompt_position(&mut input, &mut out) {
        Ok(position) => position,
        Err(err) => {
            warn!(error = %err, "cannot read position, using {}", prompt::FALLBACK_POSITION);
            prompt::FALLBACK_POSITION
        }
    }
}

/// CPU usage needs two samples, so wait one interval before the reading that
/// gets printed.
fn print_snapshot(cfg: &Config) -> ExitCode {
    let mut collector = Collector::new(&cfg.gpu);
    thread::sleep(Duration::from_millis(cfg.interval_ms));
    let snapshot = collector.collect();

    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "failed to encode snapshot");
            ExitCode::FAILURE
        }
    }
}
