//! `vigia start` / `vigia stop`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::SystemTime;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vigia::prelude::*;

/// Detach into the background and serve a directory over HTTP.
#[derive(Parser, Debug)]
#[command(name = "vigia", version, about)]
struct Cli {
    /// Config file (TOML); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Daemonize and serve the configured directory
    Start {
        /// Keep the terminal: no forks, no stream redirection
        #[arg(long)]
        foreground: bool,
    },
    /// Send SIGTERM to the running daemon
    Stop,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            // Usage errors exit 1, not clap's default 2. If stderr is gone
            // there is nowhere left to report the print failure.
            e.print().ok();
            return ExitCode::FAILURE;
        }
    };

    init_tracing();
    tracing::debug!(?cli, "parsed CLI arguments");

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Start { foreground } => start(&config, foreground),
        Command::Stop => stop(&PidFile::new(&config.pid_file)).map(|_| ()),
    });

    // Cleanup runs here, while thread-locals (and so logging) still work.
    vigia::platform::exit_hook::run_now();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vigia: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    // stderr is resolved on every write, so after daemonization log lines
    // follow fd 2 into the stderr target.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<VigiaConfig> {
    match path {
        Some(path) => VigiaConfig::load(path),
        None => Ok(VigiaConfig::default()),
    }
}

fn start(config: &VigiaConfig, foreground: bool) -> Result<()> {
    let cleanup = CleanupRegistry::new().with(|| {
        tracing::info!(pid = std::process::id(), "daemon stopped");
    });

    let pid = if foreground {
        run_foreground(&config.pid_file, cleanup)?
    } else {
        daemonize(&DaemonOptions::from(config), cleanup)?
    };

    println!(
        "daemon started with pid {pid} at {}",
        humantime::format_rfc3339_seconds(SystemTime::now())
    );

    serve_forever(&config.serve)
}
