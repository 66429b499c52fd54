use std::path::PathBuf;

use clap::{Parser, Subcommand};
use swapdeck::app::App;
use swapdeck::config::Config;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "swapdeck",
    version,
    about = "Order synchronization engine for the swap marketplace"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the synchronization engine (default).
    Run,
    /// Validate the configuration file and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if matches!(cli.command, Some(Command::CheckConfig)) {
        println!("config ok: {}", cli.config.display());
        return;
    }

    config.init_logging();
    info!("swapdeck starting");

    tokio::select! {
        result = App::run(config) => {
            if let Err(e) = result {
                error!(error = %e, "Fatal error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("swapdeck stopped");
}
