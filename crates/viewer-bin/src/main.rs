//! viewer-bus: run a viewer component, send it commands, or run the dev relay.

mod app;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use viewer_config_and_utils::{init_logging, Config, Paths};

/// Viewer command bus command-line interface.
#[derive(Parser)]
#[command(name = "viewer-bus")]
#[command(about = "Command-and-control bus for the volume viewer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and logs. Defaults to ~/.viewer-bus
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Relay host. Overrides the config file.
    #[arg(long, global = true)]
    host: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a viewer component until SIGINT/SIGTERM
    Serve {
        /// Instance name (defaults to <role>-<pid>)
        #[arg(long)]
        physical: Option<String>,
    },
    /// Send one command and print its replies
    Send {
        /// Command name, e.g. set_density
        command: String,
        /// First argument
        arg1: Option<String>,
        /// Second argument
        arg2: Option<String>,
        /// Target role (defaults to the configured logical address)
        #[arg(long)]
        to: Option<String>,
        /// Target instance; empty means any instance of the role
        #[arg(long, default_value = "")]
        instance: String,
        /// Seconds to wait for the terminal reply
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Run the development relay
    Relay,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;

    let mut config = Config::load(&paths)?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(host) = cli.host {
        config.relay_host = host;
    }

    init_logging(&config.log_level, Some(&paths.log_file()))?;

    match cli.command {
        Commands::Serve { physical } => {
            if physical.is_some() {
                config.physical_address = physical;
            }
            app::serve(&config)?;
        }
        Commands::Send {
            command,
            arg1,
            arg2,
            to,
            instance,
            timeout,
        } => {
            let request = app::SendRequest {
                to: to.unwrap_or_else(|| config.logical_address.clone()),
                instance,
                command,
                arg1: arg1.unwrap_or_default(),
                arg2: arg2.unwrap_or_default(),
                timeout: timeout
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| config.request_timeout()),
            };
            app::send(&config, request)?;
        }
        Commands::Relay => {
            app::relay(&config)?;
        }
    }

    Ok(())
}
