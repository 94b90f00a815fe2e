//! CLI for stringscope — a live control panel for a remote string spectrum model.

mod commands;
mod tui;

use clap::{Parser, Subcommand};
use stringscope_core::{DEFAULT_BASE_URL, DEFAULT_POLL_MS, DEFAULT_TIMEOUT_SECS};

#[derive(Parser)]
#[command(name = "stringscope")]
#[command(about = "stringscope — watch and steer a string spectrum model")]
#[command(version = stringscope_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live interactive control panel (TUI)
    Monitor {
        /// Service root URL
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        url: String,

        /// Refresh interval in milliseconds; also the quiet period after an edit
        #[arg(long, env = "STRINGSCOPE_POLL_MS", default_value_t = DEFAULT_POLL_MS)]
        poll_ms: u64,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_sec: f64,

        /// Write logs to this file (the terminal is busy drawing the panel)
        #[arg(long)]
        log_file: Option<String>,
    },

    /// Run the string-model service
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Fetch the current state once and print it
    State {
        /// Service root URL
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        url: String,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_sec: f64,

        /// Print the raw state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change parameters once: `stringscope set coupling=0.05 topology=K3`
    Set {
        /// Service root URL
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        url: String,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_sec: f64,

        /// Assignments as key=value, keys from `stringscope catalog`
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// List the editable parameters with their ranges and choices
    Catalog,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor {
            url,
            poll_ms,
            timeout_sec,
            log_file,
        } => {
            commands::init_logging(commands::LogTarget::Monitor(log_file.as_deref()));
            commands::monitor::run(commands::panel_config(&url, poll_ms, timeout_sec));
        }
        Commands::Serve { port, host } => {
            commands::init_logging(commands::LogTarget::Console("info"));
            commands::serve::run(&host, port);
        }
        Commands::State {
            url,
            timeout_sec,
            json,
        } => {
            commands::init_logging(commands::LogTarget::Console("warn"));
            commands::state::run(
                &commands::panel_config(&url, DEFAULT_POLL_MS, timeout_sec),
                json,
            );
        }
        Commands::Set {
            url,
            timeout_sec,
            assignments,
        } => {
            commands::init_logging(commands::LogTarget::Console("warn"));
            commands::set::run(
                &commands::panel_config(&url, DEFAULT_POLL_MS, timeout_sec),
                &assignments,
            );
        }
        Commands::Catalog => commands::catalog::run(),
    }
}
