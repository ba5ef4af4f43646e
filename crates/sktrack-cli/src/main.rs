//! sktrack - Command line client for the sktrack dashboard API.
//!
//! A thin wrapper over `sktrack-http`, useful for poking at the backend
//! with the same session handling the dashboard uses.

mod cli;
mod commands;
mod output;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{api, auth};
use session::CliContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.json_logs, cli.connection.debug_http);

    let ctx = CliContext::open(&cli.connection)?;

    match cli.command {
        Commands::Auth(cmd) => auth::handle(cmd, &ctx).await,
        Commands::Api(cmd) => api::handle(cmd, &ctx).await,
    }
}

fn init_logging(verbosity: u8, json: bool, debug_http: bool) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let directives = if debug_http && verbosity < 2 {
        format!("{},sktrack_http=debug", level)
    } else {
        level.to_string()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
