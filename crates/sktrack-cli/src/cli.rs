//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use sktrack_core::Environment;

use crate::commands::api::ApiCommand;
use crate::commands::auth::AuthCommand;

/// Command line client for the sktrack dashboard API.
#[derive(Parser, Debug)]
#[command(name = "sktrack")]
#[command(author, version = env!("SKTRACK_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to talk to and where to keep the session.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Backend base URL, overriding the environment default
    #[arg(long, env = "SKTRACK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Backend environment (development or production)
    #[arg(long = "env", env = "SKTRACK_ENV", global = true)]
    pub environment: Option<Environment>,

    /// Shorthand for --env production
    #[arg(long, global = true, conflicts_with = "environment")]
    pub production: bool,

    /// Origin the session cookies are scoped to
    #[arg(
        long,
        env = "SKTRACK_APP_ORIGIN",
        default_value = "http://localhost:3000",
        global = true
    )]
    pub app_origin: String,

    /// Cookie jar file (defaults to the user data directory)
    #[arg(long, env = "SKTRACK_COOKIE_FILE", global = true)]
    pub cookie_file: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 15, global = true)]
    pub timeout_secs: u64,

    /// Log sanitized request and response metadata
    #[arg(long, global = true)]
    pub debug_http: bool,
}

impl ConnectionArgs {
    pub fn environment(&self) -> Environment {
        if self.production {
            Environment::Production
        } else {
            self.environment.unwrap_or_else(Environment::from_build)
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Login, logout and session inspection
    Auth(AuthCommand),

    /// Requests against the dashboard API
    Api(ApiCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn production_flag_wins() {
        let cli = Cli::try_parse_from(["sktrack", "--production", "auth", "logout"]).unwrap();
        assert_eq!(cli.connection.environment(), Environment::Production);
    }

    #[test]
    fn env_flag_parses() {
        let cli =
            Cli::try_parse_from(["sktrack", "--env", "dev", "api", "list", "orders"]).unwrap();
        assert_eq!(cli.connection.environment(), Environment::Development);
    }
}
