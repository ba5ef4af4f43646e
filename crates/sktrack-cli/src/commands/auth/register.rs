//! Account registration command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use sktrack_core::Registration;

use crate::output;
use crate::session::CliContext;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Email for the new account
    #[arg(long)]
    pub email: String,

    /// Password for the new account
    #[arg(long, env = "SKTRACK_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Repeat the password; defaults to --password
    #[arg(long)]
    pub confirm_password: Option<String>,
}

pub async fn run(args: RegisterArgs, ctx: &CliContext) -> Result<()> {
    let confirm = args
        .confirm_password
        .unwrap_or_else(|| args.password.clone());
    let registration =
        Registration::new(args.email, args.password, confirm).context("Invalid registration")?;

    eprintln!("{}", "Registering...".dimmed());

    ctx.controller().register(&registration).await?;

    output::success("Registration successful");
    output::field("Email", registration.email());
    eprintln!(
        "{}",
        format!(
            "Log in with: sktrack auth login --email {}",
            registration.email()
        )
        .dimmed()
    );
    Ok(())
}
