//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use sktrack_core::Credentials;
use sktrack_http::Navigation;

use crate::output;
use crate::session::CliContext;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "SKTRACK_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, ctx: &CliContext) -> Result<()> {
    let credentials = Credentials::new(args.email, args.password).context("Invalid credentials")?;

    eprintln!("{}", "Logging in...".dimmed());

    let navigation = ctx.controller().login(&credentials).await?;

    output::success("Logged in successfully");
    println!();
    output::field("Email", credentials.email());
    output::field("API", ctx.client().config().api_url.as_str());
    if let Navigation::To(route) = navigation {
        output::field("Next", &route);
    }

    Ok(())
}
