//! Refresh token command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::output;
use crate::session::CliContext;

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(_args: RefreshTokenArgs, ctx: &CliContext) -> Result<()> {
    eprintln!("{}", "Refreshing access token...".dimmed());

    ctx.client()
        .refresh_access_token(None)
        .await
        .context("Failed to refresh session. Run 'sktrack auth login' to sign in again")?;

    output::success("Access token refreshed");
    Ok(())
}
