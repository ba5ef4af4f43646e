//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use crate::output;
use crate::session::CliContext;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub fn run(_args: LogoutArgs, ctx: &CliContext) -> Result<()> {
    ctx.controller().logout();
    output::success("Logged out");
    Ok(())
}
