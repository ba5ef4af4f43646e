//! Session subcommands.

mod login;
mod logout;
mod refresh_token;
mod register;
mod status;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::session::CliContext;

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Exchange email and password for a session
    Login(login::LoginArgs),

    /// Create a new account
    Register(register::RegisterArgs),

    /// Forget the stored session
    Logout(logout::LogoutArgs),

    /// Validate the stored session against the backend
    Status(status::StatusArgs),

    /// Exchange the refresh token for a new access token
    RefreshToken(refresh_token::RefreshTokenArgs),
}

pub async fn handle(cmd: AuthCommand, ctx: &CliContext) -> Result<()> {
    match cmd.command {
        AuthSubcommand::Login(args) => login::run(args, ctx).await,
        AuthSubcommand::Register(args) => register::run(args, ctx).await,
        AuthSubcommand::Logout(args) => logout::run(args, ctx),
        AuthSubcommand::Status(args) => status::run(args, ctx).await,
        AuthSubcommand::RefreshToken(args) => refresh_token::run(args, ctx).await,
    }
}
