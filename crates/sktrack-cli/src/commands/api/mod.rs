//! API subcommands.

mod records;
mod request;

use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use serde_json::Value;

use sktrack_core::Collection;

use crate::session::CliContext;

#[derive(Args, Debug)]
pub struct ApiCommand {
    #[command(subcommand)]
    pub command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ApiSubcommand {
    /// Send an arbitrary request
    Request(request::RequestArgs),

    /// List the records in a collection
    List(records::ListArgs),

    /// Fetch a single record
    Get(records::GetArgs),

    /// Create a record
    Create(records::CreateArgs),

    /// Update fields of a record
    Update(records::UpdateArgs),

    /// Delete a record
    Delete(records::DeleteArgs),
}

pub async fn handle(cmd: ApiCommand, ctx: &CliContext) -> Result<()> {
    match cmd.command {
        ApiSubcommand::Request(args) => request::run(args, ctx).await,
        ApiSubcommand::List(args) => records::list(args, ctx).await,
        ApiSubcommand::Get(args) => records::get(args, ctx).await,
        ApiSubcommand::Create(args) => records::create(args, ctx).await,
        ApiSubcommand::Update(args) => records::update(args, ctx).await,
        ApiSubcommand::Delete(args) => records::delete(args, ctx).await,
    }
}

/// Parse a collection name such as `orders`.
fn parse_collection(name: &str) -> Result<Collection, String> {
    Collection::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = Collection::ALL.iter().map(|c| c.name()).collect();
        format!("unknown collection '{}' (expected one of: {})", name, known.join(", "))
    })
}

/// A JSON body given inline or read from a file (`-` for stdin).
#[derive(Args, Debug, Default)]
pub struct BodyArgs {
    /// Inline JSON body
    #[arg(long, conflicts_with = "json")]
    pub data: Option<String>,

    /// JSON file with the body (use - for stdin)
    #[arg(long)]
    pub json: Option<String>,
}

impl BodyArgs {
    fn read(&self) -> Result<Option<Value>> {
        let raw = match (&self.data, &self.json) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) if path == "-" => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read from stdin")?;
                buf
            }
            (None, Some(path)) => {
                std::fs::read_to_string(path).context("Failed to read JSON file")?
            }
            (None, None) => return Ok(None),
        };
        let value = serde_json::from_str(&raw).context("Invalid JSON body")?;
        Ok(Some(value))
    }

    fn require(&self) -> Result<Value> {
        match self.read()? {
            Some(value) => Ok(value),
            None => bail!("A body is required: pass --data or --json"),
        }
    }
}
