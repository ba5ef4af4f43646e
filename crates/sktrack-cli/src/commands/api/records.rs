//! Collection record commands.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use sktrack_core::Collection;

use super::{BodyArgs, parse_collection};
use crate::output;
use crate::session::CliContext;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Collection (orders, skeleton, releases, waitlists)
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    /// Record id
    pub id: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    #[command(flatten)]
    pub body: BodyArgs,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    /// Record id
    pub id: String,

    #[command(flatten)]
    pub body: BodyArgs,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[arg(value_parser = parse_collection)]
    pub collection: Collection,

    /// Record id
    pub id: String,

    #[command(flatten)]
    pub body: BodyArgs,
}

pub async fn list(args: ListArgs, ctx: &CliContext) -> Result<()> {
    let records = ctx
        .client()
        .list(args.collection)
        .await
        .map_err(|e| ctx.fail(e))?;

    if records.is_empty() {
        eprintln!("{}", "No records found.".dimmed());
        return Ok(());
    }

    for record in &records {
        output::json(record, args.pretty)?;
    }
    Ok(())
}

pub async fn get(args: GetArgs, ctx: &CliContext) -> Result<()> {
    let record = ctx
        .client()
        .get(args.collection, &args.id)
        .await
        .map_err(|e| ctx.fail(e))?;
    output::json(&record, args.pretty)
}

pub async fn create(args: CreateArgs, ctx: &CliContext) -> Result<()> {
    let body = args.body.require()?;
    let record = ctx
        .client()
        .create(args.collection, body)
        .await
        .map_err(|e| ctx.fail(e))?;

    output::success(&format!("Created record in {}", args.collection));
    output::json(&record, false)
}

pub async fn update(args: UpdateArgs, ctx: &CliContext) -> Result<()> {
    let changes = args.body.require()?;
    let record = ctx
        .client()
        .update(args.collection, &args.id, changes)
        .await
        .map_err(|e| ctx.fail(e))?;

    output::success(&format!("Updated {} {}", args.collection, args.id));
    output::json(&record, false)
}

pub async fn delete(args: DeleteArgs, ctx: &CliContext) -> Result<()> {
    ctx.client()
        .remove(args.collection, &args.id, args.body.read()?)
        .await
        .map_err(|e| ctx.fail(e))?;

    output::success(&format!("Deleted {} {}", args.collection, args.id));
    Ok(())
}
