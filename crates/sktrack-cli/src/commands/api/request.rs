//! Raw request command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Args;

use sktrack_http::{ApiRequest, MultipartForm};

use super::BodyArgs;
use crate::output;
use crate::session::CliContext;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method
    pub method: String,

    /// Path under the API base URL, e.g. /api/orders/
    pub path: String,

    #[command(flatten)]
    pub body: BodyArgs,

    /// Multipart text field (name=value); repeatable
    #[arg(long = "form", value_parser = parse_pair, conflicts_with_all = ["data", "json"])]
    pub fields: Vec<(String, String)>,

    /// Multipart file field (name=path); repeatable
    #[arg(long = "file", value_parser = parse_file, conflicts_with_all = ["data", "json"])]
    pub files: Vec<(String, PathBuf)>,

    /// Query parameter (name=value); repeatable
    #[arg(long = "query", value_parser = parse_pair)]
    pub query: Vec<(String, String)>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{}'", s))
}

fn parse_file(s: &str) -> Result<(String, PathBuf), String> {
    parse_pair(s).map(|(k, v)| (k, PathBuf::from(v)))
}

pub async fn run(args: RequestArgs, ctx: &CliContext) -> Result<()> {
    let method = args
        .method
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| anyhow!("Invalid HTTP method '{}'", args.method))?;

    let mut request = ApiRequest::new(method, args.path.clone());
    for (name, value) in &args.query {
        request = request.query(name, value);
    }

    if !args.fields.is_empty() || !args.files.is_empty() {
        let mut form = MultipartForm::new();
        for (name, value) in &args.fields {
            form = form.text(name, value);
        }
        for (name, path) in &args.files {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.clone());
            form = form.file(name, file_name, bytes, None);
        }
        request = request.multipart(form);
    } else if let Some(body) = args.body.read()? {
        request = request.json(body);
    }

    let response = ctx.client().send(request).await.map_err(|e| ctx.fail(e))?;

    tracing::info!(status = response.status().as_u16(), "Request completed");
    output::body(response.bytes(), args.pretty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs() {
        assert_eq!(
            parse_pair("status=open"),
            Ok(("status".to_string(), "open".to_string()))
        );
        assert_eq!(
            parse_pair("note=a=b"),
            Ok(("note".to_string(), "a=b".to_string()))
        );
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
    }
}
