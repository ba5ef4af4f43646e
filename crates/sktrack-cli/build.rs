//! Stamps `--version` with the commit and the API environment baked in.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=SKTRACK_ENV");

    let package = env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let environment = build_environment();

    let version = match short_commit() {
        Some(commit) => format!("{} ({}, {} API)", package, commit, environment),
        None => format!("{} ({} API)", package, environment),
    };
    println!("cargo:rustc-env=SKTRACK_VERSION={}", version);
}

/// Mirrors `Environment::from_build` in sktrack-core.
fn build_environment() -> &'static str {
    let requested = env::var("SKTRACK_ENV")
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match requested.as_str() {
        "production" | "prod" => "production",
        "development" | "dev" | "local" => "development",
        _ if env::var("PROFILE").as_deref() == Ok("release") => "production",
        _ => "development",
    }
}

fn short_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8(output.stdout).ok()?;
    let commit = commit.trim();
    (!commit.is_empty()).then(|| commit.to_string())
}
