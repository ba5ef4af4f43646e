//! Status command implementation.

use anyhow::{Result, bail};
use clap::Args;

use sktrack_http::{RouteDecision, SessionStatus};

use crate::output;
use crate::session::CliContext;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Route to check access for
    #[arg(long, default_value = "/dashboard")]
    pub route: String,
}

pub async fn run(args: StatusArgs, ctx: &CliContext) -> Result<()> {
    let controller = ctx.controller();
    let status = controller.validate(&args.route).await;
    let decision = controller.guard(&args.route);

    let status_label = match status {
        SessionStatus::Skipped => "public route, not checked",
        SessionStatus::Authenticated => "authenticated",
        SessionStatus::Unauthenticated => "not logged in",
        SessionStatus::Unverified => "stored, backend unreachable",
    };
    let decision_label = match decision {
        RouteDecision::Allow => "allow",
        RouteDecision::Pending => "pending",
        RouteDecision::RedirectToLogin => "redirect to /login",
    };

    output::field("Session", status_label);
    output::field("Route", &format!("{} ({})", args.route, decision_label));

    match status {
        SessionStatus::Unauthenticated => {
            bail!("No active session. Run 'sktrack auth login' first.")
        }
        SessionStatus::Unverified => {
            output::warning("Could not reach the backend to verify the session");
            Ok(())
        }
        _ => Ok(()),
    }
}
