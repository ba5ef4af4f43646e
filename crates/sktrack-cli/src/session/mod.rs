//! Session wiring for CLI commands.

pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use sktrack_core::{ApiError, ApiUrl, AppOrigin, Error};
use sktrack_http::{ApiClient, AuthController, ClientConfig, Navigation};

/// The route the CLI acts as when applying navigation policy.
const CLI_ROUTE: &str = "/dashboard";

/// Everything a command needs: the controller and, through it, the client
/// and token store.
pub struct CliContext {
    controller: AuthController,
}

impl CliContext {
    pub fn open(args: &crate::cli::ConnectionArgs) -> Result<Self> {
        let origin = AppOrigin::new(&args.app_origin).context("Invalid app origin")?;
        let store = storage::open_store(args.cookie_file.clone(), &origin)?;

        let env = args.environment();
        let mut config = ClientConfig::for_environment(env)
            .with_timeout(Duration::from_secs(args.timeout_secs))
            .with_debug_logging(args.debug_http || env.is_development());
        if let Some(url) = &args.api_url {
            config.api_url = ApiUrl::new(url).context("Invalid API URL")?;
        }

        tracing::debug!(api = %config.api_url, %origin, "Using backend");

        let client = ApiClient::new(config, Arc::new(store));
        Ok(Self {
            controller: AuthController::new(client),
        })
    }

    pub fn controller(&self) -> &AuthController {
        &self.controller
    }

    pub fn client(&self) -> &ApiClient {
        self.controller.client()
    }

    /// Apply the session policy to a failed request and turn it into a
    /// message for the user.
    pub fn fail(&self, err: ApiError) -> anyhow::Error {
        let err = Error::from(err);
        match self.controller.handle_error(&err, CLI_ROUTE) {
            Navigation::To(_) => anyhow!("{}. Run 'sktrack auth login' to sign in again.", err),
            Navigation::Stay => describe(&err),
        }
    }
}

fn describe(err: &Error) -> anyhow::Error {
    match err {
        Error::Api(api) if !api.field_errors().is_empty() => {
            anyhow!("{} ({})", api, api.field_errors())
        }
        Error::Api(api) if api.code().is_network() => {
            anyhow!("{}. Check that the backend is reachable.", api)
        }
        other => anyhow!("{}", other),
    }
}
