#![warn(missing_docs)]
//! # birth-registry-app binary
//!
//! Headless entry point: restores the persisted session and reports where
//! the dashboard would land.

use std::process::ExitCode;

use birth_registry_app::{App, AppConfig, app_version, init_tracing, now_ms};
use birth_registry_auth::SessionState;
use birth_registry_core::Route;
use tracing::{error, info};

/// CLI entry point.
#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        version = app_version(),
        api = %config.api_base_url,
        state_dir = %config.state_dir.display(),
        "birth-registry-app starting"
    );

    let app = match App::from_config(config) {
        Ok(app) => app,
        Err(error) => {
            error!(%error, "failed to build runtime");
            return ExitCode::FAILURE;
        }
    };

    let target = match app.start(now_ms()).await {
        SessionState::Authenticated(user) => {
            println!("signed in as {} ({})", user.username, user.role);
            user.role.landing_route()
        }
        _ => {
            println!("not signed in");
            Route::login()
        }
    };

    let decision = app.navigate(target.clone(), now_ms());
    println!("{target}: {decision:?}");
    ExitCode::SUCCESS
}
