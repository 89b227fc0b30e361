#![warn(missing_docs)]
//! # birth-registry-app
//!
//! ## Purpose
//! Wires session, routing, gateway and records together for the birth
//! registration dashboard.
//!
//! ## Responsibilities
//! - Resolve configuration and build the shared runtime objects once.
//! - Drive sign-in, sign-out and guarded navigation.
//! - Start the record poller for the signed-in user.
//! - Provide log initialization and redaction helpers.
//!
//! ## Data flow
//! [`AppConfig`] -> token store + transport -> `RequestGateway` ->
//! `AuthApi`/`RecordsClient`; `AuthApi` -> `SessionManager` -> `Router`.
//!
//! ## Ownership and lifetimes
//! Every component is behind an `Arc` owned by [`App`]; the gateway and the
//! session manager share one token store so a 401 observed by the gateway is
//! visible to the session on its next re-validation.
//!
//! ## Error model
//! Construction and request failures are wrapped in [`AppError`]. Session
//! transitions never fail; they report outcomes instead.
//!
//! ## Security and privacy notes
//! - Tokens are only logged as fingerprints.
//! - [`redact_sensitive`] strips credentials from free-form log text.
//! - Plain-HTTP API URLs outside loopback produce a startup warning.

mod config;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use birth_registry_auth::{
    FileTokenStore, LoginOutcome, SessionManager, SessionState, TokenStore,
};
use birth_registry_core::{HistoryNavigator, Navigator, Route, RoutePolicy, User};
use birth_registry_gateway::{
    ApiError, AuthApi, Credentials, HttpTransport, Registration, RequestGateway, ReqwestTransport,
};
use birth_registry_guard::{GuardDecision, Router};
use birth_registry_records::{PollHandle, RecordsClient, RecordsError, spawn_poller};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub use config::{
    API_URL_ENV, AppConfig, DEFAULT_API_URL, DEFAULT_POLL_INTERVAL, DEFAULT_STATE_DIR,
    POLL_INTERVAL_ENV, REQUEST_TIMEOUT, STATE_DIR_ENV, is_https_endpoint,
};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("BIRTH_REGISTRY_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}

/// Installs the global `tracing` subscriber.
///
/// Honors `RUST_LOG` and defaults to `info`. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        debug!("tracing subscriber already installed");
    }
}

const SENSITIVE_KEYS: [&str; 4] = ["password", "token", "authorization", "bearer"];

/// Redacts everything from the first secret marker onward.
pub fn redact_sensitive(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let first = SENSITIVE_KEYS
        .iter()
        .filter_map(|key| lower.find(key).map(|position| (position, *key)))
        .min_by_key(|(position, _)| *position);

    match first {
        Some((position, key)) => format!("{}{key}=<redacted>", &input[..position]),
        None => input.to_string(),
    }
}

/// Dashboard runtime: one instance per signed-in window.
pub struct App {
    config: AppConfig,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    gateway: Arc<RequestGateway>,
    auth_api: Arc<AuthApi>,
    session: Arc<SessionManager>,
    router: Router,
    records: Arc<RecordsClient>,
}

impl App {
    /// Builds the runtime over injected transport, token store and navigator.
    ///
    /// # Errors
    /// Returns [`AppError::Api`] when the configured base URL is rejected.
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, AppError> {
        let gateway = Arc::new(RequestGateway::new(
            config.api_base_url.as_str(),
            transport,
            tokens.clone(),
        )?);
        let auth_api = Arc::new(AuthApi::new(gateway.clone()));
        let session = Arc::new(SessionManager::new(
            tokens.clone(),
            auth_api.clone(),
            navigator.clone(),
        ));
        let router = Router::new(session.clone(), RoutePolicy::standard(), navigator.clone());
        let records = Arc::new(RecordsClient::new(gateway.clone()));

        Ok(Self {
            config,
            tokens,
            navigator,
            gateway,
            auth_api,
            session,
            router,
            records,
        })
    }

    /// Builds the production runtime: file token store, `reqwest` transport
    /// and an in-process navigator starting at the login page.
    ///
    /// # Errors
    /// Returns [`AppError::Api`] when the HTTP client cannot be built.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.state_dir));
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(REQUEST_TIMEOUT)?);
        let navigator: Arc<dyn Navigator> = Arc::new(HistoryNavigator::new(Route::login()));
        Self::new(config, transport, tokens, navigator)
    }

    /// Restores any persisted session.
    pub async fn start(&self, now_ms: u64) -> SessionState {
        info!(version = APP_VERSION, api = %self.config.api_base_url, "starting session");
        self.session.initialize(now_ms).await
    }

    /// Exchanges credentials for a token and logs the session in.
    ///
    /// # Errors
    /// Returns [`AppError::Api`] when the login request itself fails; a
    /// token without a resolvable user is reported through the outcome.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<LoginOutcome, AppError> {
        let response = self.auth_api.login(credentials).await?;
        let user = response.user();
        Ok(self.session.login(&response.access_token, user).await)
    }

    /// Logs the session out and returns to the login page.
    pub fn sign_out(&self) {
        self.session.logout();
    }

    /// Navigates through the route guard.
    pub fn navigate(&self, to: Route, now_ms: u64) -> GuardDecision {
        self.router.navigate(to, now_ms)
    }

    /// Creates a new applicant account; the caller signs in afterwards.
    ///
    /// # Errors
    /// See [`AuthApi::register`].
    pub async fn register(&self, registration: &Registration) -> Result<User, AppError> {
        Ok(self.auth_api.register(registration).await?)
    }

    /// Fresh profile of the token holder.
    ///
    /// # Errors
    /// See [`AuthApi::current_profile`].
    pub async fn current_profile(&self) -> Result<User, AppError> {
        Ok(self.auth_api.current_profile().await?)
    }

    /// Starts refreshing the signed-in user's records; `None` when signed out.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start_record_poller(&self) -> Option<PollHandle> {
        let user = self.session.current_user()?;
        Some(spawn_poller(
            self.records.clone(),
            user,
            self.config.poll_interval,
        ))
    }

    /// Resolved configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shared token store.
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Navigation sink.
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Shared request gateway.
    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }

    /// Session manager.
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Guarded router.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Records client.
    pub fn records(&self) -> &Arc<RecordsClient> {
        &self.records
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
    /// Gateway or authentication endpoint error.
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    /// Records client error.
    #[error("records error: {0}")]
    Records(#[from] RecordsError),
}

impl AppError {
    /// Message suitable for display next to a form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(message) => message.clone(),
            Self::Api(error) => error.user_message(),
            Self::Records(RecordsError::Api(error)) => error.user_message(),
            Self::Records(other) => other.to_string(),
        }
    }
}
