//! Shared fixtures for app integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use birth_registry_app::{App, AppConfig};
use birth_registry_auth::{MemoryTokenStore, TokenStore};
use birth_registry_core::{HistoryNavigator, Route};
use birth_registry_gateway::{ApiError, HttpRequest, HttpResponse, HttpTransport};
use serde_json::{Value, json};
use tokio::sync::Notify;

/// Fixed "now" for every test, in Unix milliseconds.
pub const NOW_MS: u64 = 1_700_000_000_000;

/// Expiry one hour after [`NOW_MS`], in seconds.
#[allow(dead_code)]
pub const IN_ONE_HOUR: u64 = NOW_MS / 1_000 + 3_600;

/// Expiry one hour before [`NOW_MS`], in seconds.
#[allow(dead_code)]
pub const ONE_HOUR_AGO: u64 = NOW_MS / 1_000 - 3_600;

/// Builds an unsigned three-segment token carrying `claims`.
pub fn token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Token for `sub` expiring at `exp` with no embedded profile.
#[allow(dead_code)]
pub fn bare_token(sub: i64, exp: u64) -> String {
    token(json!({ "sub": sub, "exp": exp }))
}

/// `/users/{id}` body for a profile.
#[allow(dead_code)]
pub fn profile(id: i64, username: &str, role: &str) -> String {
    json!({ "id": id, "username": username, "role": role }).to_string()
}

/// Backend double: fixed replies keyed by path+query suffix, plus one
/// optional gated route that blocks until released.
#[derive(Default)]
pub struct Backend {
    routes: Mutex<Vec<(String, u16, String)>>,
    requests: Mutex<Vec<HttpRequest>>,
    gate: Mutex<Option<String>>,
    reached: Notify,
    release: Notify,
}

#[allow(dead_code)]
impl Backend {
    /// Replies `status`/`body` to every request ending with `suffix`.
    /// Later registrations take precedence.
    pub fn on(&self, suffix: &str, status: u16, body: impl Into<String>) -> &Self {
        self.routes
            .lock()
            .expect("routes lock")
            .push((suffix.to_string(), status, body.into()));
        self
    }

    /// Holds requests ending with `suffix` until [`Backend::release`].
    pub fn gate(&self, suffix: &str) {
        *self.gate.lock().expect("gate lock") = Some(suffix.to_string());
    }

    /// Waits until a gated request is in flight.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    /// Lets the gated request answer.
    pub fn release(&self) {
        self.release.notify_one();
    }

    /// Paths requested so far, with query.
    pub fn requested(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(target)
            .collect()
    }

    /// Every recorded request.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

fn target(request: &HttpRequest) -> String {
    match request.url.query() {
        Some(query) => format!("{}?{query}", request.url.path()),
        None => request.url.path().to_string(),
    }
}

#[async_trait]
impl HttpTransport for Backend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let path = target(&request);
        self.requests.lock().expect("requests lock").push(request);

        let gated = self
            .gate
            .lock()
            .expect("gate lock")
            .as_deref()
            .is_some_and(|suffix| path.ends_with(suffix));
        if gated {
            self.reached.notify_one();
            self.release.notified().await;
        }

        let reply = self
            .routes
            .lock()
            .expect("routes lock")
            .iter()
            .rev()
            .find(|(suffix, _, _)| path.ends_with(suffix.as_str()))
            .map(|(_, status, body)| (*status, body.clone()));
        let (status, body) = reply.unwrap_or((404, String::new()));
        Ok(HttpResponse { status, body })
    }
}

/// App wired to in-memory doubles, navigator starting at the login page.
pub struct Harness {
    pub app: App,
    pub backend: Arc<Backend>,
    pub tokens: Arc<MemoryTokenStore>,
    pub navigator: Arc<HistoryNavigator>,
}

#[allow(dead_code)]
impl Harness {
    /// Currently stored token.
    pub fn stored_token(&self) -> Option<String> {
        self.tokens.load().expect("memory store never fails")
    }

    /// Every route the navigator visited.
    pub fn visited(&self) -> Vec<String> {
        self.navigator
            .history()
            .iter()
            .map(|route| route.path().to_string())
            .collect()
    }
}

/// Builds a harness, optionally with a token already stored.
pub fn harness(stored: Option<&str>) -> Harness {
    let backend = Arc::new(Backend::default());
    let tokens = Arc::new(match stored {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    });
    let navigator = Arc::new(HistoryNavigator::new(Route::login()));
    let config = AppConfig::from_lookup(|_| None).expect("fallback config");
    let app = App::new(config, backend.clone(), tokens.clone(), navigator.clone())
        .expect("app should build");

    Harness {
        app,
        backend,
        tokens,
        navigator,
    }
}
