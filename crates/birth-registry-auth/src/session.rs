//! Session manager: the single source of truth for who is logged in.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use birth_registry_core::{Navigator, Route, User};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::claims::decode_claims;
use crate::token_store::TokenStore;
use crate::{AuthError, token_fingerprint};

/// Warning surfaced when a token was stored but no user could be resolved.
pub const PROFILE_UNAVAILABLE_WARNING: &str =
    "Login succeeded, but your profile could not be loaded. Please try again.";

/// Resolves a subject id to the canonical user profile.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Fetches the profile for `user_id`.
    async fn fetch_profile(&self, user_id: i64) -> Result<User, AuthError>;
}

/// Reactive session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Token is being read/decoded/resolved.
    Initializing,
    /// A user is logged in.
    Authenticated(User),
    /// No usable session.
    Unauthenticated,
}

impl SessionState {
    /// Logged-in user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Returns `true` while initialization is in progress.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Initializing)
    }
}

/// Where a logged-in user record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSource {
    /// Passed in by the caller of [`SessionManager::login`].
    Supplied,
    /// Returned by the [`ProfileFetcher`].
    Profile,
    /// Synthesized from issuer-embedded token claims after a failed fetch.
    TokenClaims,
}

/// Result of [`SessionManager::login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Session is authenticated and the navigator moved to `landing`.
    Authenticated {
        /// Resolved user.
        user: User,
        /// How the user was resolved.
        source: UserSource,
        /// Role landing route navigated to.
        landing: Route,
    },
    /// Token was stored but no user could be resolved; session stays
    /// unauthenticated.
    ProfileUnavailable {
        /// User-visible warning text.
        warning: String,
    },
    /// A later logout/login/initialize overtook this login.
    Superseded,
}

/// Owns the token lifecycle and the authenticated-user state.
///
/// Every transition bumps an epoch. Async work captures the epoch it started
/// under and only applies its result if no newer transition happened, so a
/// logout during an in-flight profile fetch is never undone.
///
/// Redirects are issued under the same epoch check, so a login redirect can
/// never land after the logout that superseded it. Navigator implementations
/// must not call back into the session manager.
pub struct SessionManager {
    tokens: Arc<dyn TokenStore>,
    profiles: Arc<dyn ProfileFetcher>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
    navigation: Mutex<()>,
}

impl SessionManager {
    /// Creates a manager in [`SessionState::Initializing`].
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        profiles: Arc<dyn ProfileFetcher>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            tokens,
            profiles,
            navigator,
            state,
            epoch: AtomicU64::new(0),
            navigation: Mutex::new(()),
        }
    }

    /// Subscribes to session changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Currently authenticated user.
    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    /// Restores the session from the stored token.
    ///
    /// Re-enters [`SessionState::Initializing`] and resolves to either
    /// authenticated or unauthenticated. Any failure clears the stored token;
    /// there is no retry.
    pub async fn initialize(&self, now_ms: u64) -> SessionState {
        let epoch = self.begin();
        self.state.send_replace(SessionState::Initializing);

        match self.restore(now_ms).await {
            Ok(user) => {
                info!(user_id = user.id, role = %user.role, "session restored");
                self.settle(epoch, SessionState::Authenticated(user), false);
            }
            Err(error) => {
                debug!(reason = %error, "session restore failed");
                self.settle(epoch, SessionState::Unauthenticated, error.clears_token());
            }
        }

        self.state()
    }

    async fn restore(&self, now_ms: u64) -> Result<User, AuthError> {
        let token = self.tokens.load()?.ok_or(AuthError::MissingToken)?;
        let claims = decode_claims(&token)?;
        if claims.is_expired(now_ms) {
            return Err(AuthError::Expired);
        }
        let subject = claims.subject.ok_or(AuthError::MissingSubject)?;
        self.profiles.fetch_profile(subject).await
    }

    /// Logs in with an issued token, optionally with an already known user.
    ///
    /// The token is persisted first and is not rolled back if the user
    /// cannot be resolved.
    pub async fn login(&self, token: &str, user: Option<User>) -> LoginOutcome {
        let epoch = self.begin();
        let fingerprint = token_fingerprint(token);
        if let Err(error) = self.tokens.save(token) {
            warn!(token = %fingerprint, %error, "failed to persist token");
        }

        let resolved = match user {
            Some(user) => Some((user, UserSource::Supplied)),
            None => self.resolve_login_user(token).await,
        };

        let Some((user, source)) = resolved else {
            if !self.settle(epoch, SessionState::Unauthenticated, false) {
                return LoginOutcome::Superseded;
            }
            warn!(token = %fingerprint, "login stored token but no profile resolved");
            return LoginOutcome::ProfileUnavailable {
                warning: PROFILE_UNAVAILABLE_WARNING.to_string(),
            };
        };

        if !self.settle(epoch, SessionState::Authenticated(user.clone()), false) {
            debug!(token = %fingerprint, "login result discarded");
            return LoginOutcome::Superseded;
        }

        let landing = user.role.landing_route();
        if !self.navigate_if_current(epoch, &landing) {
            debug!(token = %fingerprint, "login redirect superseded");
            return LoginOutcome::Superseded;
        }
        info!(user_id = user.id, role = %user.role, ?source, %landing, "login complete");
        LoginOutcome::Authenticated {
            user,
            source,
            landing,
        }
    }

    // Unlike `restore`, a failed fetch here may fall back to claims the
    // issuer embedded in the token.
    async fn resolve_login_user(&self, token: &str) -> Option<(User, UserSource)> {
        let claims = match decode_claims(token) {
            Ok(claims) => claims,
            Err(error) => {
                warn!(%error, "login token could not be decoded");
                return None;
            }
        };
        let subject = claims.subject?;

        match self.profiles.fetch_profile(subject).await {
            Ok(user) => Some((user, UserSource::Profile)),
            Err(error) => {
                warn!(user_id = subject, %error, "profile fetch failed during login");
                claims
                    .embedded_user()
                    .map(|user| (user, UserSource::TokenClaims))
            }
        }
    }

    /// Clears the token, drops the session and navigates to login.
    pub fn logout(&self) {
        let epoch = self.begin();
        self.clear_token();
        self.state.send_replace(SessionState::Unauthenticated);
        self.navigate_if_current(epoch, &Route::login());
        info!("session logged out");
    }

    /// Re-checks the stored token of an authenticated session without I/O.
    ///
    /// Picks up tokens cleared behind the session's back (for example by the
    /// request gateway on a 401) as well as tokens that expired since login.
    pub fn revalidate(&self, now_ms: u64) -> SessionState {
        if self.current_user().is_none() {
            return self.state();
        }

        let failure = match self.tokens.load() {
            Ok(Some(token)) => match decode_claims(&token) {
                Ok(claims) if claims.is_expired(now_ms) => Some(AuthError::Expired),
                Ok(_) => None,
                Err(error) => Some(AuthError::Decode(error)),
            },
            Ok(None) => Some(AuthError::MissingToken),
            Err(error) => Some(AuthError::Storage(error)),
        };

        if let Some(error) = failure {
            info!(reason = %error, "stored token no longer valid; session dropped");
            let epoch = self.begin();
            self.settle(epoch, SessionState::Unauthenticated, error.clears_token());
        }
        self.state()
    }

    fn begin(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Navigates only if `epoch` is still the latest transition.
    fn navigate_if_current(&self, epoch: u64, route: &Route) -> bool {
        let _serialized = self
            .navigation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        self.navigator.navigate(route);
        true
    }

    /// Applies `next` only if `epoch` is still the latest transition.
    fn settle(&self, epoch: u64, next: SessionState, clear_token: bool) -> bool {
        self.state.send_if_modified(|current| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            if clear_token {
                self.clear_token();
            }
            *current = next;
            true
        })
    }

    fn clear_token(&self) {
        if let Err(error) = self.tokens.clear() {
            warn!(%error, "failed to clear stored token");
        }
    }
}
