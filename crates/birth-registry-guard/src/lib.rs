#![warn(missing_docs)]
//! # birth-registry-guard
//!
//! ## Purpose
//! Decides, per navigation and per session change, whether a protected page
//! may render or must redirect.
//!
//! ## Responsibilities
//! - Pure render/redirect decision over session state, current route and the
//!   route's allowed roles ([`decide`]).
//! - Reactive guard that re-runs the decision on every session change
//!   ([`RouteGuard`]).
//! - Router that re-validates the stored token before guarded navigation and
//!   looks up the static [`RoutePolicy`] ([`Router`]).
//!
//! ## Data flow
//! [`SessionManager`] watch channel -> [`RouteGuard::next_change`] ->
//! [`decide`] -> [`Navigator::navigate`] on redirect.
//!
//! ## Error model
//! No errors: every combination maps to loading, render, render-nothing or
//! a redirect.
//!
//! ## Security and privacy notes
//! Guard decisions rely on client-decoded claims and are UX only; protected
//! data is authorized again by the backend.

use std::sync::Arc;

use birth_registry_auth::{SessionManager, SessionState};
use birth_registry_core::{Navigator, RoleSet, Route, RouteAccess, RoutePolicy};
use tokio::sync::watch;
use tracing::debug;

/// Outcome of one guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still initializing; show a loading indicator only.
    Loading,
    /// Render the protected subtree.
    Render,
    /// Render nothing and move to the route.
    Redirect(Route),
    /// Render nothing; already at the redirect target.
    Deny,
}

impl GuardDecision {
    /// Returns `true` when protected content may be shown.
    pub fn renders_content(&self) -> bool {
        matches!(self, Self::Render)
    }
}

/// Evaluates the guard for one session snapshot.
///
/// Pure and idempotent: identical inputs always give the identical decision.
pub fn decide(state: &SessionState, current: &Route, required: Option<RoleSet>) -> GuardDecision {
    match state {
        SessionState::Initializing => GuardDecision::Loading,
        SessionState::Unauthenticated => redirect_unless_at(current, Route::login()),
        SessionState::Authenticated(user) => match required {
            Some(roles) if !roles.contains(user.role) => {
                redirect_unless_at(current, user.role.guard_home())
            }
            _ => GuardDecision::Render,
        },
    }
}

fn redirect_unless_at(current: &Route, target: Route) -> GuardDecision {
    if current.path() == target.path() {
        GuardDecision::Deny
    } else {
        GuardDecision::Redirect(target)
    }
}

/// Guard bound to one protected subtree.
pub struct RouteGuard {
    session: watch::Receiver<SessionState>,
    required: Option<RoleSet>,
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    /// Creates a guard requiring `required` roles (or any session if `None`).
    pub fn new(
        session: &SessionManager,
        required: Option<RoleSet>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            session: session.subscribe(),
            required,
            navigator,
        }
    }

    /// Decision for the current session and route, without side effects.
    pub fn evaluate(&self) -> GuardDecision {
        let current = self.navigator.current();
        decide(&self.session.borrow(), &current, self.required)
    }

    /// Evaluates and performs the redirect, if any.
    pub fn enforce(&self) -> GuardDecision {
        let decision = self.evaluate();
        if let GuardDecision::Redirect(target) = &decision {
            debug!(%target, "route guard redirect");
            self.navigator.navigate(target);
        }
        decision
    }

    /// Waits for the next session change and enforces the guard again.
    ///
    /// Returns `None` once the session manager is gone.
    pub async fn next_change(&mut self) -> Option<GuardDecision> {
        self.session.changed().await.ok()?;
        Some(self.enforce())
    }
}

/// Applies the static route policy on navigation.
pub struct Router {
    session: Arc<SessionManager>,
    policy: RoutePolicy,
    navigator: Arc<dyn Navigator>,
}

impl Router {
    /// Creates a router over `policy`.
    pub fn new(
        session: Arc<SessionManager>,
        policy: RoutePolicy,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            session,
            policy,
            navigator,
        }
    }

    /// Navigates to `to` and runs the guard for it.
    ///
    /// Protected routes first re-validate the stored token, so a token that
    /// was cleared or expired since the last render forces a login redirect
    /// here rather than on the page already shown.
    pub fn navigate(&self, to: Route, now_ms: u64) -> GuardDecision {
        self.navigator.navigate(&to);

        let decision = match self.policy.access(&to) {
            RouteAccess::Public => GuardDecision::Render,
            RouteAccess::Protected { roles } => {
                let state = self.session.revalidate(now_ms);
                decide(&state, &to, roles)
            }
        };

        if let GuardDecision::Redirect(target) = &decision {
            debug!(from = %to, %target, "navigation redirected");
            self.navigator.navigate(target);
        }
        decision
    }

    /// Reactive guard for a protected route; `None` for public routes.
    pub fn guard_for(&self, route: &Route) -> Option<RouteGuard> {
        match self.policy.access(route) {
            RouteAccess::Public => None,
            RouteAccess::Protected { roles } => Some(RouteGuard::new(
                &self.session,
                roles,
                self.navigator.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for guard decisions.

    use birth_registry_core::{Role, User};

    use super::*;

    fn authenticated(role: Role) -> SessionState {
        SessionState::Authenticated(User {
            id: 1,
            username: "fixture".to_string(),
            role,
        })
    }

    #[test]
    fn loading_never_redirects() {
        let decision = decide(
            &SessionState::Initializing,
            &Route::new("/admin"),
            Some(RoleSet::of(&[Role::Admin])),
        );
        assert_eq!(decision, GuardDecision::Loading);
    }

    #[test]
    fn unauthenticated_redirects_to_login_except_on_login() {
        let state = SessionState::Unauthenticated;
        assert_eq!(
            decide(&state, &Route::new("/dashboard"), None),
            GuardDecision::Redirect(Route::login())
        );
        assert_eq!(decide(&state, &Route::login(), None), GuardDecision::Deny);
    }

    #[test]
    fn registrar_on_admin_route_goes_to_user_home() {
        let decision = decide(
            &authenticated(Role::Registrar),
            &Route::new("/admin/users"),
            Some(RoleSet::of(&[Role::Admin])),
        );
        assert_eq!(decision, GuardDecision::Redirect(Route::new("/dashboard")));
        assert!(!decision.renders_content());
    }

    #[test]
    fn admin_on_user_route_goes_to_admin_home() {
        let decision = decide(
            &authenticated(Role::Admin),
            &Route::new("/dashboard"),
            Some(RoleSet::of(&[Role::User])),
        );
        assert_eq!(decision, GuardDecision::Redirect(Route::new("/admin")));
    }

    #[test]
    fn mismatch_at_own_home_renders_nothing_without_looping() {
        let decision = decide(
            &authenticated(Role::Registrar),
            &Route::new("/dashboard"),
            Some(RoleSet::of(&[Role::User])),
        );
        assert_eq!(decision, GuardDecision::Deny);
    }

    #[test]
    fn missing_role_requirement_renders_for_any_session() {
        for role in [Role::User, Role::Admin, Role::Registrar] {
            assert_eq!(
                decide(&authenticated(role), &Route::new("/settings"), None),
                GuardDecision::Render
            );
        }
    }
}
