#![warn(missing_docs)]
//! # birth-registry-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `birth-registry` workspace.
//!
//! ## Responsibilities
//! - Represent users and their lower-case normalized roles.
//! - Describe navigational routes, role landing pages, and the static route
//!   policy consulted by the route guard.
//! - Provide the [`Navigator`] seam used by session and guard code to move
//!   between routes.
//!
//! ## Data flow
//! Backend profile JSON -> [`User`] (role normalized by [`Role::parse`]) ->
//! session state. Route guard looks up [`RoutePolicy::access`] for the
//! current [`Route`] and asks the [`Navigator`] to redirect when needed.
//!
//! ## Ownership and lifetimes
//! Users and routes own their strings so session snapshots can be cloned
//! into watchers without borrowing from transient response buffers.
//!
//! ## Error model
//! Unknown role strings return [`CoreError::UnknownRole`]; callers treat that
//! as a malformed-data error.
//!
//! ## Example
//! ```rust
//! use birth_registry_core::{Role, RoutePolicy, Route};
//!
//! assert_eq!(Role::parse("ADMIN").unwrap(), Role::Admin);
//! let policy = RoutePolicy::standard();
//! assert!(policy.access(&Route::new("/login")).is_public());
//! ```

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Login page path.
pub const LOGIN_PATH: &str = "/login";
/// Registration page path.
pub const REGISTER_PATH: &str = "/register";
/// Default landing page for plain users.
pub const USER_HOME_PATH: &str = "/dashboard";
/// Landing page for administrators.
pub const ADMIN_HOME_PATH: &str = "/admin";
/// Landing page for registrars.
pub const REGISTRAR_HOME_PATH: &str = "/registrar";
/// Public marketing page.
pub const PUBLIC_HOME_PATH: &str = "/";

/// Account role. Always stored lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Applicant submitting birth records.
    User,
    /// Administrator with full review rights.
    Admin,
    /// Registrar reviewing and approving records.
    Registrar,
}

impl Role {
    /// Parses a role string case-insensitively.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownRole`] for anything outside
    /// `user`/`admin`/`registrar`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "registrar" => Ok(Self::Registrar),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }

    /// Canonical lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Registrar => "registrar",
        }
    }

    /// Route a freshly logged-in user lands on.
    pub fn landing_route(self) -> Route {
        match self {
            Self::Admin => Route::new(ADMIN_HOME_PATH),
            Self::Registrar => Route::new(REGISTRAR_HOME_PATH),
            Self::User => Route::new(USER_HOME_PATH),
        }
    }

    /// Route the guard sends a user to after a role mismatch.
    ///
    /// Only administrators have a dedicated fallback; every other role goes
    /// to the default user home.
    pub fn guard_home(self) -> Route {
        match self {
            Self::Admin => Route::new(ADMIN_HOME_PATH),
            Self::User | Self::Registrar => Route::new(USER_HOME_PATH),
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::User => 0b001,
            Self::Admin => 0b010,
            Self::Registrar => 0b100,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Role::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Compact set of roles allowed to view a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    /// Builds a set from a role slice.
    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0;
        let mut index = 0;
        while index < roles.len() {
            bits |= match roles[index] {
                Role::User => 0b001,
                Role::Admin => 0b010,
                Role::Registrar => 0b100,
            };
            index += 1;
        }
        Self(bits)
    }

    /// Returns `true` when `role` is a member.
    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    /// Returns `true` when no role is allowed.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Authenticated account profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user id (token subject).
    pub id: i64,
    /// Display/login name.
    pub username: String,
    /// Normalized role.
    pub role: Role,
}

impl User {
    /// Builds a user from a raw role string, normalizing its case.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownRole`] when the role is not recognized.
    pub fn from_raw_role(
        id: i64,
        username: impl Into<String>,
        role: &str,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            id,
            username: username.into(),
            role: Role::parse(role)?,
        })
    }
}

/// Navigational route path such as `/dashboard`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route(String);

impl Route {
    /// Creates a route from a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Login route.
    pub fn login() -> Self {
        Self::new(LOGIN_PATH)
    }

    /// Route path without query string.
    pub fn path(&self) -> &str {
        self.0.split(['?', '#']).next().unwrap_or_default()
    }

    /// Returns `true` for the login route.
    pub fn is_login(&self) -> bool {
        self.path() == LOGIN_PATH
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access requirement for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Reachable without a session.
    Public,
    /// Requires a session; `roles` narrows to specific roles when present.
    Protected {
        /// Allowed roles, or `None` for any authenticated user.
        roles: Option<RoleSet>,
    },
}

impl RouteAccess {
    /// Returns `true` for public routes.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }

    /// Required role set for protected routes.
    pub fn required_roles(&self) -> Option<RoleSet> {
        match self {
            Self::Public => None,
            Self::Protected { roles } => *roles,
        }
    }
}

/// One row of the static route table.
///
/// A pattern ending in `/*` matches the prefix and everything below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    /// Exact path or `prefix/*` pattern.
    pub pattern: &'static str,
    /// Access requirement.
    pub access: RouteAccess,
}

impl RouteRule {
    fn matches(&self, path: &str) -> bool {
        match self.pattern.strip_suffix("/*") {
            Some(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            None => self.pattern == path,
        }
    }
}

const USER_ONLY: RoleSet = RoleSet::of(&[Role::User]);
const ADMIN_ONLY: RoleSet = RoleSet::of(&[Role::Admin]);
const USER_OR_ADMIN: RoleSet = RoleSet::of(&[Role::User, Role::Admin]);
const REVIEWERS: RoleSet = RoleSet::of(&[Role::Admin, Role::Registrar]);

const fn restricted(pattern: &'static str, roles: RoleSet) -> RouteRule {
    RouteRule {
        pattern,
        access: RouteAccess::Protected { roles: Some(roles) },
    }
}

const fn public(pattern: &'static str) -> RouteRule {
    RouteRule {
        pattern,
        access: RouteAccess::Public,
    }
}

// Exact list pages precede their `/*` detail rules.
const STANDARD_RULES: &[RouteRule] = &[
    public(PUBLIC_HOME_PATH),
    public(LOGIN_PATH),
    public(REGISTER_PATH),
    restricted(USER_HOME_PATH, USER_ONLY),
    restricted("/dashboard/submit", USER_ONLY),
    restricted("/dashboard/records", USER_ONLY),
    restricted("/dashboard/records/*", USER_OR_ADMIN),
    restricted("/dashboard/certificates", USER_ONLY),
    restricted("/dashboard/certificates/*", USER_OR_ADMIN),
    restricted(ADMIN_HOME_PATH, REVIEWERS),
    restricted("/admin/birth-records", REVIEWERS),
    restricted("/admin/users", ADMIN_ONLY),
    restricted("/admin/certificates", ADMIN_ONLY),
    restricted(REGISTRAR_HOME_PATH, REVIEWERS),
];

/// Static mapping from routes to access requirements.
///
/// The table is consulted read-only; first matching rule wins and unlisted
/// routes require an authenticated session with no role restriction.
#[derive(Debug, Clone, Copy)]
pub struct RoutePolicy {
    rules: &'static [RouteRule],
}

impl RoutePolicy {
    /// Dashboard route table.
    pub fn standard() -> Self {
        Self {
            rules: STANDARD_RULES,
        }
    }

    /// Builds a policy over a caller-provided static table.
    pub const fn from_rules(rules: &'static [RouteRule]) -> Self {
        Self { rules }
    }

    /// Resolves access for `route`.
    pub fn access(&self, route: &Route) -> RouteAccess {
        let path = route.path();
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(|rule| rule.access)
            .unwrap_or(RouteAccess::Protected { roles: None })
    }
}

/// Navigation seam used to redirect between routes.
pub trait Navigator: Send + Sync {
    /// Moves to `route`.
    fn navigate(&self, route: &Route);
    /// Currently displayed route.
    fn current(&self) -> Route;
}

/// In-process navigator keeping the visited route history.
#[derive(Debug)]
pub struct HistoryNavigator {
    history: Mutex<Vec<Route>>,
}

impl HistoryNavigator {
    /// Starts at `initial`.
    pub fn new(initial: Route) -> Self {
        Self {
            history: Mutex::new(vec![initial]),
        }
    }

    /// Snapshot of every visited route, oldest first.
    pub fn history(&self) -> Vec<Route> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Route>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, route: &Route) {
        let mut history = self.lock();
        if history.last() != Some(route) {
            history.push(route.clone());
        }
    }

    fn current(&self) -> Route {
        self.lock().last().cloned().unwrap_or_else(Route::login)
    }
}

/// Core model errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Role string outside the supported set.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for role normalization and route policy lookup.

    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(Role::parse(" Registrar ").expect("role"), Role::Registrar);
        assert_eq!(Role::parse("USER").expect("role"), Role::User);
        assert!(matches!(
            Role::parse("superuser"),
            Err(CoreError::UnknownRole(name)) if name == "superuser"
        ));
    }

    #[test]
    fn user_json_role_is_normalized() {
        let user: User =
            serde_json::from_str(r#"{"id":7,"username":"alice","role":"USER"}"#).expect("user");
        assert_eq!(user.role, Role::User);
        let encoded = serde_json::to_string(&user).expect("encode");
        assert!(encoded.contains(r#""role":"user""#));
    }

    #[test]
    fn policy_matches_exact_and_prefix_rules() {
        let policy = RoutePolicy::standard();
        assert!(policy.access(&Route::new("/")).is_public());

        let users = policy.access(&Route::new("/admin/users?page=2"));
        let roles = users.required_roles().expect("admin roles");
        assert!(roles.contains(Role::Admin));
        assert!(!roles.contains(Role::Registrar));

        let list = policy.access(&Route::new("/dashboard/records"));
        assert!(!list.required_roles().expect("list roles").contains(Role::Admin));
        let detail = policy.access(&Route::new("/dashboard/records/12"));
        assert!(detail.required_roles().expect("detail roles").contains(Role::Admin));

        // `/dashboard/recordsets` must not match the `/dashboard/records/*` prefix.
        assert_eq!(
            policy.access(&Route::new("/dashboard/recordsets")),
            RouteAccess::Protected { roles: None }
        );
    }

    #[test]
    fn landing_and_guard_homes_differ_for_registrar() {
        assert_eq!(Role::Registrar.landing_route().path(), REGISTRAR_HOME_PATH);
        assert_eq!(Role::Registrar.guard_home().path(), USER_HOME_PATH);
        assert_eq!(Role::Admin.guard_home().path(), ADMIN_HOME_PATH);
    }

    #[test]
    fn history_navigator_skips_duplicate_pushes() {
        let navigator = HistoryNavigator::new(Route::new("/dashboard"));
        navigator.navigate(&Route::new("/dashboard"));
        navigator.navigate(&Route::login());
        assert_eq!(navigator.history().len(), 2);
        assert!(navigator.current().is_login());
    }
}
