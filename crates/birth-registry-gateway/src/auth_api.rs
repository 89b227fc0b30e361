//! Authentication endpoints and the gateway-backed profile fetcher.

use std::sync::Arc;

use async_trait::async_trait;
use birth_registry_auth::{AuthError, ProfileFetcher};
use birth_registry_core::{Role, User};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{ApiError, RequestGateway};

/// User-provided login credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Self-registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Desired username.
    pub username: String,
    /// Account password.
    pub password: String,
}

// Self-registration always creates plain applicant accounts.
#[derive(Serialize)]
struct RegistrationBody<'a> {
    username: &'a str,
    password: &'a str,
    role: Role,
}

/// Body returned by `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    /// Issued bearer token.
    pub access_token: String,
    /// Profile some backends return alongside the token.
    #[serde(default)]
    pub user: Option<Value>,
}

impl LoginResponse {
    /// Embedded user, when present and well-formed.
    pub fn user(&self) -> Option<User> {
        let raw = self.user.clone()?;
        serde_json::from_value::<ProfilePayload>(raw)
            .ok()
            .and_then(|payload| payload.into_user().ok())
    }
}

#[derive(Debug, Deserialize)]
struct ProfilePayload {
    #[serde(alias = "userId")]
    id: i64,
    username: String,
    role: String,
}

impl ProfilePayload {
    fn into_user(self) -> Result<User, ApiError> {
        User::from_raw_role(self.id, self.username, &self.role)
            .map_err(|error| ApiError::Decode(error.to_string()))
    }
}

/// Typed client for `/auth/*` and `/users/{id}`.
#[derive(Clone)]
pub struct AuthApi {
    gateway: Arc<RequestGateway>,
}

impl AuthApi {
    /// Creates the client over a shared gateway.
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    /// Exchanges credentials for a bearer token.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidRequest`] for blank credentials and
    /// [`ApiError::Decode`] when the reply has no token.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        if credentials.username.trim().is_empty() || credentials.password.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "username and password must be non-empty".to_string(),
            ));
        }

        let response: LoginResponse = self.gateway.post("/auth/login", credentials).await?;
        if response.access_token.trim().is_empty() {
            return Err(ApiError::Decode(
                "login response missing access_token".to_string(),
            ));
        }
        Ok(response)
    }

    /// Creates a new applicant account with the `user` role and returns it.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidRequest`] for blank fields; backend
    /// rejections surface as status errors.
    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        if registration.username.trim().is_empty() || registration.password.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "username and password must be non-empty".to_string(),
            ));
        }

        let body = RegistrationBody {
            username: &registration.username,
            password: &registration.password,
            role: Role::User,
        };
        let payload: ProfilePayload = self.gateway.post("/auth/register", &body).await?;
        payload.into_user()
    }

    /// Profile of the token holder (`GET /auth/profile`).
    ///
    /// # Errors
    /// Propagates gateway errors; malformed profiles return
    /// [`ApiError::Decode`].
    pub async fn current_profile(&self) -> Result<User, ApiError> {
        let payload: ProfilePayload = self.gateway.get("/auth/profile").await?;
        payload.into_user()
    }

    /// Profile by user id (`GET /users/{id}`).
    ///
    /// # Errors
    /// See [`AuthApi::current_profile`].
    pub async fn user_by_id(&self, user_id: i64) -> Result<User, ApiError> {
        let payload: ProfilePayload = self.gateway.get(&format!("/users/{user_id}")).await?;
        payload.into_user()
    }

    /// Every account (`GET /users`), for the admin user table.
    ///
    /// # Errors
    /// Propagates gateway errors; any entry with an unknown role fails the
    /// whole listing with [`ApiError::Decode`].
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let payloads: Vec<ProfilePayload> = self.gateway.get("/users").await?;
        payloads.into_iter().map(ProfilePayload::into_user).collect()
    }

    /// Deletes an account (`DELETE /users/{id}`).
    ///
    /// # Errors
    /// Propagates gateway errors.
    pub async fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        debug!(user_id, "deleting user");
        self.gateway.delete(&format!("/users/{user_id}")).await
    }
}

#[async_trait]
impl ProfileFetcher for AuthApi {
    async fn fetch_profile(&self, user_id: i64) -> Result<User, AuthError> {
        debug!(user_id, "fetching profile");
        self.user_by_id(user_id).await.map_err(|error| match error {
            ApiError::Unauthorized => AuthError::Unauthorized,
            ApiError::Decode(message) => AuthError::InvalidResponse(message),
            other => AuthError::Transport(other.to_string()),
        })
    }
}
