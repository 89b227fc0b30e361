#![warn(missing_docs)]
//! # birth-registry-auth
//!
//! ## Purpose
//! Implements the client-side authentication session lifecycle for the
//! `birth-registry` dashboard.
//!
//! ## Responsibilities
//! - Persist the single bearer token ([`TokenStore`]).
//! - Decode token claims without signature verification ([`decode_claims`]).
//! - Own the reactive session state and its login/logout/initialize
//!   transitions ([`SessionManager`]).
//!
//! ## Data flow
//! Startup -> [`SessionManager::initialize`] reads [`TokenStore`] -> decodes
//! [`TokenClaims`] -> checks expiry -> [`ProfileFetcher::fetch_profile`] ->
//! [`SessionState::Authenticated`]. Route guards observe the state through
//! [`SessionManager::subscribe`].
//!
//! ## Ownership and lifetimes
//! The session manager is a single owned instance shared by `Arc`; session
//! snapshots are cloned out of the watch channel so observers never hold a
//! borrow across await points.
//!
//! ## Error model
//! Every restore failure ends in [`SessionState::Unauthenticated`] with the
//! stored token cleared. Login never fails hard: an unresolved profile yields
//! [`LoginOutcome::ProfileUnavailable`] with a user-visible warning.
//!
//! ## Security and privacy notes
//! Claims decoding is advisory only; the backend re-validates every request.
//! Token values are never logged, only their [`token_fingerprint`].
//!
//! ## Example
//! ```rust
//! use birth_registry_auth::{MemoryTokenStore, TokenStore};
//!
//! let store = MemoryTokenStore::new();
//! store.save("header.payload.sig").unwrap();
//! assert_eq!(store.load().unwrap().as_deref(), Some("header.payload.sig"));
//! ```

mod claims;
mod session;
mod token_store;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub use claims::{DecodeError, TokenClaims, decode_claims};
pub use session::{
    LoginOutcome, PROFILE_UNAVAILABLE_WARNING, ProfileFetcher, SessionManager, SessionState,
    UserSource,
};
pub use token_store::{
    FileTokenStore, MemoryTokenStore, TOKEN_STORAGE_KEY, TokenStore, TokenStoreError,
};

/// Short log-safe identifier for a token value.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

/// Errors produced while restoring or resolving a session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token is stored.
    #[error("no stored token")]
    MissingToken,
    /// Token expiry is at or before the current time.
    #[error("token expired")]
    Expired,
    /// Token carries no usable subject id.
    #[error("token has no subject")]
    MissingSubject,
    /// Backend rejected the credential.
    #[error("unauthorized")]
    Unauthorized,
    /// Profile lookup could not reach or use the backend.
    #[error("auth transport failure: {0}")]
    Transport(String),
    /// Backend response violated the profile contract.
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),
    /// Token claims could not be decoded.
    #[error("token decode failure: {0}")]
    Decode(#[from] DecodeError),
    /// Token persistence failed.
    #[error("token storage failure: {0}")]
    Storage(#[from] TokenStoreError),
}

impl AuthError {
    /// Returns `false` only when there is nothing stored to clean up.
    pub fn clears_token(&self) -> bool {
        !matches!(self, Self::MissingToken)
    }
}
