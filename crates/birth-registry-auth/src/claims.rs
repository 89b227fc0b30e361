//! Unverified bearer-token claim decoding.
//!
//! The signature segment is ignored: decoded claims only drive UX decisions
//! (expiry pre-check, redirect hints). The backend remains the authority.

use birth_registry_core::{Role, User};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Claims the dashboard reads from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (user id), when present and numeric.
    pub subject: Option<i64>,
    /// Username embedded by the issuer.
    pub username: Option<String>,
    /// Raw role claim embedded by the issuer.
    pub role: Option<String>,
    /// Expiry as Unix epoch seconds, when the issuer set one.
    pub expires_at_secs: Option<u64>,
}

impl TokenClaims {
    /// Returns `true` when the token has expired at `now_ms`.
    ///
    /// A token without `exp` never expires client-side.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_secs
            .is_some_and(|exp| exp.saturating_mul(1000) <= now_ms)
    }

    /// Minimal user built purely from embedded claims.
    ///
    /// Requires a subject and a non-blank username. A missing role claim
    /// means `user`; an unrecognized one yields `None`.
    pub fn embedded_user(&self) -> Option<User> {
        let id = self.subject?;
        let username = self.username.as_deref()?.trim();
        if username.is_empty() {
            return None;
        }
        let role = match self.role.as_deref() {
            Some(raw) => Role::parse(raw).ok()?,
            None => Role::User,
        };

        Some(User {
            id,
            username: username.to_string(),
            role,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    exp: Option<Value>,
}

fn advisory_validation() -> Validation {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation
}

/// Decodes the claims of a `header.payload.signature` token.
///
/// The signature is not checked and no claim is required; expiry is left to
/// the caller through [`TokenClaims::is_expired`].
///
/// # Errors
/// Returns [`DecodeError`] when the token is not a well-formed JWT or its
/// payload is not a JSON claims object.
pub fn decode_claims(token: &str) -> Result<TokenClaims, DecodeError> {
    let data = decode::<RawClaims>(
        token.trim(),
        &DecodingKey::from_secret(&[]),
        &advisory_validation(),
    )?;
    let raw = data.claims;

    Ok(TokenClaims {
        subject: raw.sub.as_ref().and_then(numeric_claim),
        username: raw.username,
        role: raw.role,
        expires_at_secs: raw
            .exp
            .as_ref()
            .and_then(numeric_claim)
            .and_then(|value| u64::try_from(value).ok()),
    })
}

fn numeric_claim(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Claim decoding failure.
#[derive(Debug, Error)]
#[error("undecodable token: {0}")]
pub struct DecodeError(#[from] jsonwebtoken::errors::Error);

impl DecodeError {
    /// Underlying `jsonwebtoken` error kind.
    pub fn kind(&self) -> &jsonwebtoken::errors::ErrorKind {
        self.0.kind()
    }
}
