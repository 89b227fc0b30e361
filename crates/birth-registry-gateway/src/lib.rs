#![warn(missing_docs)]
//! # birth-registry-gateway
//!
//! ## Purpose
//! HTTP request layer shared by every dashboard API call.
//!
//! ## Responsibilities
//! - Resolve endpoint URLs against the configured API base URL.
//! - Attach the stored bearer token to each outgoing request.
//! - Clear the stored token when the backend answers 401.
//! - Classify failures into the dashboard error taxonomy ([`ErrorCategory`]).
//! - Expose the auth endpoints and the profile fetcher ([`AuthApi`]).
//!
//! ## Data flow
//! Caller -> [`RequestGateway::send`] (bearer header) -> [`HttpTransport`] ->
//! [`HttpResponse`] -> status classification -> JSON decode.
//!
//! ## Ownership and lifetimes
//! Requests and responses own their buffers; the gateway holds `Arc`s to the
//! transport and the token store so clones are cheap to hand to callers.
//!
//! ## Error model
//! All failures are [`ApiError`]. Network failures are never retried.
//!
//! ## Security and privacy notes
//! The 401 cleanup is best-effort: it removes the stored token but does not
//! change session state or navigate. The session manager notices on its next
//! check. Token values are never logged.

mod auth_api;
mod reqwest_transport;

use std::sync::Arc;

use async_trait::async_trait;
use birth_registry_auth::TokenStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub use auth_api::{AuthApi, Credentials, LoginResponse, Registration};
pub use reqwest_transport::ReqwestTransport;

/// HTTP methods used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Fully resolved request handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL.
    pub url: Url,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Optional JSON body.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// First header value matching `name` case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

/// Abstract HTTP transport used by the gateway.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request. Errors only when no response was received.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Token-aware HTTP client for the dashboard backend.
#[derive(Clone)]
pub struct RequestGateway {
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenStore>,
}

impl RequestGateway {
    /// Creates a gateway for `base_url`.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidEndpoint`] when the URL is not an absolute
    /// `http`/`https` URL with a host.
    pub fn new(
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            transport,
            tokens,
        })
    }

    /// Configured API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` (optionally with a query string) under the base URL.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidEndpoint`] when the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|error| ApiError::InvalidEndpoint(format!("invalid endpoint {path}: {error}")))
    }

    /// Sends a request and classifies the response status.
    ///
    /// # Errors
    /// Returns [`ApiError::Unreachable`] when no response arrived,
    /// [`ApiError::Unauthorized`] on 401 (after clearing the stored token),
    /// and the matching status variant for other non-2xx responses.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<HttpResponse, ApiError> {
        let url = self.endpoint(path)?;
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        match self.tokens.load() {
            Ok(Some(token)) => headers.push(("Authorization".to_string(), format!("Bearer {token}"))),
            Ok(None) => {}
            Err(error) => warn!(%error, "token unavailable; sending request without credentials"),
        }

        let response = self
            .transport
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .await
            .inspect_err(|error| warn!(method = method.as_str(), path, %error, "request failed"))?;

        if response.status == 401 {
            match self.tokens.clear() {
                Ok(()) => debug!(path, "401 received; stored token cleared"),
                Err(error) => warn!(path, %error, "401 received; failed to clear stored token"),
            }
            return Err(ApiError::Unauthorized);
        }

        classify_status(response, path)
    }

    /// `GET` returning decoded JSON.
    ///
    /// # Errors
    /// See [`RequestGateway::send`]; decode failures return
    /// [`ApiError::Decode`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        decode_json(self.send(Method::Get, path, None).await?)
    }

    /// `POST` a JSON body and decode the JSON reply.
    ///
    /// # Errors
    /// See [`RequestGateway::get`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_json(body)?;
        decode_json(self.send(Method::Post, path, Some(body)).await?)
    }

    /// `PATCH` a JSON body and decode the JSON reply.
    ///
    /// # Errors
    /// See [`RequestGateway::get`].
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_json(body)?;
        decode_json(self.send(Method::Patch, path, Some(body)).await?)
    }

    /// `DELETE` a resource; any reply body is ignored.
    ///
    /// # Errors
    /// See [`RequestGateway::send`].
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::Delete, path, None).await.map(|_| ())
    }
}

/// Validates the API base URL.
///
/// # Errors
/// Returns [`ApiError::InvalidEndpoint`] for unparsable URLs, schemes other
/// than `http`/`https`, or URLs without a host.
pub fn validate_base_url(raw: &str) -> Result<Url, ApiError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|error| ApiError::InvalidEndpoint(format!("invalid api url: {error}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::InvalidEndpoint(format!(
            "api url must use http or https, got {}",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ApiError::InvalidEndpoint(
            "api url must include a host".to_string(),
        ));
    }

    Ok(parsed)
}

fn classify_status(response: HttpResponse, path: &str) -> Result<HttpResponse, ApiError> {
    match response.status {
        200..=299 => Ok(response),
        403 => Err(ApiError::Forbidden),
        404 => Err(ApiError::NotFound(path.to_string())),
        status => Err(ApiError::Status {
            status,
            message: error_message(&response.body),
        }),
    }
}

fn error_message(body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            match fields.get(key) {
                Some(Value::String(message)) => return message.clone(),
                Some(Value::Array(messages)) => {
                    let joined: Vec<&str> = messages.iter().filter_map(Value::as_str).collect();
                    if !joined.is_empty() {
                        return joined.join("; ");
                    }
                }
                _ => {}
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

fn encode_json<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|error| ApiError::InvalidRequest(format!("body not serializable: {error}")))
}

fn decode_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    let body = if response.body.trim().is_empty() {
        "null"
    } else {
        response.body.as_str()
    };
    serde_json::from_str(body).map_err(|error| ApiError::Decode(error.to_string()))
}

/// Broad failure classes, each with a fixed UI treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No response reachable; show "server unreachable".
    Network,
    /// Bad credentials or invalid token; force logout.
    Authentication,
    /// Authenticated with the wrong role; redirect.
    Authorization,
    /// Malformed or unexpected payload; show empty result plus warning.
    Data,
}

/// Request gateway errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Base URL or joined endpoint is invalid.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// HTTP client could not be constructed.
    #[error("http client setup failed: {0}")]
    ClientSetup(String),
    /// No response reached the client.
    #[error("server unreachable: {0}")]
    Unreachable(String),
    /// Backend answered 401.
    #[error("unauthorized")]
    Unauthorized,
    /// Backend answered 403.
    #[error("forbidden")]
    Forbidden,
    /// Backend answered 404 for the path.
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other non-2xx status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Backend-provided message.
        message: String,
    },
    /// Response body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Taxonomy class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unreachable(_) | Self::ClientSetup(_) => ErrorCategory::Network,
            Self::Unauthorized => ErrorCategory::Authentication,
            Self::Forbidden => ErrorCategory::Authorization,
            Self::InvalidEndpoint(_)
            | Self::InvalidRequest(_)
            | Self::NotFound(_)
            | Self::Status { .. }
            | Self::Decode(_) => ErrorCategory::Data,
        }
    }

    /// Message suitable for direct display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unreachable(_) | Self::ClientSetup(_) => {
                "Unable to reach the server. Please check your connection and try again."
                    .to_string()
            }
            Self::Unauthorized => "Your session is no longer valid. Please log in again.".to_string(),
            Self::Forbidden => "You do not have permission to perform this action.".to_string(),
            Self::Status { message, .. } => message.clone(),
            Self::InvalidRequest(message) => message.clone(),
            Self::InvalidEndpoint(_) | Self::NotFound(_) | Self::Decode(_) => {
                "The server returned an unexpected response.".to_string()
            }
        }
    }
}
