//! Records, certificates and verification endpoints.

use std::sync::Arc;

use birth_registry_core::{Role, User};
use birth_registry_gateway::{ApiError, RequestGateway};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    BirthRecord, BlockchainVerification, Certificate, NewBirthRecord, RecordStatus, RecordsError,
    TransactionDetails,
};

/// Endpoint shapes tried when listing records, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStrategy {
    /// `GET /birth-records/my-records`: records submitted by the caller.
    MyRecords,
    /// `GET /birth-records`: the records the backend lets the caller see.
    AllRecords,
    /// `GET /admin/birth-records`: the reviewer listing.
    AdminRecords,
}

impl ListStrategy {
    /// Request path for this strategy.
    pub fn path(self) -> &'static str {
        match self {
            Self::MyRecords => "/birth-records/my-records",
            Self::AllRecords => "/birth-records",
            Self::AdminRecords => "/admin/birth-records",
        }
    }
}

const REVIEWER_STRATEGIES: &[ListStrategy] =
    &[ListStrategy::AllRecords, ListStrategy::AdminRecords];
const APPLICANT_STRATEGIES: &[ListStrategy] =
    &[ListStrategy::MyRecords, ListStrategy::AllRecords];

/// Ordered listing strategies for `role`.
///
/// Applicants start from their own records, reviewers from the full list.
/// The next strategy is only tried when the previous one answers 404 or a
/// body that is not a list.
pub fn strategies_for(role: Role) -> &'static [ListStrategy] {
    match role {
        Role::Admin | Role::Registrar => REVIEWER_STRATEGIES,
        Role::User => APPLICANT_STRATEGIES,
    }
}

/// Records shown in a table plus any non-blocking warning.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordListing {
    /// Decoded records.
    pub records: Vec<BirthRecord>,
    /// Strategy that produced the list.
    pub source: Option<ListStrategy>,
    /// Warning to display next to the (possibly empty) list.
    pub warning: Option<String>,
}

impl RecordListing {
    fn degraded(warning: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            source: None,
            warning: Some(warning.into()),
        }
    }
}

/// Typed client for record review and certificate endpoints.
#[derive(Clone)]
pub struct RecordsClient {
    gateway: Arc<RequestGateway>,
}

impl RecordsClient {
    /// Creates the client over a shared gateway.
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    /// Lists the records visible to `user`.
    ///
    /// # Errors
    /// Network, authentication and authorization failures are returned as
    /// errors. Data problems (unexpected shapes, server-side failures) yield
    /// an empty listing with a warning instead.
    pub async fn list_for(&self, user: &User) -> Result<RecordListing, RecordsError> {
        for &strategy in strategies_for(user.role) {
            let body = match self.gateway.get::<Value>(strategy.path()).await {
                Ok(body) => body,
                Err(ApiError::NotFound(_)) => {
                    debug!(?strategy, "listing endpoint missing; trying next strategy");
                    continue;
                }
                Err(error @ (ApiError::Status { .. } | ApiError::Decode(_))) => {
                    warn!(?strategy, %error, "record listing degraded to empty");
                    return Ok(RecordListing::degraded(error.user_message()));
                }
                Err(error) => return Err(RecordsError::Api(error)),
            };

            match record_items(body) {
                Some(items) => return Ok(decode_listing(items, strategy)),
                None => debug!(?strategy, "listing body is not a list; trying next strategy"),
            }
        }

        warn!(role = %user.role, "no listing strategy returned records");
        Ok(RecordListing::degraded("Records could not be loaded."))
    }

    /// Fetches one record.
    ///
    /// # Errors
    /// Propagates gateway errors.
    pub async fn record(&self, id: i64) -> Result<BirthRecord, RecordsError> {
        Ok(self.gateway.get(&format!("/birth-records/{id}")).await?)
    }

    /// Submits a new application.
    ///
    /// # Errors
    /// Returns [`RecordsError::Invalid`] before any request when validation
    /// fails; otherwise propagates gateway errors.
    pub async fn submit(&self, application: &NewBirthRecord) -> Result<BirthRecord, RecordsError> {
        application.validate()?;
        Ok(self.gateway.post("/birth-records", application).await?)
    }

    /// Marks a record verified.
    ///
    /// # Errors
    /// Propagates gateway errors.
    pub async fn verify(&self, id: i64) -> Result<BirthRecord, RecordsError> {
        self.review(id, "verify").await
    }

    /// Rejects a record.
    ///
    /// # Errors
    /// Propagates gateway errors.
    pub async fn reject(&self, id: i64) -> Result<BirthRecord, RecordsError> {
        self.review(id, "reject").await
    }

    /// Applies a reviewer decision given as a status.
    ///
    /// # Errors
    /// Returns [`RecordsError::Invalid`] for anything other than verified or
    /// rejected; otherwise propagates gateway errors.
    pub async fn update_status(
        &self,
        id: i64,
        status: &RecordStatus,
    ) -> Result<BirthRecord, RecordsError> {
        match status {
            RecordStatus::Verified => self.verify(id).await,
            RecordStatus::Rejected => self.reject(id).await,
            other => Err(RecordsError::Invalid(format!(
                "unsupported status {other}; use verified or rejected"
            ))),
        }
    }

    async fn review(&self, id: i64, action: &str) -> Result<BirthRecord, RecordsError> {
        debug!(id, action, "submitting review decision");
        Ok(self
            .gateway
            .patch(&format!("/birth-records/{id}/{action}"), &json!({}))
            .await?)
    }

    /// Issues a certificate for a verified or already sent record.
    ///
    /// # Errors
    /// Returns [`RecordsError::NotCertifiable`] without a request for any
    /// other status.
    pub async fn issue_certificate(&self, record: &BirthRecord) -> Result<Certificate, RecordsError> {
        if !record.status.is_certifiable() {
            return Err(RecordsError::NotCertifiable {
                id: record.id,
                status: record.status.clone(),
            });
        }
        Ok(self
            .gateway
            .post("/certificates", &json!({ "recordId": record.id }))
            .await?)
    }

    /// Certificates visible to the caller: their own for applicants, all of
    /// them for administrators.
    ///
    /// # Errors
    /// Propagates gateway errors.
    pub async fn certificates(&self) -> Result<Vec<Certificate>, RecordsError> {
        Ok(self.gateway.get("/certificates").await?)
    }

    /// Fetches a certificate.
    ///
    /// # Errors
    /// Propagates gateway errors.
    pub async fn certificate(&self, id: i64) -> Result<Certificate, RecordsError> {
        Ok(self.gateway.get(&format!("/certificates/{id}")).await?)
    }

    /// Deletes a certificate.
    ///
    /// # Errors
    /// Propagates gateway errors.
    pub async fn delete_certificate(&self, id: i64) -> Result<(), RecordsError> {
        Ok(self.gateway.delete(&format!("/certificates/{id}")).await?)
    }

    /// Checks a certificate against the blockchain verification endpoint.
    ///
    /// # Errors
    /// Propagates gateway errors.
    pub async fn verify_certificate(
        &self,
        certificate_id: i64,
    ) -> Result<BlockchainVerification, RecordsError> {
        Ok(self
            .gateway
            .get(&format!("/blockchain/verify/{certificate_id}"))
            .await?)
    }

    /// Looks up an anchoring transaction.
    ///
    /// # Errors
    /// Returns [`RecordsError::Invalid`] without a request when `tx_hash`
    /// is blank or not alphanumeric; otherwise propagates gateway errors.
    pub async fn transaction(&self, tx_hash: &str) -> Result<TransactionDetails, RecordsError> {
        let tx_hash = tx_hash.trim();
        if tx_hash.is_empty() || !tx_hash.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(RecordsError::Invalid(format!(
                "malformed transaction hash {tx_hash:?}"
            )));
        }
        Ok(self
            .gateway
            .get(&format!("/blockchain/tx/{tx_hash}"))
            .await?)
    }
}

// Accepts a bare array or an envelope with a `data`/`records` array.
fn record_items(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(mut fields) => ["data", "records"]
            .into_iter()
            .find_map(|key| match fields.remove(key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }),
        _ => None,
    }
}

fn decode_listing(items: Vec<Value>, strategy: ListStrategy) -> RecordListing {
    let total = items.len();
    let records: Vec<BirthRecord> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    let skipped = total - records.len();
    let warning = (skipped > 0).then(|| {
        warn!(?strategy, skipped, "malformed records skipped");
        format!("{skipped} record(s) could not be displayed.")
    });

    RecordListing {
        records,
        source: Some(strategy),
        warning,
    }
}
