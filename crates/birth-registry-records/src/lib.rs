#![warn(missing_docs)]
//! # birth-registry-records
//!
//! ## Purpose
//! Typed client for birth records, certificates and certificate
//! verification, plus the background record poller.
//!
//! ## Responsibilities
//! - Model birth records and certificates as the backend returns them.
//! - Normalize free-form status strings into [`RecordStatus`].
//! - List records through an explicit, ordered set of endpoint strategies.
//! - Refresh the visible record list on a fixed interval.
//!
//! ## Data flow
//! [`RecordsClient`] -> `RequestGateway` -> JSON -> [`BirthRecord`] ->
//! [`filter_by_status`]/[`count_by_status`] for dashboard views.
//!
//! ## Error model
//! Request failures return [`RecordsError`]. Listing is lenient: malformed
//! payloads become an empty listing with a warning instead of an error.
//!
//! ## Security and privacy notes
//! Certificate verification results come from the backend's blockchain
//! endpoint and are displayed as-is; nothing is verified locally.

mod client;
mod poller;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

pub use client::{ListStrategy, RecordListing, RecordsClient, strategies_for};
pub use poller::{PollHandle, spawn_poller};

/// Review status of a birth record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecordStatus {
    /// Submitted and awaiting review.
    #[default]
    Pending,
    /// Verified by a registrar or admin and anchored on chain.
    Verified,
    /// Rejected by a registrar or admin.
    Rejected,
    /// Certificate already sent to the applicant.
    Sent,
    /// Unrecognized status, preserved lower-case.
    Unknown(String),
}

impl RecordStatus {
    /// Normalizes a backend status string.
    ///
    /// Case and surrounding whitespace are ignored; `-`, `_` and spaces are
    /// treated alike.
    /// Blank input counts as pending.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|ch| match ch {
                '-' | ' ' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "" | "pending" | "submitted" | "under_review" | "in_review" => Self::Pending,
            "verified" | "approved" | "certified" => Self::Verified,
            "rejected" | "declined" | "denied" => Self::Rejected,
            "sent" => Self::Sent,
            _ => Self::Unknown(normalized),
        }
    }

    /// Canonical lower-case name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Sent => "sent",
            Self::Unknown(raw) => raw.as_str(),
        }
    }

    /// Returns `true` when a certificate may be issued for the record.
    pub fn is_certifiable(&self) -> bool {
        matches!(self, Self::Verified | Self::Sent)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RecordStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::parse(raw.as_deref().unwrap_or_default()))
    }
}

/// Child's sex as recorded on the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    /// `MALE`.
    #[default]
    Male,
    /// `FEMALE`.
    Female,
}

/// Submitting account as embedded in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOwner {
    /// Account id.
    pub id: i64,
    /// Account name, when the backend includes it.
    #[serde(default)]
    pub username: Option<String>,
}

/// Birth record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthRecord {
    /// Record id.
    pub id: i64,
    /// Child's first name.
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    /// Child's middle name.
    #[serde(default, alias = "middleName")]
    pub middle_name: Option<String>,
    /// Child's last name.
    #[serde(default, alias = "lastName")]
    pub last_name: String,
    /// Date of birth (`YYYY-MM-DD`).
    #[serde(default, alias = "dateOfBirth")]
    pub date_of_birth: String,
    /// Child's sex; absent on partial payloads.
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Place of birth.
    #[serde(default, alias = "placeOfBirth")]
    pub place_of_birth: String,
    /// Mother's full name.
    #[serde(default, alias = "motherFullName")]
    pub mother_full_name: String,
    /// Father's full name.
    #[serde(default, alias = "fatherFullName")]
    pub father_full_name: String,
    /// Normalized review status.
    #[serde(default)]
    pub status: RecordStatus,
    /// Content hash anchored on verification.
    #[serde(default)]
    pub hash: Option<String>,
    /// Anchoring transaction hash.
    #[serde(default, alias = "blockchainTx")]
    pub blockchain_tx: Option<String>,
    /// Submitting account.
    #[serde(default)]
    pub user: Option<RecordOwner>,
    /// Certificates issued for this record.
    #[serde(default)]
    pub certificates: Vec<Certificate>,
}

impl BirthRecord {
    /// Child's name as shown in tables, skipping a blank middle name.
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Returns `true` when `user_id` submitted the record.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user.as_ref().is_some_and(|owner| owner.id == user_id)
    }
}

/// Birth-record application submitted by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBirthRecord {
    /// Child's first name.
    pub first_name: String,
    /// Child's middle name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    /// Child's last name.
    pub last_name: String,
    /// Date of birth (`YYYY-MM-DD`).
    pub date_of_birth: String,
    /// Child's sex.
    pub gender: Gender,
    /// Place of birth.
    pub place_of_birth: String,
    /// Mother's full name.
    pub mother_full_name: String,
    /// Father's full name.
    pub father_full_name: String,
}

impl NewBirthRecord {
    /// Checks required fields before submission.
    ///
    /// # Errors
    /// Returns [`RecordsError::Invalid`] naming the first blank field or a
    /// date that is not `YYYY-MM-DD`.
    pub fn validate(&self) -> Result<(), RecordsError> {
        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("date_of_birth", &self.date_of_birth),
            ("place_of_birth", &self.place_of_birth),
            ("mother_full_name", &self.mother_full_name),
            ("father_full_name", &self.father_full_name),
        ] {
            if value.trim().is_empty() {
                return Err(RecordsError::Invalid(format!("{field} is required")));
            }
        }

        if !is_iso_date(self.date_of_birth.trim()) {
            return Err(RecordsError::Invalid(
                "date_of_birth must be YYYY-MM-DD".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_iso_date(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split('-').collect();
    let [year, month, day] = parts[..] else {
        return false;
    };
    let numeric =
        |part: &str, len: usize| part.len() == len && part.bytes().all(|b| b.is_ascii_digit());
    if !(numeric(year, 4) && numeric(month, 2) && numeric(day, 2)) {
        return false;
    }
    matches!(month.parse::<u8>(), Ok(1..=12)) && matches!(day.parse::<u8>(), Ok(1..=31))
}

/// Certificate issued for a verified record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Certificate id.
    pub id: i64,
    /// Human-facing certificate number.
    #[serde(default, alias = "certificateNumber")]
    pub certificate_number: String,
    /// Issue timestamp as sent by the backend.
    #[serde(default, alias = "issuedAt")]
    pub issued_at: Option<String>,
    /// Download link for the rendered certificate.
    #[serde(default, alias = "pdfUrl")]
    pub pdf_url: Option<String>,
    /// Anchoring transaction hash.
    #[serde(default, alias = "blockchainTx")]
    pub blockchain_tx: Option<String>,
    /// Child's first name.
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    /// Source record: either its id or the embedded record.
    #[serde(default, alias = "birthRecord")]
    pub birth_record: Option<Value>,
    /// Verification flag last reported by the backend.
    #[serde(default, alias = "isVerified")]
    pub is_verified: Option<bool>,
}

impl Certificate {
    /// Id of the source record, whichever shape the backend sent.
    pub fn record_id(&self) -> Option<i64> {
        match self.birth_record.as_ref()? {
            Value::Number(id) => id.as_i64(),
            Value::Object(record) => record.get("id").and_then(Value::as_i64),
            _ => None,
        }
    }
}

/// Result of `GET /blockchain/verify/{certificateId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainVerification {
    /// Whether the anchored hash matches the certificate.
    #[serde(alias = "isValid")]
    pub is_valid: bool,
    /// Anchoring time as sent by the backend.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Block holding the anchoring transaction.
    #[serde(default, alias = "blockNumber")]
    pub block_number: Option<u64>,
    /// Anchoring transaction hash.
    #[serde(default, alias = "transactionHash")]
    pub transaction_hash: Option<String>,
}

/// Result of `GET /blockchain/tx/{hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetails {
    /// Ledger status string.
    pub status: String,
    /// Height of the including block.
    #[serde(default, alias = "blockHeight")]
    pub block_height: Option<u64>,
}

/// Per-status totals for dashboard summary cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    /// Pending records.
    pub pending: usize,
    /// Verified records.
    pub verified: usize,
    /// Rejected records.
    pub rejected: usize,
    /// Records whose certificate was sent.
    pub sent: usize,
    /// Records with an unrecognized status.
    pub unknown: usize,
}

/// Records whose status equals `status`.
pub fn filter_by_status(records: &[BirthRecord], status: &RecordStatus) -> Vec<BirthRecord> {
    records
        .iter()
        .filter(|record| &record.status == status)
        .cloned()
        .collect()
}

/// Counts records per status.
pub fn count_by_status(records: &[BirthRecord]) -> StatusCounts {
    records
        .iter()
        .fold(StatusCounts::default(), |mut counts, record| {
            match record.status {
                RecordStatus::Pending => counts.pending += 1,
                RecordStatus::Verified => counts.verified += 1,
                RecordStatus::Rejected => counts.rejected += 1,
                RecordStatus::Sent => counts.sent += 1,
                RecordStatus::Unknown(_) => counts.unknown += 1,
            }
            counts
        })
}

/// Records client errors.
#[derive(Debug, Error)]
pub enum RecordsError {
    /// Input failed client-side validation.
    #[error("invalid record input: {0}")]
    Invalid(String),
    /// Certificate requested for a record that is neither verified nor sent.
    #[error("record {id} is {status}, not verified")]
    NotCertifiable {
        /// Record id.
        id: i64,
        /// Current status.
        status: RecordStatus,
    },
    /// Gateway failure.
    #[error(transparent)]
    Api(#[from] birth_registry_gateway::ApiError),
}
