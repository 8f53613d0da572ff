use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The vault operation an [`AuditEntry`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CredentialAdded,
    CredentialRemoved,
    CredentialDeactivated,
    CredentialReactivated,
    Login,
    ApiRequest,
    List,
    Status,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CredentialAdded => "credential_added",
            Self::CredentialRemoved => "credential_removed",
            Self::CredentialDeactivated => "credential_deactivated",
            Self::CredentialReactivated => "credential_reactivated",
            Self::Login => "login",
            Self::ApiRequest => "api_request",
            Self::List => "list",
            Self::Status => "status",
        };
        write!(f, "{s}")
    }
}

/// Outcome of the operation the entry records. `message` is already sanitized
/// by the caller — the audit log never performs redaction itself, it only
/// stores what it is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub success: bool,
    pub message: String,
}

/// One link in the hash chain.
///
/// `hash` is computed over the canonical JSON of every other field, including
/// `prev_hash`, so altering or removing any entry — or reordering the file —
/// breaks the chain at the point of tampering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub site_id: Option<String>,
    pub credential_id: Option<Uuid>,
    pub bot_id: Option<String>,
    pub result: AuditOutcome,
    pub details: Option<serde_json::Value>,
    pub prev_hash: String,
    pub hash: String,
}

/// Projection of [`AuditEntry`] used to compute `hash`: every field except
/// `hash` itself, in a fixed key order so the canonical JSON is stable.
#[derive(Serialize)]
pub(crate) struct HashedFields<'a> {
    pub event_id: &'a str,
    pub timestamp: &'a DateTime<Utc>,
    pub action: &'a AuditAction,
    pub site_id: &'a Option<String>,
    pub credential_id: &'a Option<Uuid>,
    pub bot_id: &'a Option<String>,
    pub result: &'a AuditOutcome,
    pub details: &'a Option<serde_json::Value>,
    pub prev_hash: &'a str,
}

impl AuditEntry {
    pub(crate) fn hashed_fields(&self) -> HashedFields<'_> {
        HashedFields {
            event_id: self.event_id.as_str(),
            timestamp: &self.timestamp,
            action: &self.action,
            site_id: &self.site_id,
            credential_id: &self.credential_id,
            bot_id: &self.bot_id,
            result: &self.result,
            details: &self.details,
            prev_hash: &self.prev_hash,
        }
    }
}
