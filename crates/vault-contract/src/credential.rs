use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of credential shapes the store understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    WebLogin,
    ApiKey,
}

impl ServiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebLogin => "web_login",
            Self::ApiKey => "api_key",
        }
    }

    /// `self.as_str()` with its indefinite article, e.g. "an api_key".
    pub fn with_article(self) -> &'static str {
        match self {
            Self::WebLogin => "a web_login",
            Self::ApiKey => "an api_key",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three DOM selectors a `web_login` recipe needs to drive a browser form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginSelectors {
    pub email_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
}

/// The decrypted shape of a credential's secret material.
///
/// Untagged so the on-disk plaintext matches exactly what §3 specifies:
/// `{"email":..,"password":..}` or `{"api_key":..,"headers":{..}}`, with no
/// extra discriminant field polluting the JSON a human might paste by hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SecretPayload {
    WebLogin { email: String, password: String },
    ApiKey {
        api_key: String,
        headers: BTreeMap<String, String>,
    },
}

impl SecretPayload {
    /// The service type implied by this payload's shape.
    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::WebLogin { .. } => ServiceType::WebLogin,
            Self::ApiKey { .. } => ServiceType::ApiKey,
        }
    }

    /// Every secret string this payload carries, for the sanitization pass.
    pub fn secret_values(&self) -> Vec<&str> {
        match self {
            Self::WebLogin { email, password } => vec![email.as_str(), password.as_str()],
            Self::ApiKey { api_key, headers } => {
                let mut values = vec![api_key.as_str()];
                values.extend(headers.values().map(String::as_str));
                values
            }
        }
    }
}

/// Metadata-only projection of a credential: never carries ciphertext or plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialMetadata {
    pub id: Uuid,
    pub site_id: String,
    pub service_type: ServiceType,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<LoginSelectors>,
}

/// The full on-disk representation of one credential, ciphertext included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub site_id: String,
    pub service_type: ServiceType,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<LoginSelectors>,
    /// base64(IV ‖ ciphertext ‖ auth_tag)
    pub ciphertext: String,
}

impl CredentialRecord {
    /// Projects this record down to its non-secret metadata.
    pub fn to_metadata(&self) -> CredentialMetadata {
        CredentialMetadata {
            id: self.id,
            site_id: self.site_id.clone(),
            service_type: self.service_type,
            active: self.active,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            login_url: self.login_url.clone(),
            selectors: self.selectors.clone(),
        }
    }
}
