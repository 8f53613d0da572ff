use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use uuid::Uuid;
use vault_contract::{
    CredentialMetadata, CredentialRecord, LoginSelectors, SecretPayload, ServiceType, VaultError,
    VaultResult,
};
use vault_core::{ensure_private_dir, write_text_atomic};

const CREDENTIALS_FILE: &str = "credentials.json";

/// Encrypted, on-disk collection of credential records for one vault data
/// directory.
///
/// Every mutating method loads the whole file, applies the change, and
/// rewrites it atomically — credential counts are small (this is a personal
/// secret broker, not a database), so there is no benefit to incremental
/// persistence and a real one to keeping `add`/`remove`/`toggle_active`
/// trivially consistent.
pub struct CredentialStore {
    data_dir: PathBuf,
    records: Mutex<Vec<CredentialRecord>>,
}

impl CredentialStore {
    pub async fn init(data_dir: &Path) -> VaultResult<Self> {
        ensure_private_dir(data_dir)?;
        let records = load_records(data_dir).await?;
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            records: Mutex::new(records),
        })
    }

    /// Encrypts `secret` and stores it under `site_id`. Fails with
    /// [`VaultError::DuplicateSiteId`] if the site is already registered,
    /// active or not.
    #[allow(clippy::too_many_arguments)]
    pub async fn add(
        &self,
        site_id: &str,
        login_url: Option<String>,
        selectors: Option<LoginSelectors>,
        secret: &SecretPayload,
    ) -> VaultResult<CredentialMetadata> {
        let mut records = self.records.lock().await;
        if records.iter().any(|record| record.site_id == site_id) {
            return Err(VaultError::DuplicateSiteId(site_id.to_string()));
        }

        let key = vault_crypto::obtain_master_key(&self.data_dir)
            .map_err(|error| VaultError::CryptoFailure {
                site_id: site_id.to_string(),
                reason: error.to_string(),
            })?;
        let plaintext = serde_json::to_vec(secret)?;
        let ciphertext = vault_crypto::encrypt(&key, &plaintext).map_err(|error| {
            VaultError::CryptoFailure {
                site_id: site_id.to_string(),
                reason: error.to_string(),
            }
        })?;

        let now = vault_core::now_iso8601();
        let record = CredentialRecord {
            id: Uuid::new_v4(),
            site_id: site_id.to_string(),
            service_type: secret.service_type(),
            active: true,
            created_at: now.clone(),
            updated_at: now,
            login_url,
            selectors,
            ciphertext,
        };
        let metadata = record.to_metadata();
        records.push(record);
        persist(&self.data_dir, &records).await?;
        tracing::info!(site_id, "credential added");
        Ok(metadata)
    }

    pub async fn list(&self) -> Vec<CredentialMetadata> {
        let records = self.records.lock().await;
        records.iter().map(CredentialRecord::to_metadata).collect()
    }

    pub async fn metadata(&self, site_id: &str) -> VaultResult<CredentialMetadata> {
        let records = self.records.lock().await;
        records
            .iter()
            .find(|record| record.site_id == site_id)
            .map(CredentialRecord::to_metadata)
            .ok_or_else(|| VaultError::NotFound {
                site_id: site_id.to_string(),
            })
    }

    /// Decrypts and returns the secret payload for `site_id`.
    ///
    /// Fails with [`VaultError::Inactive`] if the credential has been
    /// deactivated via [`Self::set_active`] — callers must not silently use a
    /// credential the user has turned off.
    pub async fn secret(&self, site_id: &str) -> VaultResult<SecretPayload> {
        let records = self.records.lock().await;
        let record = records
            .iter()
            .find(|record| record.site_id == site_id)
            .ok_or_else(|| VaultError::NotFound {
                site_id: site_id.to_string(),
            })?;
        if !record.active {
            return Err(VaultError::Inactive {
                site_id: site_id.to_string(),
            });
        }

        let key = vault_crypto::obtain_master_key(&self.data_dir)
            .map_err(|error| VaultError::CryptoFailure {
                site_id: site_id.to_string(),
                reason: error.to_string(),
            })?;
        let plaintext = vault_crypto::decrypt(&key, &record.ciphertext).map_err(|error| {
            VaultError::CryptoFailure {
                site_id: site_id.to_string(),
                reason: error.to_string(),
            }
        })?;
        let secret: SecretPayload = serde_json::from_slice(&plaintext)?;
        Ok(secret)
    }

    /// Returns the credential's expected service type without decrypting its
    /// secret, so callers can validate a request shape before touching key
    /// material.
    pub async fn service_type(&self, site_id: &str) -> VaultResult<ServiceType> {
        self.metadata(site_id).await.map(|metadata| metadata.service_type)
    }

    pub async fn set_active(&self, site_id: &str, active: bool) -> VaultResult<CredentialMetadata> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|record| record.site_id == site_id)
            .ok_or_else(|| VaultError::NotFound {
                site_id: site_id.to_string(),
            })?;
        record.active = active;
        record.updated_at = vault_core::now_iso8601();
        let metadata = record.to_metadata();
        persist(&self.data_dir, &records).await?;
        tracing::info!(site_id, active, "credential activation toggled");
        Ok(metadata)
    }

    pub async fn remove(&self, site_id: &str) -> VaultResult<()> {
        let mut records = self.records.lock().await;
        let len_before = records.len();
        records.retain(|record| record.site_id != site_id);
        if records.len() == len_before {
            return Err(VaultError::NotFound {
                site_id: site_id.to_string(),
            });
        }
        persist(&self.data_dir, &records).await?;
        tracing::info!(site_id, "credential removed");
        Ok(())
    }
}

async fn load_records(data_dir: &Path) -> VaultResult<Vec<CredentialRecord>> {
    let path = data_dir.join(CREDENTIALS_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = tokio::fs::read_to_string(&path).await?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Vec<CredentialRecord> = serde_json::from_str(&raw)?;
    Ok(records)
}

async fn persist(data_dir: &Path, records: &[CredentialRecord]) -> VaultResult<()> {
    let path = data_dir.join(CREDENTIALS_FILE);
    let json = serde_json::to_string_pretty(records)?;
    write_text_atomic(&path, &json)?;
    vault_core::set_private_file_mode(&path)?;
    Ok(())
}
