use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use uuid::Uuid;
use vault_contract::{CredentialMetadata, LoginSelectors, ServiceType, VaultError, VaultResult};

/// Default window a pending entry token stays valid for before the waiting
/// `add` call gives up.
pub const DEFAULT_ENTRY_TIMEOUT: Duration = Duration::from_secs(300);

/// What the entry form needs to know to render the right fields, without
/// exposing anything about credentials already in the store.
#[derive(Debug, Clone)]
pub struct PendingEntryView {
    pub token: Uuid,
    pub site_id: String,
    pub service_type: ServiceType,
}

struct PendingEntry {
    site_id: String,
    service_type: ServiceType,
    login_url: Option<String>,
    selectors: Option<LoginSelectors>,
    resolver: oneshot::Sender<CredentialMetadata>,
}

/// A pending entry pulled out of the registry to be fulfilled, everything
/// `POST /api/credentials` needs to persist the credential and resolve the
/// waiting `add` call.
pub struct PendingRegistration {
    pub site_id: String,
    pub service_type: ServiceType,
    pub login_url: Option<String>,
    pub selectors: Option<LoginSelectors>,
    resolver: oneshot::Sender<CredentialMetadata>,
}

impl PendingRegistration {
    /// Hands the persisted metadata back to the waiting `add` call. The
    /// receiver may already be gone if the waiter timed out first; that race
    /// is expected and not an error for the submitter.
    pub fn resolve(self, metadata: CredentialMetadata) {
        let _ = self.resolver.send(metadata);
    }
}

/// Holds in-flight add-credential handshakes.
///
/// A tool call registers a token and a site/service type, hands the human a
/// URL containing that token, then races a [`tokio::sync::oneshot`] receiver
/// against a timeout. The HTTP form handler takes the same token's entry the
/// instant the human submits — whichever of "form submitted" or "timeout
/// elapsed" happens first wins, and the loser is simply dropped.
#[derive(Default)]
pub struct PendingEntryRegistry {
    entries: Mutex<HashMap<Uuid, PendingEntry>>,
}

impl PendingEntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending entry and returns its token together with a
    /// receiver that resolves once the credential has been persisted.
    pub fn begin(
        &self,
        site_id: String,
        service_type: ServiceType,
        login_url: Option<String>,
        selectors: Option<LoginSelectors>,
    ) -> (Uuid, oneshot::Receiver<CredentialMetadata>) {
        let token = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.entries.lock().expect("pending entry registry mutex poisoned").insert(
            token,
            PendingEntry {
                site_id,
                service_type,
                login_url,
                selectors,
                resolver: tx,
            },
        );
        (token, rx)
    }

    /// Looks up the view a form handler needs to render, without consuming
    /// the pending entry.
    pub fn view(&self, token: Uuid) -> Option<PendingEntryView> {
        let entries = self.entries.lock().expect("pending entry registry mutex poisoned");
        entries.get(&token).map(|entry| PendingEntryView {
            token,
            site_id: entry.site_id.clone(),
            service_type: entry.service_type,
        })
    }

    /// Removes and returns the pending entry for `token`, so the caller can
    /// persist the credential and resolve the waiting `add` call. Returns
    /// [`VaultError::NotFound`] if the token is unknown or has already been
    /// resolved/timed out.
    pub fn take(&self, token: Uuid) -> VaultResult<PendingRegistration> {
        let entry = {
            let mut entries = self.entries.lock().expect("pending entry registry mutex poisoned");
            entries.remove(&token)
        };
        let entry = entry.ok_or_else(|| VaultError::NotFound {
            site_id: token.to_string(),
        })?;
        Ok(PendingRegistration {
            site_id: entry.site_id,
            service_type: entry.service_type,
            login_url: entry.login_url,
            selectors: entry.selectors,
            resolver: entry.resolver,
        })
    }

    /// Drops a pending entry without resolving it, e.g. after a timeout.
    pub fn cancel(&self, token: Uuid) {
        self.entries.lock().expect("pending entry registry mutex poisoned").remove(&token);
    }
}

/// Races `receiver` against `timeout`, returning [`VaultError::Timeout`] if
/// the human never submits the form in time.
pub async fn await_entry(
    receiver: oneshot::Receiver<CredentialMetadata>,
    timeout: Duration,
) -> VaultResult<CredentialMetadata> {
    tokio::select! {
        result = receiver => result.map_err(|_| VaultError::Timeout),
        _ = tokio::time::sleep(timeout) => Err(VaultError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata(site_id: &str) -> CredentialMetadata {
        CredentialMetadata {
            id: Uuid::new_v4(),
            site_id: site_id.to_string(),
            service_type: ServiceType::WebLogin,
            active: true,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            login_url: None,
            selectors: None,
        }
    }

    #[tokio::test]
    async fn unit_begin_then_take_resolves_the_waiter() {
        let registry = PendingEntryRegistry::new();
        let (token, rx) = registry.begin("example.com".to_string(), ServiceType::WebLogin, None, None);

        let registration = registry.take(token).expect("take");
        assert_eq!(registration.site_id, "example.com");
        registration.resolve(sample_metadata("example.com"));

        let metadata = await_entry(rx, Duration::from_secs(5)).await.expect("await");
        assert_eq!(metadata.site_id, "example.com");
    }

    #[tokio::test]
    async fn regression_await_entry_times_out_when_nothing_is_submitted() {
        let registry = PendingEntryRegistry::new();
        let (token, rx) = registry.begin("example.com".to_string(), ServiceType::WebLogin, None, None);

        let result = await_entry(rx, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(VaultError::Timeout)));
        registry.cancel(token);
    }

    #[test]
    fn unit_take_unknown_token_returns_not_found() {
        let registry = PendingEntryRegistry::new();
        let result = registry.take(Uuid::new_v4());
        assert!(matches!(result, Err(VaultError::NotFound { .. })));
    }

    #[tokio::test]
    async fn functional_view_reflects_registered_site_and_type() {
        let registry = PendingEntryRegistry::new();
        let (token, _rx) =
            registry.begin("api.example.com".to_string(), ServiceType::ApiKey, None, None);
        let view = registry.view(token).expect("view");
        assert_eq!(view.site_id, "api.example.com");
        assert_eq!(view.service_type, ServiceType::ApiKey);
    }
}
