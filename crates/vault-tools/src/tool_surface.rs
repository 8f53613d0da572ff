use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vault_audit::{AuditAction, AuditLog, AuditOutcome};
use vault_browser_automation::BrowserAdapter;
use vault_contract::{
    sanitize_text, CredentialMetadata, LoginSelectors, SecretPayload, ServiceType, VaultError,
    VaultResult,
};
use vault_gateway::{await_entry, PendingEntryRegistry};
use vault_store::CredentialStore;

/// Result of [`ToolSurface::login`]. Never carries the email or password
/// that were used — only what the browser automation backend reported back,
/// with every secret value scrubbed from `message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginOutcome {
    pub success: bool,
    pub page_title: Option<String>,
    pub current_url: Option<String>,
    pub message: String,
}

/// Result of [`ToolSurface::api_request`]. `body` has already been run
/// through the sanitization pass against the credential's own secret values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequestOutcome {
    pub status: u16,
    pub body: serde_json::Value,
}

/// The last audit event recorded against a credential, as surfaced by
/// [`ToolSurface::status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastAuditEvent {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub result: AuditOutcome,
}

/// Result of [`ToolSurface::status`]: the credential's metadata plus how many
/// times it has appeared in the audit trail and what the most recent entry
/// was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialStatus {
    #[serde(flatten)]
    pub metadata: CredentialMetadata,
    pub audit_count: usize,
    pub last_used: Option<LastAuditEvent>,
}

/// The five verbs an agent can invoke without ever observing a secret:
/// `list`, `status`, `login`, `api_request`, `add`. Every call is recorded to
/// the audit trail, and every outbound string is sanitized against the
/// credential's own secret values before it leaves this struct.
#[derive(Clone)]
pub struct ToolSurface {
    store: Arc<CredentialStore>,
    audit: Arc<AuditLog>,
    browser: Arc<dyn BrowserAdapter>,
    pending: Arc<PendingEntryRegistry>,
    http: reqwest::Client,
    gateway_port: u16,
    bot_id: String,
}

impl ToolSurface {
    pub fn new(
        store: Arc<CredentialStore>,
        audit: Arc<AuditLog>,
        browser: Arc<dyn BrowserAdapter>,
        pending: Arc<PendingEntryRegistry>,
        gateway_port: u16,
        bot_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            audit,
            browser,
            pending,
            http: reqwest::Client::new(),
            gateway_port,
            bot_id: bot_id.into(),
        }
    }

    /// Lists every registered credential's metadata. Never touches the
    /// master key — there is nothing to decrypt.
    pub async fn list(&self) -> Vec<CredentialMetadata> {
        let metadata = self.store.list().await;
        let _ = self
            .audit
            .append(
                AuditAction::List,
                None,
                None,
                Some(self.bot_id.clone()),
                AuditOutcome {
                    success: true,
                    message: format!("listed {} credentials", metadata.len()),
                },
                None,
            )
            .await;
        metadata
    }

    /// Returns metadata plus how many audit entries this credential has
    /// accumulated and what the most recent one was.
    pub async fn status(&self, site_id: &str) -> VaultResult<CredentialStatus> {
        let metadata = match self.store.metadata(site_id).await {
            Ok(metadata) => metadata,
            Err(error) => {
                self.log_failure(AuditAction::Status, site_id, None, &error.to_string())
                    .await;
                return Err(error);
            }
        };

        let entries = self.audit.entries(Some(site_id)).await?;
        let audit_count = entries.len();
        let last_used = entries.into_iter().last().map(|entry| LastAuditEvent {
            timestamp: entry.timestamp,
            action: entry.action,
            result: entry.result,
        });

        self.audit
            .append(
                AuditAction::Status,
                Some(site_id.to_string()),
                Some(metadata.id),
                Some(self.bot_id.clone()),
                AuditOutcome {
                    success: true,
                    message: "status checked".to_string(),
                },
                None,
            )
            .await?;
        Ok(CredentialStatus {
            metadata,
            audit_count,
            last_used,
        })
    }

    /// Performs a browser-automated login for a `web_login` credential
    /// without ever returning the email or password to the caller.
    pub async fn login(&self, site_id: &str) -> VaultResult<LoginOutcome> {
        let metadata = match self.store.metadata(site_id).await {
            Ok(metadata) => metadata,
            Err(error) => {
                self.log_failure(AuditAction::Login, site_id, None, &error.to_string())
                    .await;
                return Err(error);
            }
        };
        if let Err(error) = expect_service_type(&metadata, ServiceType::WebLogin) {
            self.log_failure(AuditAction::Login, site_id, Some(metadata.id), &error.to_string())
                .await;
            return Err(error);
        }
        let login_url = match metadata.login_url.clone() {
            Some(login_url) => login_url,
            None => {
                let error = VaultError::Misconfigured {
                    site_id: site_id.to_string(),
                    reason: "credential has no login_url configured".to_string(),
                };
                self.log_failure(AuditAction::Login, site_id, Some(metadata.id), &error.to_string())
                    .await;
                return Err(error);
            }
        };
        let selectors = match metadata.selectors.clone() {
            Some(selectors) => selectors,
            None => {
                let error = VaultError::Misconfigured {
                    site_id: site_id.to_string(),
                    reason: "credential has no selectors configured".to_string(),
                };
                self.log_failure(AuditAction::Login, site_id, Some(metadata.id), &error.to_string())
                    .await;
                return Err(error);
            }
        };

        let secret = match self.store.secret(site_id).await {
            Ok(secret) => secret,
            Err(error) => {
                self.log_failure(AuditAction::Login, site_id, Some(metadata.id), &error.to_string())
                    .await;
                return Err(error);
            }
        };
        let (email, password) = match &secret {
            SecretPayload::WebLogin { email, password } => (email.as_str(), password.as_str()),
            SecretPayload::ApiKey { .. } => unreachable!("service type already validated"),
        };

        let result = self
            .browser
            .perform_login(&login_url, &selectors, email, password)
            .await;
        let secret_values = secret.secret_values();
        let outcome = LoginOutcome {
            success: result.success,
            page_title: result.page_title,
            current_url: result.current_url,
            message: sanitize_text(&result.message, &secret_values),
        };

        self.audit
            .append(
                AuditAction::Login,
                Some(site_id.to_string()),
                Some(metadata.id),
                Some(self.bot_id.clone()),
                AuditOutcome {
                    success: outcome.success,
                    message: outcome.message.clone(),
                },
                None,
            )
            .await?;
        Ok(outcome)
    }

    /// Makes an authenticated HTTP request on behalf of an `api_key`
    /// credential. The key and any secret header values are applied to the
    /// outbound request directly and scrubbed from everything that comes
    /// back.
    pub async fn api_request(
        &self,
        site_id: &str,
        method: &str,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> VaultResult<ApiRequestOutcome> {
        let metadata = match self.store.metadata(site_id).await {
            Ok(metadata) => metadata,
            Err(error) => {
                self.log_failure(AuditAction::ApiRequest, site_id, None, &error.to_string())
                    .await;
                return Err(error);
            }
        };
        if let Err(error) = expect_service_type(&metadata, ServiceType::ApiKey) {
            self.log_failure(AuditAction::ApiRequest, site_id, Some(metadata.id), &error.to_string())
                .await;
            return Err(error);
        }
        let secret = match self.store.secret(site_id).await {
            Ok(secret) => secret,
            Err(error) => {
                self.log_failure(AuditAction::ApiRequest, site_id, Some(metadata.id), &error.to_string())
                    .await;
                return Err(error);
            }
        };
        let (api_key, headers) = match &secret {
            SecretPayload::ApiKey { api_key, headers } => (api_key.as_str(), headers),
            SecretPayload::WebLogin { .. } => unreachable!("service type already validated"),
        };

        let http_method = match reqwest::Method::from_bytes(method.as_bytes()) {
            Ok(http_method) => http_method,
            Err(_) => {
                let error = VaultError::Misconfigured {
                    site_id: site_id.to_string(),
                    reason: format!("invalid HTTP method '{method}'"),
                };
                self.log_failure(AuditAction::ApiRequest, site_id, Some(metadata.id), &error.to_string())
                    .await;
                return Err(error);
            }
        };

        let mut request = self.http.request(http_method, url);
        let has_authorization_header =
            headers.keys().any(|name| name.eq_ignore_ascii_case("authorization"));
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if !has_authorization_header {
            request = request.bearer_auth(api_key);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let secret_values = secret.secret_values();
        let response = request.send().await.map_err(|error| {
            VaultError::TransportFailure(sanitize_text(&error.to_string(), &secret_values))
        })?;
        let status = response.status().as_u16();
        let raw_body = response.text().await.unwrap_or_default();
        let sanitized_body = sanitize_text(&raw_body, &secret_values);
        let body_value = serde_json::from_str(&sanitized_body)
            .unwrap_or_else(|_| serde_json::Value::String(sanitized_body));

        self.audit
            .append(
                AuditAction::ApiRequest,
                Some(site_id.to_string()),
                Some(metadata.id),
                Some(self.bot_id.clone()),
                AuditOutcome {
                    success: status < 400,
                    message: format!("{method} {site_id} -> {status}"),
                },
                None,
            )
            .await?;
        Ok(ApiRequestOutcome {
            status,
            body: body_value,
        })
    }

    /// Begins the out-of-process entry handshake: registers a pending entry,
    /// invokes `on_entry_ready` with the URL a human should open, then waits
    /// up to `timeout` for the form to be submitted before persisting the
    /// credential.
    ///
    /// Persistence happens entirely inside the gateway's `POST
    /// /api/credentials` handler: by the time the waiting receiver resolves,
    /// the credential is already on disk and its `credential.created` audit
    /// entry already written. This call only needs to log that the handshake
    /// itself succeeded or failed from the tool surface's point of view.
    pub async fn add(
        &self,
        site_id: &str,
        service_type: ServiceType,
        login_url: Option<String>,
        selectors: Option<LoginSelectors>,
        timeout: Duration,
        on_entry_ready: impl FnOnce(&str),
    ) -> VaultResult<CredentialMetadata> {
        let (token, receiver) = self.pending.begin(site_id.to_string(), service_type, login_url, selectors);
        let entry_url = format!("http://127.0.0.1:{}/add?token={}", self.gateway_port, token);
        on_entry_ready(&entry_url);

        let metadata = match await_entry(receiver, timeout).await {
            Ok(metadata) => metadata,
            Err(error) => {
                self.pending.cancel(token);
                let _ = self
                    .audit
                    .append(
                        AuditAction::CredentialAdded,
                        Some(site_id.to_string()),
                        None,
                        Some(self.bot_id.clone()),
                        AuditOutcome {
                            success: false,
                            message: "entry form timed out".to_string(),
                        },
                        None,
                    )
                    .await;
                return Err(error);
            }
        };

        self.audit
            .append(
                AuditAction::CredentialAdded,
                Some(site_id.to_string()),
                Some(metadata.id),
                Some(self.bot_id.clone()),
                AuditOutcome {
                    success: true,
                    message: format!("credential added for {site_id}"),
                },
                None,
            )
            .await?;
        Ok(metadata)
    }

    async fn log_failure(
        &self,
        action: AuditAction,
        site_id: &str,
        credential_id: Option<Uuid>,
        message: &str,
    ) {
        let _ = self
            .audit
            .append(
                action,
                Some(site_id.to_string()),
                credential_id,
                Some(self.bot_id.clone()),
                AuditOutcome {
                    success: false,
                    message: message.to_string(),
                },
                None,
            )
            .await;
    }
}

fn expect_service_type(metadata: &CredentialMetadata, expected: ServiceType) -> VaultResult<()> {
    if metadata.service_type != expected {
        return Err(VaultError::WrongType {
            site_id: metadata.site_id.clone(),
            reason: expected.with_article().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use uuid::Uuid;
    use vault_browser_automation::BrowserLoginResult;

    struct FakeBrowserAdapter {
        response: BrowserLoginResult,
    }

    #[async_trait]
    impl BrowserAdapter for FakeBrowserAdapter {
        async fn perform_login(
            &self,
            _login_url: &str,
            _selectors: &LoginSelectors,
            _email: &str,
            _password: &str,
        ) -> BrowserLoginResult {
            self.response.clone()
        }
    }

    async fn surface(
        browser: Arc<dyn BrowserAdapter>,
    ) -> (ToolSurface, Arc<CredentialStore>, Arc<PendingEntryRegistry>, tempfile::TempDir) {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(CredentialStore::init(tempdir.path()).await.expect("store"));
        let audit = Arc::new(AuditLog::init(tempdir.path()).await.expect("audit"));
        let pending = Arc::new(PendingEntryRegistry::new());
        let surface = ToolSurface::new(
            Arc::clone(&store),
            audit,
            browser,
            Arc::clone(&pending),
            9900,
            "test-bot",
        );
        (surface, store, pending, tempdir)
    }

    fn selectors() -> LoginSelectors {
        LoginSelectors {
            email_selector: "#email".to_string(),
            password_selector: "#password".to_string(),
            submit_selector: "#submit".to_string(),
        }
    }

    fn passthrough_browser(message: &str) -> Arc<dyn BrowserAdapter> {
        Arc::new(FakeBrowserAdapter {
            response: BrowserLoginResult {
                success: true,
                page_title: Some("Dashboard".to_string()),
                current_url: Some("https://example.com/home".to_string()),
                message: message.to_string(),
            },
        })
    }

    #[tokio::test]
    async fn unit_add_then_list_reflects_new_credential() {
        let (surface, store, pending, _tempdir) = surface(passthrough_browser("login ok")).await;
        let captured_token: Arc<StdMutex<Option<Uuid>>> = Arc::new(StdMutex::new(None));
        let captured_token_writer = Arc::clone(&captured_token);

        let surface_for_task = surface.clone();
        let add_task = tokio::spawn(async move {
            surface_for_task
                .add(
                    "example.com",
                    ServiceType::WebLogin,
                    Some("https://example.com/login".to_string()),
                    Some(selectors()),
                    Duration::from_secs(5),
                    move |url| {
                        let token_str = url.rsplit('=').next().expect("token query param");
                        let token = Uuid::parse_str(token_str).expect("valid token");
                        *captured_token_writer.lock().expect("mutex") = Some(token);
                    },
                )
                .await
        });

        let token = loop {
            if let Some(token) = *captured_token.lock().expect("mutex") {
                break token;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };

        // Simulates the gateway's `POST /api/credentials` handler: persist
        // through the store, then resolve the waiting `add` call.
        let registration = pending.take(token).expect("take");
        let metadata = store
            .add(
                &registration.site_id,
                registration.login_url.clone(),
                registration.selectors.clone(),
                &SecretPayload::WebLogin {
                    email: "a@b.com".to_string(),
                    password: "hunter2".to_string(),
                },
            )
            .await
            .expect("store add");
        registration.resolve(metadata);

        let metadata = add_task.await.expect("join").expect("add result");
        assert_eq!(metadata.site_id, "example.com");

        let listed = surface.list().await;
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn regression_add_times_out_when_form_is_never_submitted() {
        let (surface, _store, _pending, _tempdir) = surface(passthrough_browser("login ok")).await;
        let result = surface
            .add(
                "slow.com",
                ServiceType::WebLogin,
                None,
                None,
                Duration::from_millis(20),
                |_url| {},
            )
            .await;
        assert!(matches!(result, Err(VaultError::Timeout)));
    }

    #[tokio::test]
    async fn unit_login_sanitizes_secret_values_from_message() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(CredentialStore::init(tempdir.path()).await.expect("store"));
        store
            .add(
                "sanitize.com",
                Some("https://sanitize.com/login".to_string()),
                Some(selectors()),
                &SecretPayload::WebLogin {
                    email: "a@b.com".to_string(),
                    password: "hunter2".to_string(),
                },
            )
            .await
            .expect("add");
        let audit = Arc::new(AuditLog::init(tempdir.path()).await.expect("audit"));
        let browser = Arc::new(FakeBrowserAdapter {
            response: BrowserLoginResult {
                success: false,
                page_title: None,
                current_url: None,
                message: "login failed for a@b.com with hunter2".to_string(),
            },
        });
        let surface = ToolSurface::new(
            store,
            audit,
            browser,
            Arc::new(PendingEntryRegistry::new()),
            9900,
            "test-bot",
        );

        let outcome = surface.login("sanitize.com").await.expect("login");
        assert!(!outcome.message.contains("a@b.com"));
        assert!(!outcome.message.contains("hunter2"));
        assert!(outcome.message.contains("***"));
    }

    #[tokio::test]
    async fn regression_login_rejects_api_key_credential() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(CredentialStore::init(tempdir.path()).await.expect("store"));
        store
            .add(
                "apisite.com",
                None,
                None,
                &SecretPayload::ApiKey {
                    api_key: "sk-1".to_string(),
                    headers: Default::default(),
                },
            )
            .await
            .expect("add");
        let audit = Arc::new(AuditLog::init(tempdir.path()).await.expect("audit"));
        let surface = ToolSurface::new(
            store,
            audit,
            passthrough_browser("unused"),
            Arc::new(PendingEntryRegistry::new()),
            9900,
            "test-bot",
        );

        let result = surface.login("apisite.com").await;
        assert!(matches!(result, Err(VaultError::WrongType { .. })));
    }

    #[tokio::test]
    async fn functional_status_reports_not_found_for_unknown_site() {
        let (surface, _store, _pending, _tempdir) = surface(passthrough_browser("unused")).await;
        let result = surface.status("missing.com").await;
        assert!(matches!(result, Err(VaultError::NotFound { .. })));
    }

    #[tokio::test]
    async fn functional_status_reports_audit_count_and_last_used() {
        let (surface, store, _pending, _tempdir) = surface(passthrough_browser("login ok")).await;
        store
            .add(
                "status-site.com",
                Some("https://status-site.com/login".to_string()),
                Some(selectors()),
                &SecretPayload::WebLogin {
                    email: "a@b.com".to_string(),
                    password: "hunter2".to_string(),
                },
            )
            .await
            .expect("store add");

        surface.login("status-site.com").await.expect("login");
        let status = surface.status("status-site.com").await.expect("status");

        assert_eq!(status.metadata.site_id, "status-site.com");
        // login() plus this status() call's own entry.
        assert_eq!(status.audit_count, 1);
        assert!(matches!(status.last_used, Some(LastAuditEvent { action: AuditAction::Login, .. })));
    }

    #[tokio::test]
    async fn functional_login_precondition_failure_is_audited() {
        let (surface, _store, _pending, _tempdir) = surface(passthrough_browser("unused")).await;
        let result = surface.login("missing.com").await;
        assert!(matches!(result, Err(VaultError::NotFound { .. })));

        let entries = surface.audit.entries(Some("missing.com")).await.expect("entries");
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].result.success);
    }
}
