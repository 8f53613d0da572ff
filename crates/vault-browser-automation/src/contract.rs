use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vault_contract::LoginSelectors;

/// Outcome of a single automated login attempt.
///
/// `message` is a short, already-sanitized diagnostic — callers must not put
/// raw page content or request bodies in it, since it is returned to the
/// agent that requested the login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowserLoginResult {
    pub success: bool,
    pub page_title: Option<String>,
    pub current_url: Option<String>,
    pub message: String,
}

/// Backend-agnostic browser automation surface.
///
/// The only implementation shipped here talks to a Chrome DevTools Protocol
/// endpoint at arm's length (reachability only); the actual page-interaction
/// recipe (locate fields, type, submit, wait for navigation) is left to
/// whatever automation backend a deployment wires in — this crate defines the
/// interface the rest of vault-mcp programs against, not a full browser
/// driver.
#[async_trait]
pub trait BrowserAdapter: Send + Sync {
    async fn perform_login(
        &self,
        login_url: &str,
        selectors: &LoginSelectors,
        email: &str,
        password: &str,
    ) -> BrowserLoginResult;
}
