use std::sync::Arc;

use vault_audit::AuditLog;
use vault_store::CredentialStore;

use crate::pending::PendingEntryRegistry;

#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<CredentialStore>,
    pub audit: Arc<AuditLog>,
    pub pending: Arc<PendingEntryRegistry>,
}
