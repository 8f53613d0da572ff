use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use vault_audit::AuditLog;
use vault_store::CredentialStore;

use crate::pending::PendingEntryRegistry;
use crate::routes::{
    handle_delete_credential, handle_entry_form, handle_get_audit, handle_list_credentials,
    handle_patch_credential, handle_submit_credential,
};
use crate::state::GatewayState;

/// Builds the loopback gateway router: the human-facing entry form plus the
/// JSON submit and admin endpoints it and the CLI talk to. CORS is permissive
/// because everything here is served and posted from the same machine only —
/// it is never meant to be reachable past loopback, see
/// [`run_entry_gateway`].
pub fn build_router(
    store: Arc<CredentialStore>,
    audit: Arc<AuditLog>,
    pending: Arc<PendingEntryRegistry>,
) -> Router {
    let state = GatewayState { store, audit, pending };
    Router::new()
        .route("/add", get(handle_entry_form))
        .route("/api/credentials", get(handle_list_credentials).post(handle_submit_credential))
        .route(
            "/api/credentials/:site",
            axum::routing::patch(handle_patch_credential).delete(handle_delete_credential),
        )
        .route("/api/audit", get(handle_get_audit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs the loopback gateway on `127.0.0.1:port` until ctrl-c.
///
/// Binding anything other than loopback is out of scope: the handshake
/// assumes the human submitting the form and the agent waiting on it share a
/// machine.
pub async fn run_entry_gateway(
    port: u16,
    store: Arc<CredentialStore>,
    audit: Arc<AuditLog>,
    pending: Arc<PendingEntryRegistry>,
) -> Result<()> {
    let bind_addr: SocketAddr = ([127, 0, 0, 1], port).into();
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind entry gateway on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound entry gateway address")?;
    tracing::info!(addr = %local_addr, "entry-form gateway listening");

    let app = build_router(store, audit, pending);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("entry-form gateway exited unexpectedly")
}
