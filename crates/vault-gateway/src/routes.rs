use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;
use vault_contract::SecretPayload;

use crate::entry_form::{render_entry_form, render_entry_result};
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub(crate) struct AddQuery {
    token: Uuid,
}

/// `GET /add?token=...` — renders the entry form for a pending add
/// handshake. The token travels as a query string rather than a path
/// segment so it never ends up in a web server's access log under the same
/// key as a resource path.
pub(crate) async fn handle_entry_form(
    State(state): State<GatewayState>,
    Query(query): Query<AddQuery>,
) -> Response {
    match state.pending.view(query.token) {
        Some(view) => Html(render_entry_form(&view)).into_response(),
        None => (StatusCode::NOT_FOUND, Html(render_entry_result(false))).into_response(),
    }
}

/// Body of `POST /api/credentials`: the token handed out with the entry
/// URL, the site it was issued for, and the secret payload a human just
/// typed into the form.
#[derive(Debug, Deserialize)]
pub(crate) struct SubmitCredentialRequest {
    token: Uuid,
    site: String,
    payload: SecretPayload,
}

/// `POST /api/credentials` — the JSON submit endpoint the entry form posts
/// to. Persists the credential through the store, fires `credential.created`
/// to the audit log, and resolves the tool call still waiting on this token.
pub(crate) async fn handle_submit_credential(
    State(state): State<GatewayState>,
    Json(request): Json<SubmitCredentialRequest>,
) -> Response {
    let registration = match state.pending.take(request.token) {
        Ok(registration) => registration,
        Err(_) => return (StatusCode::GONE, Html(render_entry_result(false))).into_response(),
    };
    if registration.site_id != request.site {
        return (StatusCode::BAD_REQUEST, "site does not match the pending entry").into_response();
    }
    if registration.service_type != request.payload.service_type() {
        return (
            StatusCode::BAD_REQUEST,
            "payload does not match the credential's service type",
        )
            .into_response();
    }

    let metadata = match state
        .store
        .add(
            &registration.site_id,
            registration.login_url.clone(),
            registration.selectors.clone(),
            &request.payload,
        )
        .await
    {
        Ok(metadata) => metadata,
        Err(error) => return (StatusCode::CONFLICT, error.to_string()).into_response(),
    };

    let _ = state
        .audit
        .append(
            vault_audit::AuditAction::CredentialAdded,
            Some(metadata.site_id.clone()),
            Some(metadata.id),
            None,
            vault_audit::AuditOutcome {
                success: true,
                message: format!("credential added for {}", metadata.site_id),
            },
            None,
        )
        .await;

    registration.resolve(metadata);
    (StatusCode::OK, Html(render_entry_result(true))).into_response()
}

/// `GET /api/credentials` — every registered credential's metadata.
pub(crate) async fn handle_list_credentials(State(state): State<GatewayState>) -> Response {
    Json(state.store.list().await).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetActiveRequest {
    active: bool,
}

/// `PATCH /api/credentials/{site}` — toggles a credential active/inactive.
pub(crate) async fn handle_patch_credential(
    State(state): State<GatewayState>,
    Path(site_id): Path<String>,
    Json(request): Json<SetActiveRequest>,
) -> Response {
    match state.store.set_active(&site_id, request.active).await {
        Ok(metadata) => {
            let action = if request.active {
                vault_audit::AuditAction::CredentialReactivated
            } else {
                vault_audit::AuditAction::CredentialDeactivated
            };
            let _ = state
                .audit
                .append(
                    action,
                    Some(site_id.clone()),
                    Some(metadata.id),
                    None,
                    vault_audit::AuditOutcome {
                        success: true,
                        message: format!("credential '{site_id}' set active={}", request.active),
                    },
                    None,
                )
                .await;
            Json(metadata).into_response()
        }
        Err(error) => (StatusCode::NOT_FOUND, error.to_string()).into_response(),
    }
}

/// `DELETE /api/credentials/{site}` — removes a credential permanently.
pub(crate) async fn handle_delete_credential(
    State(state): State<GatewayState>,
    Path(site_id): Path<String>,
) -> Response {
    match state.store.remove(&site_id).await {
        Ok(()) => {
            let _ = state
                .audit
                .append(
                    vault_audit::AuditAction::CredentialRemoved,
                    Some(site_id.clone()),
                    None,
                    None,
                    vault_audit::AuditOutcome {
                        success: true,
                        message: format!("credential '{site_id}' removed"),
                    },
                    None,
                )
                .await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(error) => (StatusCode::NOT_FOUND, error.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuditQuery {
    site_id: Option<String>,
}

/// `GET /api/audit` — the audit trail, optionally filtered to one site.
pub(crate) async fn handle_get_audit(
    State(state): State<GatewayState>,
    Query(query): Query<AuditQuery>,
) -> Response {
    match state.audit.entries(query.site_id.as_deref()).await {
        Ok(entries) => Json(entries).into_response(),
        Err(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_submit_credential_request_deserializes_web_login_payload() {
        let body = r#"{"token":"2f3c9a4e-6b9d-4e3a-8f5a-2b8a6f6a9a11","site":"example.com","payload":{"email":"a@b.com","password":"pw"}}"#;
        let request: SubmitCredentialRequest = serde_json::from_str(body).expect("deserialize");
        assert_eq!(request.site, "example.com");
        assert!(matches!(request.payload, SecretPayload::WebLogin { .. }));
    }

    #[test]
    fn unit_add_query_deserializes_token() {
        let query: AddQuery =
            serde_json::from_str(r#"{"token":"2f3c9a4e-6b9d-4e3a-8f5a-2b8a6f6a9a11"}"#)
                .expect("deserialize");
        assert_eq!(query.token.to_string(), "2f3c9a4e-6b9d-4e3a-8f5a-2b8a6f6a9a11");
    }
}
