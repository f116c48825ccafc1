//! Session endpoint handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use super::{current_session, not_found, status_response};
use crate::mock_server::state::{MockState, SESSION_COOKIE};
use crate::session::INTERNAL_SESSION_TEMPLATE;

/// Body of a login request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub session_template: SessionTemplate,
}

/// The template part of a login request.
#[derive(Debug, Deserialize)]
pub struct SessionTemplate {
    pub href: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// POST /api/session
pub async fn create_session(
    State(state): State<Arc<RwLock<MockState>>>,
    Json(request): Json<CreateSessionRequest>,
) -> Response {
    let template = request.session_template;
    if template.href != INTERNAL_SESSION_TEMPLATE {
        return status_response(
            StatusCode::BAD_REQUEST,
            format!("unsupported session template '{}'", template.href),
            None,
        );
    }

    let username = template.username.unwrap_or_default();
    let password = template.password.unwrap_or_default();

    let mut state = state.write().await;
    if !state.check_password(&username, &password) {
        return status_response(
            StatusCode::UNAUTHORIZED,
            format!("invalid credentials for '{username}'"),
            None,
        );
    }

    let session = state.create_session(&username);
    let cookie = format!("{SESSION_COOKIE}=token={}; Path=/", session.token);
    let body = json!({
        "status": 201,
        "message": format!("created {}", session.id),
        "resource-id": session.id,
    });

    (
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(body),
    )
        .into_response()
}

/// GET /api/session
///
/// Lists only the caller's own session; anonymous callers see none.
pub async fn list_sessions(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let state = state.read().await;
    let sessions: Vec<_> = current_session(&state, &headers)
        .map(|s| s.to_document())
        .into_iter()
        .collect();

    Json(json!({
        "id": "session",
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

/// GET /api/session/{uuid}
pub async fn get_session(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let id = format!("session/{uuid}");
    let state = state.read().await;

    match current_session(&state, &headers) {
        Some(session) if session.id == id => Json(session.to_document()).into_response(),
        Some(_) => status_response(StatusCode::FORBIDDEN, format!("no access to {id}"), Some(&id)),
        None if state.session_by_id(&id).is_some() => super::unauthorized(&id),
        None => not_found(&id),
    }
}

/// DELETE /api/session/{uuid}
///
/// Expires the session cookie on success.
pub async fn delete_session(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let id = format!("session/{uuid}");
    let mut state = state.write().await;

    if state.session_by_id(&id).is_none() {
        return not_found(&id);
    }

    let owns_session = current_session(&state, &headers).is_some_and(|s| s.id == id);
    if !owns_session {
        return status_response(StatusCode::FORBIDDEN, format!("no access to {id}"), Some(&id));
    }

    let _ = state.remove_session(&id);
    let expired = format!("{SESSION_COOKIE}=; Path=/; Max-Age=0");
    let body = json!({
        "status": 200,
        "message": format!("{id} deleted"),
        "resource-id": id,
    });

    (StatusCode::OK, [(header::SET_COOKIE, expired)], Json(body)).into_response()
}
