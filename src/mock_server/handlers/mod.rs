//! HTTP request handlers for the mock server.

pub mod entry_point;
pub mod resources;
pub mod sessions;

pub use entry_point::*;
pub use resources::*;
pub use sessions::*;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::state::{MockState, SessionRecord, SESSION_COOKIE};

/// Token from the session cookie, if the request carries one.
pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.strip_prefix("token="))
        .map(str::to_string)
}

/// The session the request belongs to, if its cookie is valid.
pub(crate) fn current_session<'a>(
    state: &'a MockState,
    headers: &HeaderMap,
) -> Option<&'a SessionRecord> {
    session_token(headers).and_then(|token| state.session_for(&token))
}

/// A CIMI status document: `{status, message, resource-id}`.
pub(crate) fn status_response(status: StatusCode, message: String, id: Option<&str>) -> Response {
    let mut body = json!({
        "status": status.as_u16(),
        "message": message,
    });
    if let Some(id) = id {
        body["resource-id"] = json!(id);
    }
    (status, Json(body)).into_response()
}

pub(crate) fn unauthorized(what: &str) -> Response {
    status_response(
        StatusCode::UNAUTHORIZED,
        format!("{what} requires an authenticated session"),
        None,
    )
}

pub(crate) fn not_found(id: &str) -> Response {
    status_response(StatusCode::NOT_FOUND, format!("{id} not found"), Some(id))
}
