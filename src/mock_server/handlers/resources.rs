//! Generic collection and resource handlers.
//!
//! Every collection other than `session` is served here; collections
//! marked protected answer 401 to requests without a valid session.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::{current_session, not_found, status_response, unauthorized};
use crate::mock_server::state::MockState;

/// Resolve the collection and check access. On failure, returns the
/// response to send instead.
fn authorize<'a>(
    state: &'a MockState,
    href: &str,
    headers: &HeaderMap,
) -> Result<(&'a str, Option<String>), Response> {
    let Some((name, collection)) = state.collection(href) else {
        return Err(not_found(href));
    };

    let owner = current_session(state, headers).map(|s| format!("user/{}", s.username));
    if collection.protected && owner.is_none() {
        return Err(unauthorized(href));
    }
    Ok((name, owner))
}

/// POST /api/{collection}
pub async fn add_resource(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.write().await;
    let owner = match authorize(&state, &collection, &headers) {
        Ok((_, owner)) => owner,
        Err(response) => return response,
    };

    let id = state.create_resource(&collection, &body, owner.as_deref());
    status_response(StatusCode::CREATED, format!("{id} created"), Some(&id))
}

/// GET /api/{collection}
///
/// Supports `$first`/`$last` windows (1-based, inclusive) and a single
/// `attribute='value'` `$filter`.
pub async fn search_resources(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(collection): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let state = state.read().await;
    let name = match authorize(&state, &collection, &headers) {
        Ok((name, _)) => name.to_string(),
        Err(response) => return response,
    };

    let matching = state.list_resources(&collection, query.get("$filter").map(String::as_str));
    let count = matching.len();

    let first = query
        .get("$first")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let last = query
        .get("$last")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(count);

    let window: Vec<Value> = matching
        .into_iter()
        .skip(first - 1)
        .take((last + 1).saturating_sub(first))
        .cloned()
        .collect();

    let mut body = json!({
        "id": collection,
        "count": count,
        "operations": [{ "rel": "add", "href": collection }],
    });
    body[name] = Value::Array(window);

    (StatusCode::OK, Json(body)).into_response()
}

/// GET /api/{collection}/{uuid}
pub async fn get_resource(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((collection, uuid)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let state = state.read().await;
    if let Err(response) = authorize(&state, &collection, &headers) {
        return response;
    }

    let id = format!("{collection}/{uuid}");
    match state.get_resource(&id) {
        Some(resource) => (StatusCode::OK, Json(resource.clone())).into_response(),
        None => not_found(&id),
    }
}

/// PUT /api/{collection}/{uuid}
pub async fn edit_resource(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((collection, uuid)): Path<(String, String)>,
    headers: HeaderMap,
    Json(changes): Json<Value>,
) -> Response {
    let mut state = state.write().await;
    if let Err(response) = authorize(&state, &collection, &headers) {
        return response;
    }

    let id = format!("{collection}/{uuid}");
    match state.update_resource(&id, &changes) {
        Some(resource) => (StatusCode::OK, Json(resource.clone())).into_response(),
        None => not_found(&id),
    }
}

/// DELETE /api/{collection}/{uuid}
pub async fn delete_resource(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((collection, uuid)): Path<(String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let mut state = state.write().await;
    if let Err(response) = authorize(&state, &collection, &headers) {
        return response;
    }

    let id = format!("{collection}/{uuid}");
    if state.delete_resource(&id) {
        status_response(StatusCode::OK, format!("{id} deleted"), Some(&id))
    } else {
        not_found(&id)
    }
}
