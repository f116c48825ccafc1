//! Cloud entry point handler.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use tokio::sync::RwLock;

use crate::mock_server::state::MockState;

/// GET /api/cloud-entry-point
pub async fn cloud_entry_point(State(state): State<Arc<RwLock<MockState>>>) -> impl IntoResponse {
    let state = state.read().await;
    Json(state.entry_point())
}
