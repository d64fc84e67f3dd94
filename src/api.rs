//! HTTP API endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub rooms: usize,
    pub connections: usize,
    pub active_games: usize,
}

/// Liveness plus live room counts.
///
/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.stats().await;
    Json(HealthResponse {
        status: "ok",
        rooms: stats.rooms,
        connections: stats.connections,
        active_games: stats.active_games,
    })
}
