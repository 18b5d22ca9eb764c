use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use core_types::DegradationLevel;
use serde::Serialize;

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
}

async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "live"}))
}

#[derive(Serialize)]
struct BreakerStatus {
    name: String,
    phase: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    degradation: &'static str,
    breakers: Vec<BreakerStatus>,
}

/// Per-backend readiness and circuit states (spec §6). Degradation level
/// derives from how many of the three named backends currently sit open
/// (spec §5).
async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let degradation = state.breakers.degradation_level(&["graph", "search", "market"]).await;
    let breakers = state
        .breakers
        .all_states()
        .await
        .into_iter()
        .map(|s| BreakerStatus {
            name: s.name,
            phase: format!("{:?}", s.phase),
        })
        .collect();

    Json(ReadyResponse {
        status: if matches!(degradation, DegradationLevel::Emergency) { "unready" } else { "ready" },
        degradation: degradation_label(degradation),
        breakers,
    })
}

fn degradation_label(level: DegradationLevel) -> &'static str {
    match level {
        DegradationLevel::Full => "full",
        DegradationLevel::Degraded => "degraded",
        DegradationLevel::Minimal => "minimal",
        DegradationLevel::Emergency => "emergency",
    }
}
