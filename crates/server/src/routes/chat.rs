use crate::error::AppError;
use crate::response::ApiResponse;
use crate::router::route;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use core_types::{AnalysisDepth, Query, Report};
use nlu::{classify_intent, extract_entities, score_complexity};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Instant;

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/analyze", post(analyze))
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    #[serde(default)]
    pub force_deep: bool,
}

/// Primary chat endpoint (spec §6). Always returns a structured 200
/// envelope except on validation failure (spec §7).
async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ApiResponse<Report>>, AppError> {
    let text = req.query.trim();
    if text.is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }

    let mut query = Query::new(text);
    query.user_id = req.user_id;
    query.session_id = req.session_id;
    query.force_deep = req.force_deep;

    let _guard = observability::metrics::request_guard();
    let start = Instant::now();
    let report = route(query, &state).await;
    observability::metrics::observe_response_seconds(start.elapsed());
    observability::metrics::record_query(&intent_label(report.meta.intent), response_status(&report));

    Ok(Json(ApiResponse::success(report)))
}

fn intent_label(intent: Option<core_types::Intent>) -> String {
    match intent {
        Some(intent) => format!("{intent:?}"),
        None => "unknown".to_string(),
    }
}

fn response_status(report: &Report) -> &'static str {
    if report.meta.partial.unwrap_or(false) {
        "partial"
    } else {
        "ok"
    }
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
    #[serde(default)]
    pub analysis_depth: Option<String>,
    #[serde(default)]
    pub lookback_days: Option<u32>,
    pub domain: Option<String>,
    pub symbol: Option<String>,
}

/// Synchronous deep-analysis endpoint (spec §6): bypasses the router's
/// complexity gate and always runs the Deep Path at the requested depth.
///
/// `force_deep=true` carries Invariant 2 (spec §7): `meta.complexity_score
/// >= 0.95` and `meta.analysis_depth` in `{deep, comprehensive}`. Since this
/// handler never goes through `router::route`, it reproduces that half of
/// the Router's job directly: compute the complexity score the same way the
/// Router would (`force_deep=true` pins it to `0.95`), and clamp whatever
/// depth the caller requested up into `{Deep, Comprehensive}`.
async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<Report>>, AppError> {
    let text = req.query.trim();
    if text.is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }

    let mut query = Query::new(text);
    query.force_deep = true;
    query.lookback_days = Some(req.lookback_days.unwrap_or(180));
    query.domain = req.domain;
    query.symbol = req.symbol;

    let entities = extract_entities(&query.text);
    let (intent, confidence) = classify_intent(&query.text);
    query.entities = entities;
    query.intent = intent;
    query.confidence = confidence;

    let complexity = score_complexity(&query.text, &query.entities, confidence, true);

    let requested_depth = req
        .analysis_depth
        .as_deref()
        .and_then(|s| AnalysisDepthArg::from_str(s).ok())
        .map(AnalysisDepthArg::into_inner);
    let depth = match requested_depth {
        Some(AnalysisDepth::Deep) => AnalysisDepth::Deep,
        Some(AnalysisDepth::Comprehensive) => AnalysisDepth::Comprehensive,
        // Shallow/Standard requests, or none at all, are clamped up so
        // Invariant 2 holds regardless of caller input.
        _ => complexity.depth,
    };

    let _guard = observability::metrics::request_guard();
    let start = Instant::now();
    let mut report = deep_workflow::run_deep_workflow(query, &state.workflow_deps, depth).await;
    report.meta.complexity_score = Some(complexity.score);
    observability::metrics::observe_response_seconds(start.elapsed());
    observability::metrics::record_query(&intent_label(report.meta.intent), response_status(&report));

    Ok(Json(ApiResponse::success(report)))
}

struct AnalysisDepthArg(AnalysisDepth);

impl AnalysisDepthArg {
    fn into_inner(self) -> AnalysisDepth {
        self.0
    }
}

impl FromStr for AnalysisDepthArg {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shallow" => Ok(Self(AnalysisDepth::Shallow)),
            "standard" => Ok(Self(AnalysisDepth::Standard)),
            "deep" => Ok(Self(AnalysisDepth::Deep)),
            "comprehensive" => Ok(Self(AnalysisDepth::Comprehensive)),
            _ => Err(()),
        }
    }
}

