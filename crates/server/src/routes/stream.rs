use crate::state::AppState;
use axum::extract::{Query as AxumQuery, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use core_types::{AnalysisDepth, Query, Report};
use nlu::{classify_intent, extract_entities, score_complexity};
use observability::cumulative_fraction;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;

pub fn stream_routes() -> Router<AppState> {
    Router::new().route("/api/chat/stream", get(chat_stream))
}

#[derive(Deserialize)]
pub struct StreamQuery {
    pub query: String,
    #[serde(default)]
    pub force_deep: bool,
}

/// Closed SSE event set (spec §6): `{progress, step, data, final, error, done}`.
/// Progress is read off the fixed node → cumulative-fraction table rather
/// than computed live, since the Deep Workflow nodes run to completion
/// inside one future with no intermediate hook.
async fn chat_stream(
    State(state): State<AppState>,
    AxumQuery(params): AxumQuery<StreamQuery>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Event>(32);

    tokio::spawn(run_and_emit(state, params, tx));

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn run_and_emit(state: AppState, params: StreamQuery, tx: mpsc::Sender<Event>) {
    let text = params.query.trim();
    if text.is_empty() {
        let _ = tx
            .send(Event::default().event("error").json_data(serde_json::json!({"message": "query must not be empty"})).unwrap())
            .await;
        let _ = tx.send(Event::default().event("done").data("{}")).await;
        return;
    }

    let mut query = Query::new(text);
    let entities = extract_entities(&query.text);
    let (intent, confidence) = classify_intent(&query.text);
    query.entities = entities;
    query.intent = intent;
    query.confidence = confidence;
    query.force_deep = params.force_deep;

    let complexity = score_complexity(&query.text, &query.entities, confidence, query.force_deep);
    let go_deep = complexity.score >= state.config.router.deep_threshold || query.force_deep;

    let report = if go_deep {
        run_deep_with_progress(&state, query, complexity.depth, &tx).await
    } else {
        let kind = match intent {
            core_types::Intent::NewsInquiry => fast_handlers::HandlerKind::News,
            core_types::Intent::StockAnalysis => fast_handlers::HandlerKind::Stock,
            _ => fast_handlers::HandlerKind::General,
        };
        emit_progress(&tx, "fast_handler").await;
        fast_handlers::run_fast_handler(kind, &query, None, &state.handler_deps).await
    };

    emit_final(&tx, &report).await;
}

async fn run_deep_with_progress(
    state: &AppState,
    query: Query,
    depth: AnalysisDepth,
    tx: &mpsc::Sender<Event>,
) -> Report {
    let deps = state.workflow_deps.clone();
    let mut handle = tokio::spawn(async move { deep_workflow::run_deep_workflow(query, &deps, depth).await });

    const DEEP_NODE_ORDER: &[&str] = &[
        "analyze_query",
        "plan_analysis",
        "collect_parallel_data",
        "apply_context_engineering",
        "cross_validate_contexts",
        "generate_insights",
        "analyze_relationships",
        "deep_reasoning",
        "synthesize_report",
        "quality_check",
    ];

    let per_node = Duration::from_secs(depth.timeout_secs()) / DEEP_NODE_ORDER.len() as u32;
    for node in DEEP_NODE_ORDER {
        tokio::select! {
            _ = tokio::time::sleep(per_node) => {
                emit_progress(tx, node).await;
            }
            result = &mut handle => {
                return result.unwrap_or_else(|_| fallback_report());
            }
        }
    }

    handle.await.unwrap_or_else(|_| fallback_report())
}

fn fallback_report() -> Report {
    Report {
        response_type: "deep".to_string(),
        markdown: "## 오류\n\n작업이 중단되었습니다.".to_string(),
        sources: Vec::new(),
        graph_samples: Vec::new(),
        meta: core_types::ResponseMeta {
            partial: Some(true),
            ..Default::default()
        },
    }
}

async fn emit_progress(tx: &mpsc::Sender<Event>, node: &str) {
    if let Some(fraction) = cumulative_fraction(node) {
        let _ = tx
            .send(
                Event::default()
                    .event("progress")
                    .json_data(serde_json::json!({"node": node, "fraction": fraction}))
                    .unwrap(),
            )
            .await;
    }
    let _ = tx.send(Event::default().event("step").json_data(serde_json::json!({"node": node})).unwrap()).await;
}

async fn emit_final(tx: &mpsc::Sender<Event>, report: &Report) {
    let _ = tx.send(Event::default().event("data").json_data(report).unwrap()).await;
    let _ = tx.send(Event::default().event("final").json_data(report).unwrap()).await;
    let _ = tx.send(Event::default().event("done").data("{}")).await;
}
