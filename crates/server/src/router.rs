use crate::state::AppState;
use core_types::{AnalysisDepth, Intent, Query, Report};
use fast_handlers::{run_fast_handler, HandlerKind};
use nlu::{classify_intent, extract_entities, score_complexity};
use std::time::Duration;

/// Korean trigger phrases that force the Deep Path regardless of the
/// computed complexity score (spec §4.6 step 2).
const DEEP_TRIGGER_PHRASES: &[&str] = &["상세히", "자세히", "보고서", "심층"];

fn handler_kind_for(intent: Intent) -> HandlerKind {
    match intent {
        Intent::NewsInquiry => HandlerKind::News,
        Intent::StockAnalysis => HandlerKind::Stock,
        _ => HandlerKind::General,
    }
}

/// Route one query end to end (spec §4.6). Never returns a raw error: on an
/// unrecovered Deep Path failure it falls back to the Fast Handler matched
/// to the detected intent.
pub async fn route(mut query: Query, state: &AppState) -> Report {
    let entities = extract_entities(&query.text);
    let (intent, confidence) = classify_intent(&query.text);
    query.entities = entities;
    query.intent = intent;
    query.confidence = confidence;

    let triggers_deep = DEEP_TRIGGER_PHRASES.iter().any(|p| query.text.contains(p));
    let complexity = score_complexity(&query.text, &query.entities, confidence, query.force_deep || triggers_deep);

    let kind = handler_kind_for(intent);
    let go_deep = complexity.score >= state.config.router.deep_threshold || query.force_deep || triggers_deep;

    if !go_deep {
        return run_fast_handler(kind, &query, None, &state.handler_deps).await;
    }

    let depth = complexity.depth;
    let timeout = Duration::from_secs(depth_timeout_secs(&state.config.router.depth_timeouts_s, depth));

    let deep_result = tokio::time::timeout(
        timeout,
        deep_workflow::run_deep_workflow(query.clone(), &state.workflow_deps, depth),
    )
    .await;

    match deep_result {
        Ok(mut report) => {
            report.meta.processing_method = Some("deep".to_string());
            report.meta.complexity_score = Some(complexity.score);
            report.meta.analysis_depth = Some(depth);
            report.meta.fallback = Some(false);
            report
        }
        Err(_timeout) => {
            tracing::warn!(depth = ?depth, "deep workflow timed out, falling back to fast handler");
            let mut report = run_fast_handler(kind, &query, None, &state.handler_deps).await;
            report.meta.complexity_score = Some(complexity.score);
            report.meta.analysis_depth = Some(depth);
            report.meta.fallback = Some(true);
            report
        }
    }
}

fn depth_timeout_secs(configured: &[u64; 4], depth: AnalysisDepth) -> u64 {
    match depth {
        AnalysisDepth::Shallow => configured[0],
        AnalysisDepth::Standard => configured[1],
        AnalysisDepth::Deep => configured[2],
        AnalysisDepth::Comprehensive => configured[3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_timeout_secs_picks_the_matching_slot() {
        let configured = [60, 90, 120, 180];
        assert_eq!(depth_timeout_secs(&configured, AnalysisDepth::Shallow), 60);
        assert_eq!(depth_timeout_secs(&configured, AnalysisDepth::Standard), 90);
        assert_eq!(depth_timeout_secs(&configured, AnalysisDepth::Deep), 120);
        assert_eq!(depth_timeout_secs(&configured, AnalysisDepth::Comprehensive), 180);
    }

    #[test]
    fn handler_kind_for_maps_intents() {
        assert_eq!(handler_kind_for(Intent::NewsInquiry), HandlerKind::News);
        assert_eq!(handler_kind_for(Intent::StockAnalysis), HandlerKind::Stock);
        assert_eq!(handler_kind_for(Intent::GeneralQa), HandlerKind::General);
        assert_eq!(handler_kind_for(Intent::Unknown), HandlerKind::General);
    }

    #[test]
    fn deep_trigger_phrases_are_detected_by_substring() {
        assert!(DEEP_TRIGGER_PHRASES.iter().any(|p| "삼성전자 상세히 분석해줘".contains(p)));
        assert!(!DEEP_TRIGGER_PHRASES.iter().any(|p| "삼성전자 주가 알려줘".contains(p)));
    }
}
