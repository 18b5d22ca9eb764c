use crate::deps::WorkflowDeps;
use crate::json_extract::extract_deep_reasoning;
use cache::{fingerprint, Layers};
use context_engine::effective_quality_score;
use core_types::{
    AnalysisApproach, AnalysisPlan, CallContext, ContextItem, CoreError, Insight, LmOptions, Query,
    QueryAnalysis, Relationship, WorkflowState,
};
use retrieval::{build_cypher, fetch_all, GraphRequest, MarketRequest, SearchRequest};
use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Duration;

const LM_CALL_CAP: Duration = Duration::from_secs(45);
const DEFAULT_LOOKBACK_DAYS: u32 = 180;

fn lm_ctx(ctx: &CallContext) -> CallContext {
    let budget = LM_CALL_CAP.min(ctx.remaining());
    ctx.child(budget)
}

async fn call_lm_for_json(deps: &WorkflowDeps, ctx: &CallContext, prompt: &str) -> Result<String, CoreError> {
    let child = lm_ctx(ctx);
    let options = LmOptions {
        temperature: 0.2,
        max_tokens: 2048,
        timeout: child.remaining(),
    };
    deps.lm.generate(&child, prompt, options).await
}

// ---------------------------------------------------------------------------
// Node 1 — analyze_query
// ---------------------------------------------------------------------------

fn fallback_query_analysis(query: &Query) -> QueryAnalysis {
    QueryAnalysis {
        keywords: query.keywords.clone(),
        entities: query.entities.clone(),
        complexity: query.confidence,
        analysis_requirements: Vec::new(),
        focus_areas: Vec::new(),
        expected_output_type: "standard".to_string(),
    }
}

pub async fn node1_analyze_query(state: &mut WorkflowState, deps: &WorkflowDeps, ctx: &CallContext) {
    let query = state.query.clone().expect("WorkflowState requires a query");
    let key = fingerprint("query_analysis", &query.text, &serde_json::json!({}), false);

    if let Some(cached) = deps.cache.get::<QueryAnalysis>(&key).await {
        state.query_analysis = Some(cached);
        return;
    }

    let prompt = format!(
        "Analyze this query and return ONLY JSON with keys keywords, entities, complexity, \
         analysis_requirements, focus_areas, expected_output_type. Query: {}",
        query.text
    );

    let analysis = match call_lm_for_json(deps, ctx, &prompt).await {
        Ok(text) => serde_json::from_str::<QueryAnalysis>(&text).unwrap_or_else(|e| {
            state.record_diagnostic("analyze_query", format!("JSON parse failed: {e}"));
            fallback_query_analysis(&query)
        }),
        Err(e) => {
            state.record_diagnostic("analyze_query", format!("LM call failed: {e}"));
            fallback_query_analysis(&query)
        }
    };

    deps.cache
        .set(&key, &analysis, Duration::from_secs(24 * 3600), Layers::ALL)
        .await;
    state.query_analysis = Some(analysis);
}

// ---------------------------------------------------------------------------
// Node 2 — plan_analysis
// ---------------------------------------------------------------------------

fn empty_plan() -> AnalysisPlan {
    AnalysisPlan {
        primary_focus: HashSet::new(),
        comparison_axes: HashSet::new(),
        required_data_types: HashSet::new(),
        key_questions: Vec::new(),
        approach: AnalysisApproach::GeneralSynthesis,
    }
}

pub async fn node2_plan_analysis(state: &mut WorkflowState, deps: &WorkflowDeps, ctx: &CallContext) {
    let query = state.query.clone().expect("WorkflowState requires a query");
    let key = fingerprint(
        "analysis_plan",
        &query.text,
        &serde_json::json!({ "intent": query.intent }),
        false,
    );

    if let Some(cached) = deps.cache.get::<AnalysisPlan>(&key).await {
        state.analysis_plan = Some(cached);
        return;
    }

    let prompt = format!(
        "Produce an analysis plan as JSON with keys primary_focus, comparison_axes, \
         required_data_types, key_questions, approach (one of comparative, \
         single_entity_deep_dive, trend_analysis, general_synthesis). Query: {}",
        query.text
    );

    let plan = match call_lm_for_json(deps, ctx, &prompt).await {
        Ok(text) => serde_json::from_str::<AnalysisPlan>(&text).unwrap_or_else(|e| {
            state.record_diagnostic("plan_analysis", format!("JSON parse failed: {e}"));
            empty_plan()
        }),
        Err(e) => {
            state.record_diagnostic("plan_analysis", format!("LM call failed: {e}"));
            empty_plan()
        }
    };

    deps.cache
        .set(&key, &plan, Duration::from_secs(24 * 3600), Layers::ALL)
        .await;
    state.analysis_plan = Some(plan);
}

// ---------------------------------------------------------------------------
// Node 3 — collect_parallel_data
// ---------------------------------------------------------------------------

/// Time-sensitive fan-out artifacts (news hit lists, stock snapshots) get a
/// short, hour-bucketed TTL (spec §4.3's "Critical rule") rather than the
/// 24h invariant-stable TTL nodes 1/2 use.
const TIME_SENSITIVE_TTL: Duration = Duration::from_secs(900);

pub async fn node3_collect_parallel_data(state: &mut WorkflowState, deps: &WorkflowDeps, ctx: &CallContext) {
    let query = state.query.clone().expect("WorkflowState requires a query");
    let keywords = state
        .query_analysis
        .as_ref()
        .map(|qa| qa.keywords.clone())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| query.keywords.clone());
    let keywords = if keywords.is_empty() { vec![query.text.clone()] } else { keywords };

    let lookback_days = query.lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS);
    let (cypher, params) = build_cypher(&keywords, 30, Some(lookback_days), query.domain.as_deref(), &deps.key_map);
    let primary_keyword = keywords.first().cloned().unwrap_or_default();
    let symbol = query
        .symbol
        .clone()
        .or_else(|| query.entities.tickers.iter().next().cloned())
        .unwrap_or(primary_keyword.clone());

    let news_key = fingerprint(
        "news_hits",
        &primary_keyword,
        &serde_json::json!({"lookback_days": lookback_days, "domain": query.domain}),
        true,
    );
    let market_key = fingerprint("stock_snapshot", &symbol, &serde_json::json!({}), true);

    let cached_news: Option<Vec<core_types::NewsHit>> = deps.cache.get(&news_key).await;
    let cached_market: Option<core_types::StockSnapshot> = deps.cache.get(&market_key).await;

    let graph_breaker = deps.breakers.get("graph");
    let search_breaker = deps.breakers.get("search");
    let market_breaker = deps.breakers.get("market");

    let fetched = fetch_all(
        ctx,
        Some(GraphRequest {
            backend: &deps.graph,
            breaker: &graph_breaker,
            cypher: cypher.as_str(),
            params: params.clone(),
        }),
        cached_news.is_none().then(|| SearchRequest {
            backend: &deps.search,
            breaker: &search_breaker,
            query: primary_keyword.as_str(),
            filters: core_types::SearchFilters {
                lookback_days: Some(lookback_days),
                domain: query.domain.clone(),
            },
            size: 30,
        }),
        cached_market.is_none().then(|| MarketRequest {
            backend: &deps.market,
            breaker: &market_breaker,
            symbol: symbol.as_str(),
        }),
    )
    .await;

    let mut items: Vec<ContextItem> = Vec::new();
    if let Some(outcome) = &fetched.graph {
        if let Ok(rows) = &outcome.result {
            items.extend(
                rows.iter()
                    .cloned()
                    .map(fast_handlers::convert::graph_row_to_context_item),
            );
        } else if let Err(e) = &outcome.result {
            state.record_diagnostic("collect_parallel_data", format!("graph branch failed: {e}"));
        }
    }

    if let Some(hits) = cached_news {
        items.extend(hits.iter().cloned().map(fast_handlers::convert::news_hit_to_context_item));
    } else if let Some(outcome) = &fetched.search {
        match &outcome.result {
            Ok(hits) => {
                deps.cache.set(&news_key, hits, TIME_SENSITIVE_TTL, Layers::ALL).await;
                items.extend(hits.iter().cloned().map(fast_handlers::convert::news_hit_to_context_item));
            }
            Err(e) => state.record_diagnostic("collect_parallel_data", format!("search branch failed: {e}")),
        }
    }

    if let Some(snapshot) = cached_market {
        items.push(fast_handlers::convert::stock_snapshot_to_context_item(snapshot));
    } else if let Some(outcome) = &fetched.market {
        match &outcome.result {
            Ok(snapshot) => {
                deps.cache.set(&market_key, snapshot, TIME_SENSITIVE_TTL, Layers::ALL).await;
                items.push(fast_handlers::convert::stock_snapshot_to_context_item(snapshot.clone()));
            }
            Err(e) => state.record_diagnostic("collect_parallel_data", format!("market branch failed: {e}")),
        }
    }

    state.contexts = items;
}

// ---------------------------------------------------------------------------
// Node 4 — apply_context_engineering
// ---------------------------------------------------------------------------

fn context_text(item: &ContextItem) -> String {
    let mut text = item.title().unwrap_or_default().to_string();
    if let Some(s) = item.summary() {
        text.push(' ');
        text.push_str(s);
    }
    text
}

pub async fn node4_apply_context_engineering(state: &mut WorkflowState, deps: &WorkflowDeps, ctx: &CallContext) {
    let query = state.query.clone().expect("WorkflowState requires a query");
    let items = std::mem::take(&mut state.contexts);

    let query_embedding = deps.embedder.embed(ctx, &query.text).await.ok();

    let texts: Vec<String> = items.iter().map(context_text).collect();
    let mut item_embeddings = HashMap::new();
    if !texts.is_empty() {
        if let Ok(embeddings) = deps.embedder.embed_batch(ctx, &texts).await {
            for (i, emb) in embeddings.into_iter().enumerate() {
                item_embeddings.insert(i, emb);
            }
        }
    }

    let plan = state.analysis_plan.clone();
    let engineered = context_engine::engineer(
        items,
        query_embedding.as_deref(),
        item_embeddings,
        plan.as_ref(),
        &deps.context_config,
    );

    state.contexts = engineered.items;
    state.diversity_score = engineered.diversity_score;
}

// ---------------------------------------------------------------------------
// Node 5 — cross_validate_contexts
// ---------------------------------------------------------------------------

fn extract_percentages(text: &str) -> Vec<f64> {
    static RE: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| regex::Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap());
    RE.captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse::<f64>().ok()))
        .collect()
}

/// No LM call (spec §4.11 node 5): flags items whose stated percentage
/// figures contradict another item's for the same company token, then drops
/// whatever falls below a floor recomputed after the penalty.
pub async fn node5_cross_validate_contexts(state: &mut WorkflowState, _deps: &WorkflowDeps, _ctx: &CallContext) {
    let companies: Vec<String> = state
        .query
        .as_ref()
        .map(|q| q.entities.companies.iter().cloned().collect())
        .unwrap_or_default();

    let mut seen_percentages: HashMap<String, Vec<f64>> = HashMap::new();
    let texts: Vec<String> = state.contexts.iter().map(context_text).collect();

    for (idx, text) in texts.iter().enumerate() {
        let lower = text.to_lowercase();
        let company = companies.iter().find(|c| lower.contains(&c.to_lowercase()));
        if let Some(company) = company {
            let pcts = extract_percentages(text);
            let entry = seen_percentages.entry(company.clone()).or_default();
            for p in &pcts {
                if entry.iter().any(|existing| (existing - p).abs() > 5.0) {
                    state.contexts[idx].confidence *= 0.6;
                    state.record_diagnostic(
                        "cross_validate_contexts",
                        format!("possible contradiction for {company}: {p}% vs prior figure(s)"),
                    );
                }
            }
            entry.extend(pcts);
        }
    }

    let recomputed_floor = 0.25;
    state.contexts.retain(|item| item.confidence >= recomputed_floor);
}

// ---------------------------------------------------------------------------
// Node 6 — generate_insights
// ---------------------------------------------------------------------------

pub async fn node6_generate_insights(state: &mut WorkflowState, deps: &WorkflowDeps, ctx: &CallContext) {
    let summaries: Vec<String> = state.contexts.iter().take(20).map(context_text).collect();
    let prompt = format!(
        "Given this evidence, return ONLY a JSON array of insight objects with keys title, type \
         (quantitative|qualitative|temporal|comparative), finding, evidence (array of strings), \
         significance, confidence (0..1). Evidence:\n{}",
        summaries.join("\n- ")
    );

    state.insights = match call_lm_for_json(deps, ctx, &prompt).await {
        Ok(text) => serde_json::from_str::<Vec<Insight>>(&text).unwrap_or_else(|e| {
            state.record_diagnostic("generate_insights", format!("JSON parse failed: {e}"));
            Vec::new()
        }),
        Err(e) => {
            state.record_diagnostic("generate_insights", format!("LM call failed: {e}"));
            Vec::new()
        }
    };
}

// ---------------------------------------------------------------------------
// Node 7 — analyze_relationships
// ---------------------------------------------------------------------------

pub async fn node7_analyze_relationships(state: &mut WorkflowState, deps: &WorkflowDeps, ctx: &CallContext) {
    let summaries: Vec<String> = state.contexts.iter().take(20).map(context_text).collect();
    let prompt = format!(
        "Given this evidence, return ONLY a JSON array of relationship objects with keys kind \
         (news-entity|financial-news|event-market|supply-chain|competitive), entities (array of \
         strings), description, impact (high|medium|low), implication. Evidence:\n{}",
        summaries.join("\n- ")
    );

    state.relationships = match call_lm_for_json(deps, ctx, &prompt).await {
        Ok(text) => serde_json::from_str::<Vec<Relationship>>(&text).unwrap_or_else(|e| {
            state.record_diagnostic("analyze_relationships", format!("JSON parse failed: {e}"));
            Vec::new()
        }),
        Err(e) => {
            state.record_diagnostic("analyze_relationships", format!("LM call failed: {e}"));
            Vec::new()
        }
    };
}

// ---------------------------------------------------------------------------
// Node 8 — deep_reasoning
// ---------------------------------------------------------------------------

pub async fn node8_deep_reasoning(state: &mut WorkflowState, deps: &WorkflowDeps, ctx: &CallContext) {
    let insight_titles: Vec<String> = state.insights.iter().map(|i| i.title.clone()).collect();
    let prompt = format!(
        "Given these insights: {}, return JSON with keys why ({{causes, analysis}}), \
         how ({{mechanisms}}), what_if ({{scenarios: [{{scenario, probability, impact}}]}}), \
         so_what ({{investor_implications, actionable}}).",
        insight_titles.join(", ")
    );

    match call_lm_for_json(deps, ctx, &prompt).await {
        Ok(text) => {
            let (reasoning, diagnostic) = extract_deep_reasoning(&text);
            if let Some(d) = diagnostic {
                state.record_diagnostic("deep_reasoning", d);
            }
            state.deep_reasoning = Some(reasoning);
        }
        Err(e) => {
            state.record_diagnostic("deep_reasoning", format!("LM call failed: {e}"));
            state.deep_reasoning = Some(Default::default());
        }
    }
}

// ---------------------------------------------------------------------------
// Node 9 — synthesize_report
// ---------------------------------------------------------------------------

pub async fn node9_synthesize_report(state: &mut WorkflowState, deps: &WorkflowDeps, ctx: &CallContext) {
    let expected_output_type = state
        .query_analysis
        .as_ref()
        .map(|qa| qa.expected_output_type.clone())
        .unwrap_or_else(|| "standard".to_string());

    let prompt = format!(
        "Write a Markdown report with sections: Executive Summary, Market Context, Key Findings \
         (with evidence), Relationship & Competitive Analysis, Deep Reasoning, Investment \
         Perspective. Target length: {expected_output_type}. Use {} insights and {} relationships \
         gathered so far.",
        state.insights.len(),
        state.relationships.len()
    );

    state.draft_report = match call_lm_for_json(deps, ctx, &prompt).await {
        Ok(text) => Some(text),
        Err(e) => {
            state.record_diagnostic("synthesize_report", format!("LM call failed: {e}"));
            Some("## 보고서를 생성하지 못했습니다\n\n일시적인 오류로 전체 보고서를 생성할 수 없었습니다.".to_string())
        }
    };
}

// ---------------------------------------------------------------------------
// Node 10 — quality_check
// ---------------------------------------------------------------------------

fn reasoning_quadrant_score(reasoning: &core_types::DeepReasoning) -> f64 {
    let quadrants = [
        !reasoning.why_causes.is_empty() || !reasoning.why_analysis.is_empty(),
        !reasoning.how_mechanisms.is_empty(),
        !reasoning.what_if_scenarios.is_empty(),
        !reasoning.so_what_investor_implications.is_empty() || !reasoning.so_what_actionable.is_empty(),
    ];
    quadrants.iter().filter(|b| **b).count() as f64 / 4.0
}

/// No LM call (spec §4.11 node 10). Returns the computed score; the caller
/// decides whether to branch to `enhance_report`.
pub fn node10_quality_check(state: &mut WorkflowState) -> f64 {
    let avg_content_quality = if state.contexts.is_empty() {
        0.0
    } else {
        state.contexts.iter().map(effective_quality_score).sum::<f64>() / state.contexts.len() as f64
    };
    let context_score = avg_content_quality * 0.6 + state.diversity_score * 0.4;

    let insight_count_norm = (state.insights.len() as f64 / 5.0).min(1.0);
    let mean_confidence = if state.insights.is_empty() {
        0.0
    } else {
        state.insights.iter().map(|i| i.confidence).sum::<f64>() / state.insights.len() as f64
    };
    let total_evidence: usize = state.insights.iter().map(|i| i.evidence.len()).sum();
    let evidence_density = if state.insights.is_empty() {
        0.0
    } else {
        (total_evidence as f64 / (state.insights.len() as f64 * 3.0)).min(1.0)
    };
    let insight_score = insight_count_norm * 0.4 + mean_confidence * 0.3 + evidence_density * 0.3;

    let relationships_score = (state.relationships.len() as f64 / 3.0).min(1.0);

    let reasoning_score = state
        .deep_reasoning
        .as_ref()
        .map(reasoning_quadrant_score)
        .unwrap_or(0.0);

    let score = context_score * 0.30 + insight_score * 0.40 + relationships_score * 0.20 + reasoning_score * 0.10;
    state.quality_score = score.clamp(0.0, 1.0);
    state.quality_score
}

// ---------------------------------------------------------------------------
// enhance_report (conditional node)
// ---------------------------------------------------------------------------

pub async fn enhance_report(state: &mut WorkflowState, deps: &WorkflowDeps, ctx: &CallContext) {
    let draft = state.draft_report.clone().unwrap_or_default();
    let prompt = format!(
        "The following draft report scored low on completeness (score {:.2}). Revise it to add \
         more concrete evidence and close gaps in reasoning, keeping the same section structure. \
         Draft:\n{}",
        state.quality_score, draft
    );

    match call_lm_for_json(deps, ctx, &prompt).await {
        Ok(text) => state.draft_report = Some(text),
        Err(e) => state.record_diagnostic("enhance_report", format!("LM call failed: {e}")),
    }
    state.retry_count += 1;
}
