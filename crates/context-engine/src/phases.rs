use crate::config::ContextEngineConfig;
use crate::quality::effective_quality_score;
use crate::similarity::{cosine_similarity, jaccard_similarity, normalize_title};
use chrono::Utc;
use core_types::{AnalysisPlan, ContextItem, ContextType};
use std::collections::HashMap;

/// A context item plus its (optional) dense embedding, threaded through the
/// six phases so later phases can reuse earlier similarity computations
/// without re-embedding.
pub struct ScoredItem {
    pub item: ContextItem,
    pub embedding: Option<Vec<f32>>,
    pub score: f64,
}

impl ScoredItem {
    fn text_for_similarity(&self) -> String {
        let mut text = self.item.title().unwrap_or_default().to_string();
        if let Some(s) = self.item.summary() {
            text.push(' ');
            text.push_str(s);
        }
        text
    }
}

fn recency_factor(item: &ContextItem, half_life_days: f64) -> f64 {
    match item.timestamp {
        Some(ts) => {
            let age_days = (Utc::now() - ts).num_seconds() as f64 / 86_400.0;
            if age_days <= 0.0 {
                1.0
            } else {
                0.5f64.powf(age_days / half_life_days)
            }
        }
        None => 1.0,
    }
}

/// Phase 1 — Relevance Cascade (spec §4.10): weight by source priority and
/// recency decay, then drop anything below the confidence floor.
pub fn phase1_relevance_cascade(items: Vec<ContextItem>, config: &ContextEngineConfig) -> Vec<ScoredItem> {
    items
        .into_iter()
        .filter_map(|mut item| {
            let source_weight = item.source.weight();
            let recency = recency_factor(&item, config.recency_half_life_days);
            item.confidence = (item.confidence * source_weight * recency).clamp(0.0, 1.0);
            if item.confidence < config.confidence_floor {
                None
            } else {
                Some(ScoredItem {
                    item,
                    embedding: None,
                    score: 0.0,
                })
            }
        })
        .collect()
}

/// Phase 2 — Semantic Filter (spec §4.10): rank by cosine similarity to the
/// query embedding and keep the top-M under a diversity constraint (minimum
/// pairwise dissimilarity `tau` between any two retained items).
pub fn phase2_semantic_filter(
    mut items: Vec<ScoredItem>,
    query_embedding: Option<&[f32]>,
    item_embeddings: HashMap<usize, Vec<f32>>,
    config: &ContextEngineConfig,
) -> Vec<ScoredItem> {
    for (idx, item) in items.iter_mut().enumerate() {
        if let Some(emb) = item_embeddings.get(&idx) {
            item.embedding = Some(emb.clone());
        }
        let similarity = match (query_embedding, item.embedding.as_deref()) {
            (Some(q), Some(e)) => cosine_similarity(q, e),
            _ => item.item.relevance.max(0.5),
        };
        item.item.relevance = similarity.clamp(0.0, 1.0);
    }

    items.sort_by(|a, b| b.item.relevance.partial_cmp(&a.item.relevance).unwrap());

    let mut selected: Vec<ScoredItem> = Vec::new();
    for candidate in items {
        if selected.len() >= config.semantic_top_m {
            break;
        }
        let too_similar = selected.iter().any(|s| {
            let sim = match (s.embedding.as_deref(), candidate.embedding.as_deref()) {
                (Some(a), Some(b)) => cosine_similarity(a, b),
                _ => jaccard_similarity(&s.text_for_similarity(), &candidate.text_for_similarity()),
            };
            (1.0 - sim) < config.diversity_tau
        });
        if !too_similar || selected.is_empty() {
            selected.push(candidate);
        }
    }
    selected
}

/// Phase 3 — Deduplication (spec §4.10): exact dedup by normalized title,
/// then semantic dedup over a sliding window of recent items.
pub fn phase3_deduplicate(items: Vec<ScoredItem>, config: &ContextEngineConfig) -> Vec<ScoredItem> {
    let mut by_title: HashMap<String, ScoredItem> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for item in items {
        let key = item
            .item
            .title()
            .map(normalize_title)
            .unwrap_or_else(|| format!("untitled-{}", order.len()));
        match by_title.get(&key) {
            Some(existing) if effective_quality_score(&existing.item) >= effective_quality_score(&item.item) => {
                // existing wins, drop incoming
            }
            _ => {
                if !by_title.contains_key(&key) {
                    order.push(key.clone());
                }
                by_title.insert(key, item);
            }
        }
    }
    let exact_deduped: Vec<ScoredItem> = order.into_iter().filter_map(|k| by_title.remove(&k)).collect();

    let mut retained: Vec<ScoredItem> = Vec::with_capacity(exact_deduped.len());
    for candidate in exact_deduped {
        let window_start = retained.len().saturating_sub(config.dedup_window);
        let mut duplicate_of: Option<usize> = None;
        for (i, existing) in retained[window_start..].iter().enumerate() {
            let sim = match (existing.embedding.as_deref(), candidate.embedding.as_deref()) {
                (Some(a), Some(b)) => cosine_similarity(a, b),
                _ => jaccard_similarity(&existing.text_for_similarity(), &candidate.text_for_similarity()),
            };
            if sim >= config.dedup_threshold {
                duplicate_of = Some(window_start + i);
                break;
            }
        }

        match duplicate_of {
            Some(idx) => {
                if effective_quality_score(&candidate.item) > effective_quality_score(&retained[idx].item) {
                    retained[idx] = candidate;
                }
            }
            None => retained.push(candidate),
        }
    }
    retained
}

/// Phase 4 — Metadata-Enhanced Reranking (spec §4.10). Weights are tunable
/// configuration (spec §9); tests assert monotonicity and additivity, not
/// absolute scores.
pub fn phase4_rerank(mut items: Vec<ScoredItem>, plan: Option<&AnalysisPlan>, config: &ContextEngineConfig) -> Vec<ScoredItem> {
    for scored in items.iter_mut() {
        let semantic = scored.item.relevance;
        let source_weight_norm = scored.item.source.weight() / 1.3;
        let recency = recency_factor(&scored.item, config.recency_half_life_days);
        let base = semantic * 0.30 + source_weight_norm * 0.12 + recency * 0.08;

        let quality = effective_quality_score(&scored.item);
        let featured_bonus = if scored.item.is_featured { 0.10 } else { 0.0 };
        let synced_bonus = if scored.item.synced { 0.05 } else { 0.0 };
        let degree_bonus = (scored.item.graph_degree as f64 / 10.0).min(0.10);
        let schema = quality * 0.15 + featured_bonus + synced_bonus + degree_bonus;

        let plan_alignment = plan
            .map(|p| {
                let text = scored.text_for_similarity().to_lowercase();
                let keyword_matches = p
                    .primary_focus
                    .iter()
                    .filter(|kw| text.contains(&kw.to_lowercase()))
                    .count();
                let type_match = p.required_data_types.contains(&scored.item.item_type);
                let mut alignment = keyword_matches as f64 * 0.1;
                if type_match {
                    alignment += 0.2;
                }
                alignment.min(0.2)
            })
            .unwrap_or(0.0);

        scored.score = (base + schema + plan_alignment).clamp(0.0, 1.0);
    }

    items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    items
}

fn sequencing_bucket(item_type: ContextType) -> u8 {
    match item_type {
        ContextType::Company => 0,
        ContextType::News | ContextType::Event => 1,
        ContextType::Analysis | ContextType::Financial => 2,
        ContextType::Stock => 3,
    }
}

/// Phase 5 — Sequencing (spec §4.10): reorder so the reader sees background,
/// then current news, then interpretation, then market corroboration.
pub fn phase5_sequence(mut items: Vec<ScoredItem>, config: &ContextEngineConfig) -> Vec<ScoredItem> {
    items.sort_by(|a, b| {
        let bucket_a = sequencing_bucket(a.item.item_type);
        let bucket_b = sequencing_bucket(b.item.item_type);
        if bucket_a != bucket_b {
            return bucket_a.cmp(&bucket_b);
        }
        let blend_a = 0.5 * recency_factor(&a.item, config.recency_half_life_days) + 0.5 * a.item.relevance;
        let blend_b = 0.5 * recency_factor(&b.item, config.recency_half_life_days) + 0.5 * b.item.relevance;
        blend_b.partial_cmp(&blend_a).unwrap()
    });
    items
}

/// Phase 6 — Final Pruning (spec §4.10): keep the top-30 items in their
/// already-sequenced order.
pub fn phase6_prune(mut items: Vec<ScoredItem>, config: &ContextEngineConfig) -> Vec<ScoredItem> {
    items.truncate(config.final_prune_top_n);
    items
}

/// Mean pairwise dissimilarity of the retained set (spec §4.10 glossary
/// "Diversity score"). O(n^2) — bounded by `final_prune_top_n`.
pub fn diversity_score(items: &[ScoredItem]) -> f64 {
    if items.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let sim = match (items[i].embedding.as_deref(), items[j].embedding.as_deref()) {
                (Some(a), Some(b)) => cosine_similarity(a, b),
                _ => jaccard_similarity(&items[i].text_for_similarity(), &items[j].text_for_similarity()),
            };
            total += 1.0 - sim;
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f64
    }
}
