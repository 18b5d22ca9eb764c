pub mod config;
pub mod phases;
pub mod quality;
pub mod similarity;

use config::ContextEngineConfig;
use core_types::{AnalysisPlan, ContextItem};
use phases::ScoredItem;
use std::collections::HashMap;

pub use quality::{compute_quality_score, effective_quality_score};
pub use similarity::{cosine_similarity, jaccard_similarity};

/// Output of the six-phase pipeline: the surviving, reordered items plus a
/// diversity score over the final set (spec §4.10).
#[derive(Debug, Clone)]
pub struct EngineeredContext {
    pub items: Vec<ContextItem>,
    pub diversity_score: f64,
}

/// Run the six-phase Context Engineering pipeline (spec §4.10):
/// Relevance Cascade -> Semantic Filter -> Deduplication ->
/// Metadata-Enhanced Reranking -> Sequencing -> Final Pruning.
///
/// `item_embeddings` maps each input item's index (before any phase removes
/// entries) to a dense embedding; callers that did not embed an item may
/// simply omit it from the map. Embedding is an I/O concern, so this crate
/// never calls an embedder itself (spec §4.1 — only the adapter layer
/// performs network I/O).
pub fn engineer(
    items: Vec<ContextItem>,
    query_embedding: Option<&[f32]>,
    item_embeddings: HashMap<usize, Vec<f32>>,
    plan: Option<&AnalysisPlan>,
    config: &ContextEngineConfig,
) -> EngineeredContext {
    let stage1 = phases::phase1_relevance_cascade(items, config);
    let stage2 = phases::phase2_semantic_filter(stage1, query_embedding, item_embeddings, config);
    let stage3 = phases::phase3_deduplicate(stage2, config);
    let stage4 = phases::phase4_rerank(stage3, plan, config);
    let stage5 = phases::phase5_sequence(stage4, config);
    let stage6 = phases::phase6_prune(stage5, config);

    let diversity = phases::diversity_score(&stage6);
    let items: Vec<ContextItem> = stage6.into_iter().map(|s: ScoredItem| s.item).collect();

    EngineeredContext {
        items,
        diversity_score: diversity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{ContextSource, ContextType};

    fn item(source: ContextSource, item_type: ContextType, title: &str, confidence: f64) -> ContextItem {
        let mut it = ContextItem::new(source, item_type);
        it.content.insert("title".into(), title.into());
        it.confidence = confidence;
        it.relevance = 0.5;
        it
    }

    #[test]
    fn pipeline_never_exceeds_final_prune_top_n() {
        let config = ContextEngineConfig {
            final_prune_top_n: 5,
            ..Default::default()
        };
        let items: Vec<ContextItem> = (0..40)
            .map(|i| item(ContextSource::Search, ContextType::News, &format!("뉴스 제목 {i} 고유한 내용"), 0.9))
            .collect();

        let result = engineer(items, None, HashMap::new(), None, &config);
        assert!(result.items.len() <= 5);
    }

    #[test]
    fn low_confidence_items_are_dropped_by_relevance_cascade() {
        let config = ContextEngineConfig::default();
        let items = vec![
            item(ContextSource::Market, ContextType::Stock, "시세", 0.1),
            item(ContextSource::Graph, ContextType::Company, "회사 개요", 0.9),
        ];
        let result = engineer(items, None, HashMap::new(), None, &config);
        assert!(result.items.iter().all(|i| i.confidence >= config.confidence_floor));
    }

    #[test]
    fn exact_duplicate_titles_are_collapsed() {
        let config = ContextEngineConfig::default();
        let mut a = item(ContextSource::Search, ContextType::News, "삼성전자 실적 발표", 0.9);
        a.quality_score = Some(0.3);
        let mut b = item(ContextSource::Search, ContextType::News, "삼성전자 실적 발표", 0.9);
        b.quality_score = Some(0.8);

        let result = engineer(vec![a, b], None, HashMap::new(), None, &config);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].quality_score, Some(0.8));
    }

    #[test]
    fn diversity_score_is_zero_for_single_item() {
        let config = ContextEngineConfig::default();
        let items = vec![item(ContextSource::Graph, ContextType::Company, "단일 항목", 0.9)];
        let result = engineer(items, None, HashMap::new(), None, &config);
        assert_eq!(result.diversity_score, 0.0);
    }

    #[test]
    fn sequencing_places_company_before_news_before_market() {
        let config = ContextEngineConfig::default();
        let items = vec![
            item(ContextSource::Market, ContextType::Stock, "시세 정보 업데이트", 0.9),
            item(ContextSource::Search, ContextType::News, "최신 뉴스 속보", 0.9),
            item(ContextSource::Graph, ContextType::Company, "회사 배경 정보", 0.9),
        ];
        let result = engineer(items, None, HashMap::new(), None, &config);
        let types: Vec<ContextType> = result.items.iter().map(|i| i.item_type).collect();
        let company_pos = types.iter().position(|t| *t == ContextType::Company);
        let news_pos = types.iter().position(|t| *t == ContextType::News);
        let stock_pos = types.iter().position(|t| *t == ContextType::Stock);
        assert!(company_pos < news_pos);
        assert!(news_pos < stock_pos);
    }
}
