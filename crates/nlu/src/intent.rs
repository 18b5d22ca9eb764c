use core_types::Intent;
use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum normalized score to avoid falling back to `Unknown` (spec §4.4).
const CONFIDENCE_FLOOR: f64 = 0.2;

struct IntentBundle {
    intent: Intent,
    weight: f64,
    keywords: &'static [&'static str],
    context_words: &'static [&'static str],
    patterns: Lazy<Vec<Regex>>,
}

// The Korean-centric keyword bundles below are closed and authoritative
// (spec §9): extending them is a configuration change, not a code change.
static BUNDLES: &[IntentBundle] = &[
    IntentBundle {
        intent: Intent::NewsInquiry,
        weight: 1.0,
        keywords: &["뉴스", "기사", "소식", "news", "보도"],
        context_words: &["최근", "오늘", "어제"],
        patterns: Lazy::new(|| vec![Regex::new(r"(?i)\bnews\b").unwrap()]),
    },
    IntentBundle {
        intent: Intent::StockAnalysis,
        weight: 1.0,
        keywords: &[
            "주가", "주식", "종목", "투자", "매수", "매도", "실적", "stock", "price",
        ],
        context_words: &["전망", "목표가", "valuation"],
        patterns: Lazy::new(|| vec![Regex::new(r"(?i)\bstock\b").unwrap()]),
    },
    IntentBundle {
        intent: Intent::Comparison,
        weight: 1.2,
        keywords: &["비교", "대비", "vs", "compare", "경쟁력"],
        context_words: &["우위", "차이점"],
        patterns: Lazy::new(|| vec![Regex::new(r"(?i)\bvs\.?\b").unwrap()]),
    },
    IntentBundle {
        intent: Intent::Trend,
        weight: 1.0,
        keywords: &["전망", "트렌드", "트렌드분석", "outlook", "trend", "동향"],
        context_words: &["향후", "미래"],
        patterns: Lazy::new(Vec::new),
    },
    IntentBundle {
        intent: Intent::GeneralQa,
        weight: 0.6,
        keywords: &["무엇", "어떻게", "왜", "what", "how", "why"],
        context_words: &[],
        patterns: Lazy::new(Vec::new),
    },
];

/// Classify intent and confidence over the closed set (spec §4.4).
///
/// Each bundle contributes its weight once per distinct keyword/context/
/// pattern match found in the lowercased query. The highest-scoring intent
/// wins; confidence is that score normalized against the sum of all bundle
/// scores. Falls back to `Unknown` when the winning score is below
/// `CONFIDENCE_FLOOR` (0.2) or nothing matched at all.
pub fn classify_intent(query: &str) -> (Intent, f64) {
    let lowered = query.to_lowercase();
    let mut scores: Vec<(Intent, f64)> = Vec::with_capacity(BUNDLES.len());

    for bundle in BUNDLES {
        let mut matches = 0u32;
        for kw in bundle.keywords {
            if lowered.contains(kw) {
                matches += 1;
            }
        }
        for ctx in bundle.context_words {
            if lowered.contains(ctx) {
                matches += 1;
            }
        }
        for pattern in bundle.patterns.iter() {
            if pattern.is_match(&lowered) {
                matches += 1;
            }
        }
        scores.push((bundle.intent, bundle.weight * matches as f64));
    }

    let total: f64 = scores.iter().map(|(_, s)| s).sum();
    let (winner, winner_score) = scores
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .unwrap_or((Intent::Unknown, 0.0));

    if winner_score <= 0.0 || total <= 0.0 {
        return (Intent::Unknown, 0.0);
    }

    let confidence = winner_score / total;
    if confidence < CONFIDENCE_FLOOR {
        (Intent::Unknown, confidence)
    } else {
        (winner, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_function_over_identical_input() {
        let a = classify_intent("삼성전자 뉴스");
        let b = classify_intent("삼성전자 뉴스");
        assert_eq!(a.0, b.0);
        assert!((a.1 - b.1).abs() < f64::EPSILON);
    }

    #[test]
    fn news_inquiry_detected() {
        let (intent, confidence) = classify_intent("삼성전자 뉴스");
        assert_eq!(intent, Intent::NewsInquiry);
        assert!(confidence > 0.0);
    }

    #[test]
    fn comparison_outweighs_single_bundle() {
        let (intent, _) = classify_intent("삼성전자와 SK하이닉스 HBM 경쟁력 비교 분석");
        assert_eq!(intent, Intent::Comparison);
    }

    #[test]
    fn empty_query_is_unknown() {
        let (intent, confidence) = classify_intent("");
        assert_eq!(intent, Intent::Unknown);
        assert_eq!(confidence, 0.0);
    }
}
