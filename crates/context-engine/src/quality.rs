use core_types::ContextItem;
use once_cell::sync::Lazy;
use regex::Regex;

static DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());
static PERCENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(\.\d+)?\s*%").unwrap());
static MONEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\$|원|USD|KRW|billion|million|조|억)").unwrap());
static ENTITY_HINT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[가-힣]{2,}(전자|하이닉스|화학|그룹|증권)").unwrap());

fn body_text(item: &ContextItem) -> String {
    let mut text = String::new();
    if let Some(t) = item.title() {
        text.push_str(t);
        text.push(' ');
    }
    if let Some(s) = item.summary() {
        text.push_str(s);
        text.push(' ');
    }
    if let Some(body) = item.content.get("body").and_then(|v| v.as_str()) {
        text.push_str(body);
    }
    text
}

fn length_score(text: &str) -> f64 {
    (text.chars().count() as f64 / 600.0).min(1.0)
}

fn density_score(text: &str) -> f64 {
    let indicators = [
        DIGIT_RE.is_match(text),
        PERCENT_RE.is_match(text),
        MONEY_RE.is_match(text),
        ENTITY_HINT_RE.is_match(text),
    ];
    let hit = indicators.iter().filter(|b| **b).count();
    hit as f64 / indicators.len() as f64
}

fn title_quality(item: &ContextItem) -> f64 {
    match item.title() {
        Some(t) if t.chars().count() >= 10 && t.chars().count() <= 120 => 1.0,
        Some(t) if !t.is_empty() => 0.5,
        _ => 0.0,
    }
}

fn summary_presence(item: &ContextItem) -> f64 {
    if item.summary().map(|s| !s.is_empty()).unwrap_or(false) {
        1.0
    } else {
        0.0
    }
}

/// Locally computed fallback quality score (spec §4.10, §9) used whenever a
/// backend does not populate `quality_score` on a `ContextItem`.
pub fn compute_quality_score(item: &ContextItem) -> f64 {
    let text = body_text(item);
    let score = 0.4 * length_score(&text)
        + 0.3 * density_score(&text)
        + 0.15 * title_quality(item)
        + 0.15 * summary_presence(item);
    score.clamp(0.0, 1.0)
}

/// Resolve the item's effective quality score: backend-supplied if present,
/// else the local fallback.
pub fn effective_quality_score(item: &ContextItem) -> f64 {
    item.quality_score.unwrap_or_else(|| compute_quality_score(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{ContextSource, ContextType};

    #[test]
    fn dense_item_scores_higher_than_sparse() {
        let mut dense = ContextItem::new(ContextSource::Search, ContextType::Financial);
        dense.content.insert(
            "title".into(),
            "삼성전자 3분기 영업이익 12% 증가, 매출 70조원 돌파".into(),
        );
        dense.content.insert(
            "summary".into(),
            "삼성전자가 3분기 매출 70조원을 기록하며 전년 대비 12% 성장했다고 밝혔다.".into(),
        );

        let mut sparse = ContextItem::new(ContextSource::Search, ContextType::News);
        sparse.content.insert("title".into(), "단신".into());

        assert!(compute_quality_score(&dense) > compute_quality_score(&sparse));
    }

    #[test]
    fn fallback_respects_backend_supplied_value() {
        let mut item = ContextItem::new(ContextSource::Graph, ContextType::Company);
        item.quality_score = Some(0.42);
        assert_eq!(effective_quality_score(&item), 0.42);
    }
}
