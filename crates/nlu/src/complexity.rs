use core_types::{ComplexityScore, Entities};

const COMPLEX_KEYWORDS: &[&str] = &[
    "비교", "분석", "전망", "트렌드", "보고서", "종합",
    "compare", "analyze", "outlook", "trend", "report", "comprehensive",
];

const COMPARISON_KEYWORDS: &[&str] = &["비교", "대비", "vs", "compare"];
const ANALYSIS_KEYWORDS: &[&str] = &["분석", "analyze", "analysis"];

/// Scalar complexity score over surface features (spec §4.5).
///
/// `force_deep` overrides the computed score to `>= 0.95` as the spec
/// requires, rather than merely biasing it upward.
pub fn score_complexity(query: &str, entities: &Entities, intent_confidence: f64, force_deep: bool) -> ComplexityScore {
    if force_deep {
        return ComplexityScore::new(0.95);
    }

    let lowered = query.to_lowercase();
    let mut score = 0.0;

    // Length bonus.
    let len = query.chars().count();
    if len > 80 {
        score += 0.3;
    } else if len > 50 {
        score += 0.2;
    }

    // Complex-keyword bonus: 0.15 per hit, capped at 0.4.
    let hits = COMPLEX_KEYWORDS.iter().filter(|kw| lowered.contains(*kw)).count();
    score += (hits as f64 * 0.15).min(0.4);

    // Low-confidence intent bonus.
    if intent_confidence < 0.6 {
        score += 0.2;
    }

    // Multi-entity bonus.
    let company_count = entities.distinct_company_count();
    if company_count >= 3 {
        score += 0.4;
    } else if company_count == 2 {
        score += 0.3;
    }

    // Composite bonus: comparison AND analysis keywords together.
    let has_comparison = COMPARISON_KEYWORDS.iter().any(|kw| lowered.contains(kw));
    let has_analysis = ANALYSIS_KEYWORDS.iter().any(|kw| lowered.contains(kw));
    if has_comparison && has_analysis {
        score += 0.5;
    }

    ComplexityScore::new(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_scores_zero() {
        let score = score_complexity("", &Entities::default(), 1.0, false);
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn force_deep_overrides_to_at_least_095() {
        let score = score_complexity("2차전지", &Entities::default(), 1.0, true);
        assert!(score.score >= 0.95);
    }

    #[test]
    fn comparative_analysis_with_three_companies_exceeds_deep_threshold() {
        let mut entities = Entities::default();
        entities.companies.insert("삼성전자".into());
        entities.companies.insert("SK하이닉스".into());
        entities.companies.insert("마이크론".into());
        let score = score_complexity(
            "삼성전자와 SK하이닉스, 마이크론 HBM 경쟁력 비교 분석",
            &entities,
            0.9,
            false,
        );
        assert!(score.score >= 0.95, "expected >=0.95, got {}", score.score);
    }

    #[test]
    fn clamped_to_one() {
        let mut entities = Entities::default();
        entities.companies.insert("a".into());
        entities.companies.insert("b".into());
        entities.companies.insert("c".into());
        let long_query = "비교 분석 전망 트렌드 보고서 종합 ".repeat(10);
        let score = score_complexity(&long_query, &entities, 0.1, false);
        assert!(score.score <= 1.0);
    }
}
