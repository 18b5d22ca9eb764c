use core_types::Entities;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Curated company tokens (spec §4.4). Closed and authoritative; extending
/// this is a configuration change.
const COMPANIES: &[&str] = &[
    "삼성전자", "SK하이닉스", "LG에너지솔루션", "LG화학", "현대차", "기아",
    "네이버", "카카오", "포스코", "셀트리온", "삼성바이오로직스",
    "마이크론", "TSMC", "엔비디아", "애플", "테슬라",
];

const SECTORS: &[&str] = &[
    "반도체", "배터리", "2차전지", "자동차", "바이오", "조선", "철강", "게임", "통신",
];

// Product patterns are intentionally narrow and anchored with word
// boundaries so they do not collide with generic numeric suffixes such as
// "3개월" (a time expression), which a loose `\d+` pattern would also match.
static PRODUCT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bHBM[0-9]?\b").unwrap(),
        Regex::new(r"(?i)\bDDR[0-9]\b").unwrap(),
        Regex::new(r"(?i)\b[0-9]{1,2}nm\b").unwrap(),
        Regex::new(r"(?i)\b(?:GPU|NPU|CPU|EV|ESS)\b").unwrap(),
    ]
});

// A bare 6-digit Korean ticker code, anchored to avoid matching inside a
// longer digit run (e.g. a phone number or date fragment).
static TICKER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{6}\b").unwrap());

/// Extract company, product, sector, and ticker entities from a raw query
/// (spec §3, §4.4). Runs alongside intent classification, not dependent on it.
pub fn extract_entities(query: &str) -> Entities {
    let mut entities = Entities::default();

    for company in COMPANIES {
        if query.contains(company) {
            entities.companies.insert((*company).to_string());
        }
    }

    for sector in SECTORS {
        if query.contains(sector) {
            entities.sectors.insert((*sector).to_string());
        }
    }

    let mut products: HashSet<String> = HashSet::new();
    for pattern in PRODUCT_PATTERNS.iter() {
        for m in pattern.find_iter(query) {
            products.insert(m.as_str().to_string());
        }
    }
    entities.products = products;

    let mut tickers: HashSet<String> = HashSet::new();
    for m in TICKER_PATTERN.find_iter(query) {
        tickers.insert(m.as_str().to_string());
    }
    entities.tickers = tickers;

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_curated_companies() {
        let e = extract_entities("삼성전자와 SK하이닉스 HBM 경쟁력 비교 분석");
        assert!(e.companies.contains("삼성전자"));
        assert!(e.companies.contains("SK하이닉스"));
        assert_eq!(e.distinct_company_count(), 2);
    }

    #[test]
    fn product_pattern_does_not_collide_with_time_expression() {
        let e = extract_entities("3개월 안에 HBM3 출하 전망");
        assert!(e.products.contains("HBM3"));
        assert!(!e.products.iter().any(|p| p == "3개월"));
    }

    #[test]
    fn empty_query_has_no_entities() {
        let e = extract_entities("");
        assert!(e.is_empty());
    }
}
