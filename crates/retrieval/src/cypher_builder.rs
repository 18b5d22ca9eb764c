use std::collections::HashMap;

/// Label → searchable-attribute map driving the per-label UNION blocks
/// (spec §4.8, §4.14 `context.graph_search_keys`). Configured, not hardcoded,
/// but shipped with the defaults spec.md names.
#[derive(Debug, Clone)]
pub struct LabelKeyMap(HashMap<String, Vec<String>>);

impl Default for LabelKeyMap {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert("Company".to_string(), vec!["name".into(), "alias".into()]);
        map.insert("Event".to_string(), vec!["title".into(), "name".into()]);
        map.insert("Technology".to_string(), vec!["name".into()]);
        map.insert("Theme".to_string(), vec!["name".into()]);
        map.insert("News".to_string(), vec!["title".into()]);
        map.insert("Program".to_string(), vec!["name".into()]);
        map.insert("Agency".to_string(), vec!["name".into()]);
        Self(map)
    }
}

impl LabelKeyMap {
    pub fn with(mut self, label: impl Into<String>, keys: Vec<String>) -> Self {
        self.0.insert(label.into(), keys);
        self
    }

    pub fn labels(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

/// Build a label-aware, direct-attribute graph query (spec §4.8).
///
/// Every block does `toLower(n.<key>) CONTAINS toLower($q)` so the label's
/// text index is used, rather than a generic `ANY(k IN keys(n) WHERE ...)`
/// which would force a full property scan and defeat the index. Per-label
/// blocks are combined with `UNION`, then sorted and limited once, with an
/// optional lookback window and domain filter applied after the union.
pub fn build_cypher(
    keywords: &[String],
    limit: usize,
    lookback_days: Option<u32>,
    domain: Option<&str>,
    key_map: &LabelKeyMap,
) -> (String, serde_json::Value) {
    let q = keywords.first().cloned().unwrap_or_default();

    let mut blocks = Vec::new();
    let mut sorted_labels: Vec<&String> = key_map.labels().collect();
    sorted_labels.sort();
    for label in sorted_labels {
        let keys = &key_map.0[label];
        let predicate = keys
            .iter()
            .map(|k| format!("toLower(n.{k}) CONTAINS toLower($q)"))
            .collect::<Vec<_>>()
            .join(" OR ");
        blocks.push(format!(
            "MATCH (n:{label}) WHERE {predicate} \
             RETURN n, labels(n) AS labels, \
             coalesce(n.published_at, n.award_date, n.lastSeenAt) AS ts"
        ));
    }

    let union_body = blocks.join("\nUNION\n");

    let cypher = format!(
        "CALL {{\n{union_body}\n}}\n\
         WITH n, labels, ts\n\
         WHERE ($lookback_days IS NULL OR ts >= datetime() - duration({{days: $lookback_days}}))\n\
         AND ($domain IS NULL OR n.domain = $domain)\n\
         RETURN n, labels, ts\n\
         ORDER BY ts DESC\n\
         LIMIT $limit"
    );

    let params = serde_json::json!({
        "q": q,
        "limit": limit,
        "lookback_days": lookback_days,
        "domain": domain,
    });

    (cypher, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_direct_attribute_access_not_generic_key_scan() {
        let (cypher, _) = build_cypher(&["HBM".to_string()], 20, Some(180), None, &LabelKeyMap::default());
        assert!(cypher.contains("toLower(n.name)"));
        assert!(!cypher.contains("ANY(k IN keys(n)"));
    }

    #[test]
    fn projects_uniform_shape() {
        let (cypher, _) = build_cypher(&["q".to_string()], 10, None, None, &LabelKeyMap::default());
        assert!(cypher.contains("RETURN n, labels, ts"));
        assert!(cypher.contains("LIMIT $limit"));
    }

    #[test]
    fn first_keyword_only_used_as_q_param() {
        let (_, params) = build_cypher(
            &["삼성전자".to_string(), "반도체".to_string()],
            5,
            None,
            None,
            &LabelKeyMap::default(),
        );
        assert_eq!(params["q"], "삼성전자");
    }
}
