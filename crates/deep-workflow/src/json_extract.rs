use core_types::{DeepReasoning, WhatIfScenario};
use serde_json::Value;

/// All balanced `{...}` spans in `text`, largest first (spec §4.11 node 8:
/// "extract the largest balanced brace span, then progressively smaller
/// candidates"). Byte-indexed; safe because `{`/`}` are single-byte ASCII
/// and can never land inside a multi-byte UTF-8 sequence.
fn balanced_brace_spans(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut stack = Vec::new();
    let mut spans = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'{' {
            stack.push(i);
        } else if b == b'}' {
            if let Some(start) = stack.pop() {
                spans.push(&text[start..=i]);
            }
        }
    }
    spans.sort_by_key(|s| std::cmp::Reverse(s.len()));
    spans
}

fn string_array(v: Option<&Value>) -> Vec<String> {
    v.and_then(|x| x.as_array())
        .map(|arr| arr.iter().filter_map(|i| i.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

/// Map the nested `{why, how, what_if, so_what}` JSON shape (spec §3) onto
/// the flat `DeepReasoning` struct. Returns `None` if none of the four keys
/// are present at all, so the caller can keep searching smaller candidates.
fn map_deep_reasoning(v: &Value) -> Option<DeepReasoning> {
    let why = v.get("why");
    let how = v.get("how");
    let what_if = v.get("what_if");
    let so_what = v.get("so_what");
    if why.is_none() && how.is_none() && what_if.is_none() && so_what.is_none() {
        return None;
    }

    let mut dr = DeepReasoning::default();
    if let Some(w) = why {
        dr.why_causes = string_array(w.get("causes"));
        dr.why_analysis = w.get("analysis").and_then(|x| x.as_str()).unwrap_or_default().to_string();
    }
    if let Some(h) = how {
        dr.how_mechanisms = string_array(h.get("mechanisms"));
    }
    if let Some(wi) = what_if {
        if let Some(arr) = wi.get("scenarios").and_then(|x| x.as_array()) {
            dr.what_if_scenarios = arr
                .iter()
                .map(|item| WhatIfScenario {
                    scenario: item.get("scenario").and_then(|x| x.as_str()).unwrap_or_default().to_string(),
                    probability: item.get("probability").and_then(|x| x.as_f64()).unwrap_or(0.0),
                    impact: item.get("impact").and_then(|x| x.as_str()).unwrap_or_default().to_string(),
                })
                .collect();
        }
    }
    if let Some(sw) = so_what {
        dr.so_what_investor_implications = string_array(sw.get("investor_implications"));
        dr.so_what_actionable = string_array(sw.get("actionable"));
    }
    Some(dr)
}

/// Robustly recover a `DeepReasoning` from raw LM output (spec §4.11 node 8).
/// Tries the whole text first, then progressively smaller balanced-brace
/// candidates, accepting the first one that parses as JSON AND maps to a
/// struct with at least one populated quadrant. Falls back to an empty
/// structure with a diagnostic message when nothing qualifies.
pub fn extract_deep_reasoning(text: &str) -> (DeepReasoning, Option<String>) {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        if let Some(dr) = map_deep_reasoning(&v) {
            if dr.has_any_section() {
                return (dr, None);
            }
        }
    }

    for span in balanced_brace_spans(text) {
        if let Ok(v) = serde_json::from_str::<Value>(span) {
            if let Some(dr) = map_deep_reasoning(&v) {
                if dr.has_any_section() {
                    return (dr, None);
                }
            }
        }
    }

    (
        DeepReasoning::default(),
        Some("deep_reasoning: no parseable JSON span contained why/how/what_if/so_what".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let text = r#"{"why": {"causes": ["수요 증가"], "analysis": "설명"}, "how": {"mechanisms": []}, "what_if": {"scenarios": []}, "so_what": {"investor_implications": [], "actionable": []}}"#;
        let (dr, diag) = extract_deep_reasoning(text);
        assert!(diag.is_none());
        assert_eq!(dr.why_causes, vec!["수요 증가".to_string()]);
    }

    #[test]
    fn recovers_from_markdown_wrapped_json() {
        let text = "Sure, here is the analysis:\n```json\n{\"why\": {\"causes\": [\"a\"], \"analysis\": \"b\"}}\n```\nHope that helps.";
        let (dr, diag) = extract_deep_reasoning(text);
        assert!(diag.is_none());
        assert_eq!(dr.why_causes, vec!["a".to_string()]);
    }

    #[test]
    fn falls_back_to_empty_with_diagnostic_on_garbage() {
        let (dr, diag) = extract_deep_reasoning("not json at all");
        assert!(!dr.has_any_section());
        assert!(diag.is_some());
    }
}
