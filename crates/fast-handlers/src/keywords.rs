use core_types::{CallContext, LmBackend, LmOptions, Query};
use std::time::Duration;

const STOPWORDS: &[&str] = &[
    "이", "가", "은", "는", "을", "를", "의", "에", "에서", "으로", "와", "과", "도", "만",
    "the", "a", "an", "of", "in", "on", "for", "to", "and", "is", "are",
];

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|tok| {
            tok.trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|tok| !tok.is_empty() && !STOPWORDS.contains(&tok.to_lowercase().as_str()))
        .collect()
}

/// Rule-based keyword refinement with an optional LM fallback bounded to a
/// hard 1-second budget (spec §4.7 step 1). Never blocks the handler's
/// overall soft budget of 1.5s by more than that second.
pub async fn refine_keywords(query: &Query, lm: Option<&dyn LmBackend>, ctx: &CallContext) -> Vec<String> {
    if !query.keywords.is_empty() {
        return query.keywords.clone();
    }

    let rule_based = tokenize(&query.text);
    if !rule_based.is_empty() {
        return rule_based;
    }

    let Some(lm) = lm else {
        return Vec::new();
    };

    let budget = Duration::from_secs(1).min(ctx.remaining());
    let child_ctx = ctx.child(budget);
    let prompt = format!("Extract 3-5 search keywords from this query, comma separated: {}", query.text);
    let options = LmOptions {
        timeout: budget,
        max_tokens: 64,
        ..LmOptions::default()
    };

    match lm.generate(&child_ctx, &prompt, options).await {
        Ok(text) => text
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(err) => {
            tracing::warn!(error = %err, "keyword refinement LM fallback failed, proceeding with none");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_stopwords_and_punctuation() {
        let tokens = tokenize("삼성전자의 실적은? 어떤가요");
        assert!(!tokens.iter().any(|t| t == "의" || t == "은"));
        assert!(tokens.iter().any(|t| t.contains("삼성전자")));
    }
}
