use chrono::Utc;
use sha2::{Digest, Sha256};

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Composite, human-inspectable cache key (spec §3, §6):
/// `"{purpose}:{hash(query)}:{hourBucketIfTimeSensitive}:{param_hash}"`.
///
/// Time-sensitive artifacts (news hit lists, stock snapshots, final reports)
/// MUST set `time_sensitive` so the truncated current hour is folded into the
/// key — TTL alone cannot prevent serving stale analysis across hour
/// boundaries. Invariant-stable artifacts (query analysis, plan) should pass
/// `time_sensitive = false` and rely on a longer TTL instead.
pub fn fingerprint(purpose: &str, query: &str, params: &serde_json::Value, time_sensitive: bool) -> String {
    let query_hash = short_hash(&normalize(query));
    let param_hash = short_hash(&params.to_string());
    let hour_bucket = if time_sensitive {
        Utc::now().format("%Y%m%d%H").to_string()
    } else {
        "static".to_string()
    };
    format!("{purpose}:{query_hash}:{hour_bucket}:{param_hash}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_query_same_fingerprint() {
        let a = fingerprint("news", "Samsung Electronics", &serde_json::json!({"size": 5}), false);
        let b = fingerprint("news", "  samsung electronics  ", &serde_json::json!({"size": 5}), false);
        assert_eq!(a, b);
    }

    #[test]
    fn different_params_different_fingerprint() {
        let a = fingerprint("news", "q", &serde_json::json!({"size": 5}), false);
        let b = fingerprint("news", "q", &serde_json::json!({"size": 10}), false);
        assert_ne!(a, b);
    }

    #[test]
    fn time_sensitive_includes_hour_bucket() {
        let key = fingerprint("stock", "005930", &serde_json::json!({}), true);
        assert!(key.split(':').nth(2).unwrap() != "static");
    }
}
