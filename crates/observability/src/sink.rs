use async_trait::async_trait;

/// One observed LM call, handed to an optional external tracing sink (spec
/// §4.13: "LM calls are optionally traced through an external sink whose
/// client MUST be import-optional").
#[derive(Debug, Clone)]
pub struct LmCallTrace {
    pub node: String,
    pub prompt_chars: usize,
    pub response_chars: usize,
    pub elapsed_ms: u64,
    pub succeeded: bool,
}

/// Sink for LM call traces. The default, always-available implementation is
/// [`NoopSink`]; a real sink (e.g. an LLM-observability platform client) is
/// wired in behind this trait so its absence or misconfiguration never
/// breaks request handling — callers only ever see "trace sent" or
/// "trace dropped", never an error.
#[async_trait]
pub trait TracingSink: Send + Sync {
    async fn record(&self, trace: LmCallTrace);
}

/// Always-on fallback: drops every trace silently.
pub struct NoopSink;

#[async_trait]
impl TracingSink for NoopSink {
    async fn record(&self, _trace: LmCallTrace) {}
}

/// Sink that forwards traces as structured `tracing` events, for deployments
/// that have no external observability platform configured but still want
/// LM call traces in their log pipeline.
pub struct TracingEventSink;

#[async_trait]
impl TracingSink for TracingEventSink {
    async fn record(&self, trace: LmCallTrace) {
        tracing::info!(
            node = %trace.node,
            prompt_chars = trace.prompt_chars,
            response_chars = trace.response_chars,
            elapsed_ms = trace.elapsed_ms,
            succeeded = trace.succeeded,
            "lm_call_trace"
        );
    }
}

/// Build the configured sink. `enabled=false` or a missing/invalid
/// `host`/`secret` pair yields [`NoopSink`] rather than an error — tracing is
/// diagnostic, not load-bearing (spec §4.13, §4.14 `tracing.*`).
pub fn build_sink(enabled: bool, host: Option<&str>, secret: Option<&str>) -> Box<dyn TracingSink> {
    match (enabled, host, secret) {
        (true, Some(host), Some(secret)) if !host.is_empty() && !secret.is_empty() => {
            Box::new(TracingEventSink)
        }
        _ => Box::new(NoopSink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_config_yields_noop() {
        let sink = build_sink(false, Some("host"), Some("secret"));
        sink.record(LmCallTrace {
            node: "analyze_query".into(),
            prompt_chars: 10,
            response_chars: 20,
            elapsed_ms: 5,
            succeeded: true,
        })
        .await;
    }

    #[tokio::test]
    async fn missing_credentials_yields_noop() {
        let sink = build_sink(true, None, None);
        sink.record(LmCallTrace {
            node: "plan_analysis".into(),
            prompt_chars: 1,
            response_chars: 1,
            elapsed_ms: 1,
            succeeded: false,
        })
        .await;
    }
}
