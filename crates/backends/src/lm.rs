use crate::http_util::send_json;
use async_trait::async_trait;
use core_types::{CallContext, CoreError, CoreResult, LmBackend, LmOptions};
use serde::Deserialize;
use std::time::Duration;

/// HTTP adapter over the language-model runtime (spec §4.1). Enforces that a
/// caller never requests a generation timeout longer than the remaining
/// deadline, clamping and logging rather than failing the call outright.
#[derive(Clone)]
pub struct HttpLmBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpLmBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(180))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

#[async_trait]
impl LmBackend for HttpLmBackend {
    async fn generate(&self, ctx: &CallContext, prompt: &str, mut options: LmOptions) -> CoreResult<String> {
        let remaining = ctx.remaining();
        if options.timeout > remaining {
            tracing::warn!(
                requested_ms = options.timeout.as_millis(),
                remaining_ms = remaining.as_millis(),
                "LM generate timeout exceeds deadline, clamping"
            );
            options.timeout = remaining;
        }

        let url = format!("{}/generate", self.base_url);
        let body = serde_json::json!({
            "prompt": prompt,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });
        let builder = self.client.post(&url).json(&body).timeout(options.timeout);
        let response = send_json(ctx, &self.client, builder).await?;
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CoreError::ParseError(e.to_string()))?;
        Ok(parsed.text)
    }
}
