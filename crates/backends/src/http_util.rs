use core_types::{CallContext, CoreError, CoreResult};

/// Shared request-send-and-classify helper (grounded on
/// `polygon-client`'s `send_request`): builds the request, races it against
/// the call's remaining deadline, and classifies failures into the closed
/// `CoreError` set so nothing upstream of this crate ever sees a
/// `reqwest::Error` (spec §4.1, §7).
pub async fn send_json(
    ctx: &CallContext,
    client: &reqwest::Client,
    builder: reqwest::RequestBuilder,
) -> CoreResult<reqwest::Response> {
    let remaining = ctx.remaining();
    if remaining.is_zero() {
        return Err(CoreError::Timeout(remaining));
    }

    let request = builder.build().map_err(|e| CoreError::ValidationError(e.to_string()))?;
    let client_timeout = remaining;

    let outcome = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return Err(CoreError::Cancelled),
        result = tokio::time::timeout(client_timeout, client.execute(request)) => result,
    };

    let response = match outcome {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => {
            if err.is_timeout() {
                return Err(CoreError::Timeout(client_timeout));
            }
            return Err(CoreError::BackendUnavailable(err.to_string()));
        }
        Err(_elapsed) => return Err(CoreError::Timeout(client_timeout)),
    };

    classify_status(response).await
}

async fn classify_status(response: reqwest::Response) -> CoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 429 || status.is_server_error() {
        return Err(CoreError::BackendUnavailable(format!("HTTP {status}")));
    }
    let body = response.text().await.unwrap_or_default();
    Err(CoreError::UpstreamError(format!("HTTP {status}: {body}")))
}

pub async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> CoreResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| CoreError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn zero_remaining_deadline_fails_fast_without_sending() {
        let ctx = CallContext::new(Duration::from_millis(0));
        tokio::time::sleep(Duration::from_millis(5)).await;
        let client = reqwest::Client::new();
        let builder = client.get("http://127.0.0.1:1/unused");
        let result = send_json(&ctx, &client, builder).await;
        assert!(matches!(result, Err(CoreError::Timeout(_))));
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let ctx = CallContext::new(Duration::from_secs(30));
        ctx.cancel.cancel();
        let client = reqwest::Client::new();
        let builder = client.get("http://127.0.0.1:1/unused");
        let result = send_json(&ctx, &client, builder).await;
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }
}
