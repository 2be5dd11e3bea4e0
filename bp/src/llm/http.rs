//! Shared HTTP plumbing for the provider clients

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, warn};

use super::LlmError;

/// Maximum number of retries for transient errors
pub(crate) const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
pub(crate) const INITIAL_BACKOFF_MS: u64 = 1000;

/// Longest wait honored from a `retry-after` header
const MAX_RETRY_WAIT: Duration = Duration::from_secs(30);

/// Build the HTTP client with the configured request timeout
pub(crate) fn build_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder().timeout(timeout).build().map_err(LlmError::Network)
}

/// How long to wait before retrying `err`, or `None` when it is final
///
/// `attempt` counts from zero. Rate limits wait what the provider asked for
/// (capped); other transient failures back off exponentially.
pub(crate) fn retry_delay(err: &LlmError, attempt: u32) -> Option<Duration> {
    if attempt >= MAX_RETRIES || !err.is_retryable() {
        return None;
    }
    let delay = err
        .retry_after()
        .map(|wait| wait.min(MAX_RETRY_WAIT))
        .unwrap_or_else(|| Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt)));
    Some(delay)
}

/// Send a JSON POST, retrying failures that [`LlmError::is_retryable`] allows
///
/// `build` is called once per attempt. Request timeouts become
/// [`LlmError::Timeout`] without a retry.
pub(crate) async fn post_with_retry<F>(build: F, timeout: Duration) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let err = match build().send().await {
            Ok(response) if response.status().is_success() => {
                debug!(attempt, "post_with_retry: success");
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "post_with_retry: API error");
                LlmError::from_status(status, retry_after, text)
            }
            Err(e) if e.is_timeout() => {
                debug!(attempt, "post_with_retry: request timed out");
                return Err(LlmError::Timeout(timeout));
            }
            Err(e) => {
                debug!(attempt, error = %e, "post_with_retry: network error");
                LlmError::Network(e)
            }
        };

        match retry_delay(&err, attempt) {
            Some(delay) => {
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "post_with_retry: retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            None => return Err(err),
        }
    }
}
