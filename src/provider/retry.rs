//! Rate-limit aware request retry.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;

/// A provider HTTP response before JSON decoding.
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub body: String,
}

/// Sends a request, retrying 429 responses with backoff. Transport errors
/// return immediately; a 429 that survives every retry is returned as a
/// normal response for the caller to surface.
pub(crate) async fn send_with_retry<F, Fut>(send: F, max_retries: u32) -> Result<RawResponse>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<RawResponse>>,
{
    let mut attempt = 0u32;
    loop {
        let resp = send().await?;
        if resp.status != 429 || attempt >= max_retries {
            return Ok(resp);
        }

        let wait = retry_delay(resp.retry_after.as_deref(), attempt);
        debug!(attempt, wait_secs = wait.as_secs(), "Rate limited, backing off");
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}

/// Wait before a retry: the Retry-After header when it carries a positive
/// number of seconds, exponential backoff (1s, 2s, 4s, ...) otherwise.
fn retry_delay(retry_after: Option<&str>, attempt: u32) -> Duration {
    if let Some(header) = retry_after
        && let Ok(secs) = header.parse::<u64>()
        && secs > 0
    {
        return Duration::from_secs(secs);
    }
    Duration::from_secs(1u64 << attempt)
}
