use std::future::Future;
use std::time::Duration;

/// Exponential-backoff policy for remote calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay observed before attempt `n` (1-indexed). The first attempt
    /// runs immediately; attempt n > 1 waits `base_delay * 2^(n-2)`.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt <= 1 {
            None
        } else {
            Some(self.base_delay * 2u32.pow(attempt - 2))
        }
    }
}

/// Run `op` until it succeeds or the policy's attempts are exhausted,
/// returning the last error. Local validation never goes through here;
/// this wraps remote calls only.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        if let Some(delay) = policy.delay_before(attempt) {
            tokio::time::sleep(delay).await;
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(_) => {
                tracing::debug!(attempt, "remote call failed, backing off");
                attempt += 1;
            }
        }
    }
}
