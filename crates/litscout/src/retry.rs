//! Unified retry policy for outbound network calls.
//!
//! One abstraction replaces per-call-site retry loops: a transient-vs-fatal
//! classifier lives on [`ApiError`], the backoff escalates with the attempt
//! number (doubled for rate-limit errors, respecting any server-provided
//! retry-after), and the credential-rotation variant tries every usable
//! credential before sleeping at all.

use std::future::Future;
use std::time::Duration;

use crate::error::{ApiError, ApiResult, EngineError, EngineResult};
use crate::pool::{Credential, CredentialPool};

/// Retry tuning for one family of calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts (the first call counts as attempt one).
    pub max_attempts: u32,

    /// Base delay the escalation starts from.
    pub base_delay: Duration,

    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Default policy for bibliographic calls.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Policy for the citation-graph API, whose rate limits reset slowly:
    /// 3 attempts with 10-15s waits on 429.
    #[must_use]
    pub const fn slow_reset() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(15),
        }
    }

    /// Compute the delay before retry number `attempt` (1-based) for `err`.
    ///
    /// Rate-limit errors escalate fastest: the base is doubled and scaled by
    /// the attempt number, and the server's retry-after wins when larger.
    /// Other transient errors back off exponentially.
    #[must_use]
    pub fn backoff(&self, err: &ApiError, attempt: u32) -> Duration {
        let computed = if matches!(err, ApiError::RateLimited { .. }) {
            self.base_delay.saturating_mul(2).saturating_mul(attempt)
        } else {
            self.base_delay.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
        };
        let computed = computed.min(self.max_delay);
        match err.retry_after() {
            Some(server) => server.max(computed).min(self.max_delay),
            None => computed,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Invoke `operation` with escalating backoff on transient failures.
///
/// Non-transient failures propagate immediately without retry.
///
/// # Errors
///
/// Returns the last error once attempts are spent.
pub async fn call_with_retry<T, F, Fut>(policy: RetryPolicy, operation: F) -> ApiResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.backoff(&err, attempt);
                tracing::warn!(
                    attempt,
                    max = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Invoke `operation` once per credential in sequence, rotating immediately
/// on transient failures; only once the rotation is exhausted does a full
/// attempt end and the escalating delay apply.
///
/// Quota-exceeded responses mark the credential exhausted for its 24h
/// window before rotating. Successful calls increment the chosen
/// credential's usage counter.
///
/// # Errors
///
/// Non-transient failures propagate immediately. `AllCredentialsExhausted`
/// propagates as soon as the pool has nothing usable left.
pub async fn call_with_rotation<T, F, Fut>(
    pool: &CredentialPool,
    policy: RetryPolicy,
    operation: F,
) -> EngineResult<T>
where
    F: Fn(Credential) -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut attempt = 1;
    loop {
        let mut rotations = 0;
        let last_err = loop {
            let credential = pool.select()?;
            let index = credential.index;
            match operation(credential).await {
                Ok(value) => {
                    pool.record_use(index);
                    return Ok(value);
                }
                Err(ApiError::QuotaExceeded { message }) => {
                    // Exhausted for the day; the pool skips it until reset.
                    pool.mark_exhausted(index, &message);
                }
                Err(err) if err.is_transient() => {
                    rotations += 1;
                    if rotations >= pool.len() {
                        break err;
                    }
                    tracing::debug!(error = %err, "transient failure, rotating credential");
                }
                Err(err) => return Err(err.into()),
            }
        };

        if attempt >= policy.max_attempts {
            return Err(last_err.into());
        }
        let delay = policy.backoff(&last_err, attempt);
        tracing::warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %last_err,
            "all credentials tried, backing off"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::clock::SystemClock;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient() {
        let calls = AtomicU32::new(0);
        let result = call_with_retry(fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 { Err(ApiError::rate_limited(0)) } else { Ok("done") }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_propagates_fatal_immediately() {
        let calls = AtomicU32::new(0);
        let result: ApiResult<()> = call_with_retry(fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::bad_request("nope")) }
        })
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: ApiResult<()> = call_with_retry(fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::overloaded("busy")) }
        })
        .await;
        assert!(matches!(result, Err(ApiError::Overloaded { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_escalates_for_rate_limits() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(15),
        };
        let err = ApiError::rate_limited(0);
        assert_eq!(policy.backoff(&err, 1), Duration::from_secs(10));
        // Capped by max_delay (would be 20s).
        assert_eq!(policy.backoff(&err, 2), Duration::from_secs(15));
    }

    #[test]
    fn test_backoff_respects_server_retry_after() {
        let policy = fast_policy();
        let err = ApiError::RateLimited { retry_after: Duration::from_millis(8) };
        assert_eq!(policy.backoff(&err, 1), Duration::from_millis(8));
    }

    #[tokio::test]
    async fn test_rotation_tries_each_credential_before_backoff() {
        let pool = CredentialPool::new(
            vec!["a".into(), "b".into(), "c".into()],
            Arc::new(SystemClock),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let result = call_with_rotation(&pool, fast_policy(), move |cred| {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if cred.key == "c" { Ok(cred.key) } else { Err(ApiError::rate_limited(0)) }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "c");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // The successful credential's usage counter was bumped.
        assert_eq!(pool.usage(2).unwrap().request_count, 1);
    }

    #[tokio::test]
    async fn test_rotation_marks_quota_exhausted() {
        let pool = CredentialPool::new(vec!["a".into(), "b".into()], Arc::new(SystemClock));

        let result = call_with_rotation(&pool, fast_policy(), |cred| async move {
            if cred.key == "a" {
                Err(ApiError::quota_exceeded("exceeded your current quota"))
            } else {
                Ok(cred.key)
            }
        })
        .await;

        assert_eq!(result.unwrap(), "b");
        assert!(pool.usage(0).unwrap().quota_exceeded);
        assert!(!pool.usage(1).unwrap().quota_exceeded);
    }

    #[tokio::test]
    async fn test_rotation_surfaces_total_exhaustion() {
        let pool = CredentialPool::new(vec!["a".into(), "b".into()], Arc::new(SystemClock));

        let result: EngineResult<()> = call_with_rotation(&pool, fast_policy(), |_| async {
            Err(ApiError::quota_exceeded("daily limit"))
        })
        .await;

        assert!(matches!(result, Err(EngineError::AllCredentialsExhausted { .. })));
    }

    #[tokio::test]
    async fn test_rotation_propagates_fatal() {
        let pool = CredentialPool::new(vec!["a".into(), "b".into()], Arc::new(SystemClock));
        let calls = AtomicU32::new(0);

        let result: EngineResult<()> = call_with_rotation(&pool, fast_policy(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::bad_request("malformed")) }
        })
        .await;

        assert!(matches!(result, Err(EngineError::Api(ApiError::BadRequest { .. }))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
