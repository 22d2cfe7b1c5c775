//! Credential pool for the text-generation service.
//!
//! Holds interchangeable API keys, tracks per-credential usage and
//! quota-exhaustion, and hands out the next usable credential in
//! round-robin order. A credential marked quota-exceeded becomes usable
//! again once 24 hours have elapsed since it was flagged.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::config::engine;
use crate::error::{EngineError, EngineResult};

/// Per-credential bookkeeping.
#[derive(Debug, Clone)]
pub struct CredentialUsage {
    /// Successful calls made with this credential.
    pub request_count: u64,

    /// When the quota window for this credential last started.
    pub last_quota_reset: DateTime<Utc>,

    /// Whether the credential is currently quota-exhausted.
    pub quota_exceeded: bool,

    /// Last error observed for this credential.
    pub last_error: Option<String>,
}

/// A credential selected from the pool. The index ties usage updates back
/// to the right pool slot.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Slot index within the pool.
    pub index: usize,
    /// The API key itself.
    pub key: String,
}

#[derive(Debug)]
struct PoolState {
    keys: Vec<String>,
    usage: Vec<CredentialUsage>,
    cursor: usize,
}

/// Round-robin pool of interchangeable API credentials.
#[derive(Debug)]
pub struct CredentialPool {
    state: Mutex<PoolState>,
    reset_window: Duration,
    clock: Arc<dyn Clock>,
}

impl CredentialPool {
    /// Create a pool over the given keys.
    #[must_use]
    pub fn new(keys: Vec<String>, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let usage = keys
            .iter()
            .map(|_| CredentialUsage {
                request_count: 0,
                last_quota_reset: now,
                quota_exceeded: false,
                last_error: None,
            })
            .collect();
        Self {
            state: Mutex::new(PoolState { keys, usage, cursor: 0 }),
            reset_window: Duration::hours(engine::QUOTA_RESET_HOURS),
            clock,
        }
    }

    /// Number of credentials in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().expect("pool lock poisoned").keys.len()
    }

    /// Whether the pool holds no credentials at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Select the next not-yet-exhausted credential in round-robin order.
    ///
    /// # Errors
    ///
    /// `AllCredentialsExhausted` when every credential is currently marked
    /// quota-exceeded (or the pool is empty); `reset_at` names the earliest
    /// instant a credential becomes usable again.
    pub fn select(&self) -> EngineResult<Credential> {
        let now = self.clock.now();
        let mut state = self.state.lock().expect("pool lock poisoned");
        Self::refresh_expired(&mut state, now, self.reset_window);

        let len = state.keys.len();
        for offset in 0..len {
            let idx = (state.cursor + offset) % len;
            if !state.usage[idx].quota_exceeded {
                state.cursor = (idx + 1) % len;
                return Ok(Credential { index: idx, key: state.keys[idx].clone() });
            }
        }

        let reset_at = state
            .usage
            .iter()
            .filter(|u| u.quota_exceeded)
            .map(|u| u.last_quota_reset + self.reset_window)
            .min()
            .unwrap_or(now);
        Err(EngineError::AllCredentialsExhausted { reset_at })
    }

    /// Record a successful call made with the credential at `index`.
    pub fn record_use(&self, index: usize) {
        let mut state = self.state.lock().expect("pool lock poisoned");
        if let Some(usage) = state.usage.get_mut(index) {
            usage.request_count += 1;
        }
    }

    /// Flag the credential at `index` as quota-exhausted for the remainder
    /// of its 24h window.
    pub fn mark_exhausted(&self, index: usize, reason: &str) {
        let now = self.clock.now();
        let mut state = self.state.lock().expect("pool lock poisoned");
        if let Some(usage) = state.usage.get_mut(index) {
            usage.quota_exceeded = true;
            usage.last_quota_reset = now;
            usage.last_error = Some(reason.to_string());
            tracing::warn!(index, reason, "credential marked quota-exhausted");
        }
    }

    /// Snapshot usage for one credential (diagnostics and tests).
    #[must_use]
    pub fn usage(&self, index: usize) -> Option<CredentialUsage> {
        self.state.lock().expect("pool lock poisoned").usage.get(index).cloned()
    }

    /// Clear exhaustion flags whose 24h window has elapsed.
    fn refresh_expired(state: &mut PoolState, now: DateTime<Utc>, window: Duration) {
        for usage in &mut state.usage {
            if usage.quota_exceeded && now - usage.last_quota_reset >= window {
                usage.quota_exceeded = false;
                usage.last_error = None;
            }
        }
    }
}
