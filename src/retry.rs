// ABOUTME: Bounded retry loop with exponential backoff and jitter
// ABOUTME: Reads retry on any transient failure, writes only on rate limiting

use crate::error::RemoteErrorKind;
use crate::{Error, Result};
use rand::Rng;
use std::time::Duration;

/// Whether repeating a call can apply its effect twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Reads; safe to repeat after any transient failure.
    Idempotent,
    /// Writes; a 5xx or dropped response may already have been applied, so
    /// only rejections the server guarantees were not executed are retried.
    AtMostOnce,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before retry number `retry` (1-based): doubling from
    /// `base_delay`, capped at `max_delay`, plus up to 25% jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);

        if self.jitter && !delay.is_zero() {
            let spread = delay.as_millis() as u64 / 4;
            let extra = rand::thread_rng().gen_range(0..=spread);
            delay + Duration::from_millis(extra)
        } else {
            delay
        }
    }

    pub fn should_retry(&self, err: &Error, idempotency: Idempotency) -> bool {
        match idempotency {
            Idempotency::Idempotent => err.is_transient(),
            Idempotency::AtMostOnce => err.remote_kind() == Some(RemoteErrorKind::RateLimited),
        }
    }

    /// Run `call`, sleeping on the current thread between attempts.
    pub fn run<T>(
        &self,
        operation: &str,
        idempotency: Idempotency,
        call: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        self.run_with_sleep(operation, idempotency, call, std::thread::sleep)
    }

    pub fn run_with_sleep<T>(
        &self,
        operation: &str,
        idempotency: Idempotency,
        mut call: impl FnMut() -> Result<T>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T> {
        let mut attempt = 1;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && self.should_retry(&e, idempotency) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure, retrying: {}",
                        e
                    );
                    sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
