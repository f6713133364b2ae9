use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use serde::Deserialize;
use tracing::warn;

/// Bounded retry with exponential backoff for store calls
#[derive(Debug, Deserialize, Clone)]
pub struct RetryStrategy {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_delay_millis")]
    pub delay_millis: u64,
    #[serde(default = "default_backoff")]
    pub backoff: f64,
}

fn default_attempts() -> u32 { 3 }
fn default_delay_millis() -> u64 { 1000 }
fn default_backoff() -> f64 { std::f64::consts::E }

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_millis: default_delay_millis(),
            backoff: default_backoff(),
        }
    }
}

impl RetryStrategy {
    /// Sleeps between consecutive attempts
    pub fn delays(&self) -> Vec<Duration> {
        let factor = self.backoff.max(1.0);
        let mut delay = Duration::from_millis(self.delay_millis);
        let mut delays = Vec::new();
        for _ in 1..self.attempts.max(1) {
            delays.push(delay);
            delay = delay.mul_f64(factor);
        }
        delays
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempts run out. The last error is returned as is.
    pub async fn run<T, E, F, Fut>(&self, what: &str, is_transient: fn(&E) -> bool, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut delays = self.delays().into_iter();
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) => match delays.next() {
                    Some(delay) => {
                        warn!("{} failed (attempt {}), retrying in {:?}: {}", what, attempt, delay, e);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }
}

/// Errors worth another attempt: the database was unreachable, not wrong
pub fn is_transient(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed
    )
}
