//! Retry with exponential backoff for network-bound installer steps.
//!
//! The wait between attempts goes through a [`Sleeper`] so tests can observe
//! the schedule without actually blocking.

use std::fmt::Display;
use std::sync::Mutex;
use std::time::Duration;

/// Blocks the calling thread between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Sleeper that only records the requested delays.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        self.delays().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
    }
}

/// How often and how long to retry.
///
/// The first attempt runs immediately; each retry is preceded by the next
/// entry of `backoff`. Entries past the last retry are never slept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub retries: u32,
    /// Delay before each retry; the last entry repeats if retries outnumber it
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    /// Three attempts in total, waiting 1s and then 2s between them.
    fn default() -> Self {
        RetryPolicy {
            retries: 2,
            backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        RetryPolicy {
            retries: 0,
            backoff: Vec::new(),
        }
    }

    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay to wait before the given (1-based) retry.
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let idx = retry.saturating_sub(1) as usize;
        self.backoff
            .get(idx)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// Run `operation` until it succeeds or the retry budget is spent.
///
/// `operation` receives the 1-based attempt number. Returns the last error
/// when every attempt fails.
pub fn with_retry<T, E, F>(policy: &RetryPolicy, sleeper: &dyn Sleeper, mut operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt) {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = policy.delay_before_retry(attempt);
                tracing::warn!(
                    "attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                sleeper.sleep(delay);
            }
        }
    }
}
