//! Retry handling at two levels.
//!
//! * [`execute`] is the application-level loop every call goes through. It
//!   re-issues a call only after [`Error::RateLimitExceeded`], waiting exactly
//!   the advertised cooldown, and only while the cooldown is shorter than the
//!   configured timeout and retries remain.
//! * [`RetryStrategy`] paces connection-level retries inside one attempt, for
//!   failures where no response was received at all.

use crate::config::Config;
use crate::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Per-call retry bookkeeping. Created when a call starts and dropped when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Zero-based number of the attempt in flight.
    pub attempt: u32,
    /// How many retries the call may make after the first attempt.
    pub max_retries: u32,
    /// Cooldowns must be strictly shorter than this to be waited out.
    pub timeout: Duration,
}

impl RetryState {
    pub fn new(config: &Config) -> Self {
        Self {
            attempt: 0,
            max_retries: config.retries(),
            timeout: config.timeout(),
        }
    }

    /// Returns the cooldown to wait before the next attempt, or `None` if
    /// `error` ends the call.
    ///
    /// # Examples
    ///
    /// ```
    /// use shipengine::retry::RetryState;
    /// use shipengine::{Config, Error, ErrorSource};
    /// use std::time::Duration;
    ///
    /// let config = Config::builder("TEST_key").retries(1).timeout(Duration::from_secs(10)).build()?;
    /// let state = RetryState::new(&config);
    ///
    /// let limited = Error::rate_limit_exceeded(Duration::from_secs(1), ErrorSource::ShipEngine, None);
    /// assert_eq!(state.next_delay(&limited), Some(Duration::from_secs(1)));
    /// assert_eq!(state.next_delay(&Error::system("boom")), None);
    /// # Ok::<(), shipengine::Error>(())
    /// ```
    pub fn next_delay(&self, error: &Error) -> Option<Duration> {
        match error {
            Error::RateLimitExceeded { retry_after, .. }
                if *retry_after < self.timeout && self.attempt < self.max_retries =>
            {
                Some(*retry_after)
            }
            _ => None,
        }
    }

    pub fn advance(&mut self) {
        self.attempt += 1;
    }

    /// Total attempts made so far, counting the one in flight.
    pub fn attempts(&self) -> u32 {
        self.attempt + 1
    }
}

/// Runs `attempt` until it succeeds or fails with an error that is not retried.
///
/// `attempt` receives the zero-based attempt number. On success the value is
/// returned with the number of attempts made. Any error that does not qualify
/// for a retry, including the last rate-limit error once retries run out, is
/// returned unchanged.
///
/// The cooldown is awaited inline: the returned future does not complete
/// until the wait and the following attempt are done.
pub async fn execute<T, F, Fut>(config: &Config, mut attempt: F) -> Result<(T, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut state = RetryState::new(config);

    loop {
        match attempt(state.attempt).await {
            Ok(value) => return Ok((value, state.attempts())),
            Err(e) => {
                let Some(delay) = state.next_delay(&e) else {
                    if e.is_retryable() {
                        tracing::warn!(
                            error = %e,
                            attempts = state.attempts(),
                            max_retries = state.max_retries,
                            "Rate limited - not retrying"
                        );
                    }
                    return Err(e);
                };

                tracing::info!(
                    rate_limit_delay_ms = delay.as_millis() as u64,
                    attempt = state.attempt,
                    max_retries = state.max_retries,
                    "Rate limited - waiting before retry"
                );
                tokio::time::sleep(delay).await;
                state.advance();
            }
        }
    }
}

/// Pacing for connection-level retries.
///
/// # Examples
///
/// ```
/// use shipengine::RetryStrategy;
/// use std::time::Duration;
///
/// // No connection-level retries
/// let none = RetryStrategy::None;
///
/// // 250ms, 500ms, 1s, ... capped at 4s, with jitter
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(250),
///     max_delay: Duration::from_secs(4),
///     jitter: true,
/// };
///
/// // Fixed 100ms between tries
/// let linear = RetryStrategy::Linear {
///     delay: Duration::from_millis(100),
/// };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Fail the attempt on the first connection error.
    None,

    /// Wait `initial_delay * 2^(n-1)` before retry `n`, capped at `max_delay`.
    ExponentialBackoff {
        initial_delay: Duration,
        max_delay: Duration,
        /// Scale each delay by a random factor in `[0.5, 1.0]`.
        jitter: bool,
    },

    /// Wait the same delay before every retry.
    Linear { delay: Duration },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            jitter: true,
        }
    }
}

impl RetryStrategy {
    /// Returns the delay before connection retry `retry` (1-indexed), or
    /// `None` once `max_retries` is exhausted.
    pub fn delay_for_attempt(&self, retry: u32, max_retries: u32) -> Option<Duration> {
        if retry == 0 || retry > max_retries {
            return None;
        }

        match self {
            RetryStrategy::None => None,
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let multiplier = 2u32.saturating_pow(retry - 1);
                let delay = initial_delay.saturating_mul(multiplier).min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(jitter_factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Linear { delay } => Some(*delay),
        }
    }
}
