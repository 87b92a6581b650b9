//! Bounded retry loop around a single attempt.
//!
//! The attempt function decides, on each call, whether the operation is done, should be
//! tried again, or failed in a way another attempt cannot fix. [`Retry`] only counts
//! attempts and, if asked to, waits between them.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// The outcome of one attempt.
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// The operation succeeded; stop and return the value.
    Done(T),
    /// The operation failed in a way another attempt may fix.
    Retry(E),
    /// The operation failed terminally; stop and return the error.
    Abort(E),
}

/// Delay inserted between attempts.
///
/// # Examples
///
/// ```
/// use courier::retry::Backoff;
/// use std::time::Duration;
///
/// // Retry immediately (the default)
/// let none = Backoff::None;
///
/// // Exponential backoff: 100ms, 200ms, 400ms...
/// let exponential = Backoff::Exponential {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     jitter: true,
/// };
///
/// // Linear backoff: 1s, 1s, 1s...
/// let linear = Backoff::Linear {
///     delay: Duration::from_secs(1),
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,

    /// Wait the same delay before every retry.
    Linear {
        /// The delay between attempts.
        delay: Duration,
    },

    /// Wait `initial_delay * 2^(retry - 1)`, capped at `max_delay`.
    ///
    /// Jitter scales each delay to a random 50%..100% of its value.
    Exponential {
        /// The delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between attempts.
        max_delay: Duration,
        /// Whether to add random jitter to delays.
        jitter: bool,
    },
}

impl Backoff {
    /// Returns the delay before the given retry (1-indexed, so 1 = first retry).
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Linear { delay } => *delay,
            Backoff::Exponential {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let multiplier = 2u64.saturating_pow(retry.saturating_sub(1) as u32);
                let base_delay =
                    initial_delay.saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
                let delay = base_delay.min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    delay.mul_f64(jitter_factor)
                } else {
                    delay
                }
            }
        }
    }
}

/// Runs an attempt function up to `max_attempts` times.
///
/// # Examples
///
/// ```
/// use courier::retry::{Attempt, Retry};
///
/// # async fn example() {
/// let result: Result<u32, String> = Retry::new(3)
///     .run(|attempt| async move {
///         if attempt < 3 {
///             Attempt::Retry(format!("attempt {} failed", attempt))
///         } else {
///             Attempt::Done(42)
///         }
///     })
///     .await;
///
/// assert_eq!(result, Ok(42));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Retry {
    max_attempts: usize,
    backoff: Backoff,
}

impl Retry {
    /// Creates a runner allowing `max_attempts` attempts in total.
    ///
    /// Values below 1 are raised to 1; the attempt always runs at least once.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::None,
        }
    }

    /// Sets the delay inserted between attempts.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the total number of attempts this runner allows.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Drives `attempt` with a 1-based index until it is done, aborts, or attempts run out.
    ///
    /// On exhaustion the error from the last attempt is returned.
    pub async fn run<T, E, F, Fut>(&self, mut attempt: F) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        let mut index = 1;
        loop {
            match attempt(index).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Abort(err) => return Err(err),
                Attempt::Retry(err) => {
                    if index >= self.max_attempts {
                        return Err(err);
                    }

                    let delay = self.backoff.delay_for_retry(index);
                    if !delay.is_zero() {
                        tracing::debug!(
                            delay_ms = delay.as_millis(),
                            attempt = index,
                            "Waiting before next attempt"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    index += 1;
                }
            }
        }
    }
}

/// Runs `attempt` up to `max_attempts` times with no delay between attempts.
pub async fn try_attempts<T, E, F, Fut>(attempt: F, max_attempts: usize) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
{
    Retry::new(max_attempts).run(attempt).await
}
