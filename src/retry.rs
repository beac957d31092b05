//! Retry policy applied to flaky external calls.

use std::thread;
use std::time::Duration;

/// Wait strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Sleep the same amount before every retry.
    Fixed(Duration),
    /// Double the delay on each retry, starting at `base` and never exceeding `max`.
    Exponential {
        /// Delay before the first retry.
        base: Duration,
        /// Upper bound for any single delay.
        max: Duration,
    },
}

impl Backoff {
    /// Delay to wait before retry number `retry` (1-based).
    pub fn delay(&self, retry: usize) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let shift = retry.saturating_sub(1).min(16) as u32;
                base.saturating_mul(1 << shift).min(max)
            }
        }
    }
}

/// Bounded attempts plus a backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    backoff: Backoff,
}

/// Attempts exhausted; carries the error of the final attempt.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Attempts made.
    pub attempts: usize,
    /// Error from the last attempt.
    pub last: E,
}

impl RetryPolicy {
    /// Builds a policy. `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: usize, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy that retries without sleeping.
    pub fn immediate(max_attempts: usize) -> Self {
        Self::new(max_attempts, Backoff::None)
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Backoff strategy.
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Runs `op` until it succeeds or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number. `on_failure` sees every failed
    /// attempt before the policy decides whether to sleep and retry.
    pub fn run<T, E, F, L>(&self, mut op: F, mut on_failure: L) -> Result<T, RetryError<E>>
    where
        F: FnMut(usize) -> Result<T, E>,
        L: FnMut(usize, &E),
    {
        let mut attempt = 1usize;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    on_failure(attempt, &err);
                    if attempt >= self.max_attempts {
                        return Err(RetryError {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    let delay = self.backoff.delay(attempt);
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Backoff::Fixed(Duration::from_secs(5)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn default_is_three_attempts_five_seconds_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff(), Backoff::Fixed(Duration::from_secs(5)));
    }

    #[test]
    fn succeeds_on_last_allowed_attempt() {
        let policy = RetryPolicy::immediate(3);
        let mut failures = Vec::new();
        let result = policy.run(
            |attempt| if attempt < 3 { Err(attempt) } else { Ok("done") },
            |attempt, _| failures.push(attempt),
        );
        assert_eq!(result.expect("third attempt succeeds"), "done");
        assert_eq!(failures, vec![1, 2]);
    }

    #[test]
    fn gives_up_with_last_error() {
        let policy = RetryPolicy::immediate(3);
        let mut calls = 0;
        let err = policy
            .run::<(), _, _, _>(
                |attempt| {
                    calls += 1;
                    Err(format!("boom {attempt}"))
                },
                |_, _| {},
            )
            .expect_err("all attempts fail");
        assert_eq!(calls, 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last, "boom 3");
    }

    #[test]
    fn sleeps_between_retries_but_not_after_final_failure() {
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_millis(20)));
        let start = Instant::now();
        let _ = policy.run::<(), _, _, _>(|_| Err(()), |_, _| {});
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(40), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1000), "elapsed {elapsed:?}");
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(4),
        };
        let delays: Vec<u128> = (1..=6).map(|n| backoff.delay(n).as_millis()).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 4000, 4000]);
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let policy = RetryPolicy::immediate(0);
        let mut calls = 0;
        let _ = policy.run::<(), _, _, _>(
            |_| {
                calls += 1;
                Err(())
            },
            |_, _| {},
        );
        assert_eq!(calls, 1);
    }
}
