//! Bounded Retry State Machine.
//!
//! Every blocking exchange with the engine is wrapped in a bounded retry:
//! a fixed attempt budget, a delay between attempts that may grow by a
//! backoff factor up to a cap, and a terminal `Exhausted` state. The schedule
//! itself is pure; only `Retry::run` sleeps.

use std::thread;
use std::time::Duration;

/// Attempt budget and delay schedule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, at least one.
    pub max_attempts: u32,
    /// Wait after the first failure.
    pub delay: Duration,
    /// Growth of the wait per failure; 1.0 keeps it fixed.
    pub backoff_factor: f64,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with a fixed delay between attempts.
    ///
    /// A budget of zero is raised to one attempt.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff_factor: 1.0,
            max_delay: delay,
        }
    }

    /// Grows the delay by `factor` after each failure, capped at `max_delay`.
    pub fn with_backoff(mut self, factor: f64, max_delay: Duration) -> Self {
        self.backoff_factor = if factor.is_finite() { factor.max(1.0) } else { 1.0 };
        self.max_delay = max_delay.max(self.delay);
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Starts a new retry cursor at the first attempt.
    pub fn start(&self) -> Retry {
        Retry {
            policy: *self,
            state: RetryState::Ready(1),
        }
    }
}

/// Position of a retry cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
    /// The given attempt (1-based) may run now.
    Ready(u32),
    /// The given attempt failed; wait `delay` before the next one.
    Waiting { attempt: u32, delay: Duration },
    /// All attempts failed.
    Exhausted(u32),
}

/// Terminal failure of a retried operation.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Attempts made.
    pub attempts: u32,
    /// Error of the last attempt.
    pub last: E,
}

/// Cursor through a `RetryPolicy`.
#[derive(Clone, Debug)]
pub struct Retry {
    policy: RetryPolicy,
    state: RetryState,
}

impl Retry {
    /// Current position of the cursor.
    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Number of the attempt that is running or about to run.
    pub fn attempt(&self) -> u32 {
        match self.state {
            RetryState::Ready(n) | RetryState::Exhausted(n) => n,
            RetryState::Waiting { attempt, .. } => attempt,
        }
    }

    /// Records a failure of the current attempt.
    ///
    /// # Returns
    ///
    /// The delay before the next attempt, or `None` when the budget is spent.
    pub fn fail(&mut self) -> Option<Duration> {
        let attempt = self.attempt();
        if attempt >= self.policy.max_attempts {
            self.state = RetryState::Exhausted(attempt);
            return None;
        }
        let delay = self.policy.delay_after(attempt);
        self.state = RetryState::Waiting { attempt, delay };
        Some(delay)
    }

    /// Ends a wait and readies the next attempt.
    pub fn resume(&mut self) {
        if let RetryState::Waiting { attempt, .. } = self.state {
            self.state = RetryState::Ready(attempt + 1);
        }
    }

    /// Runs `op` until it succeeds or the budget is spent, sleeping between attempts.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T, E, F>(mut self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
        E: std::fmt::Display,
    {
        loop {
            let attempt = self.attempt();
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => match self.fail() {
                    Some(delay) => {
                        log::warn!(
                            "attempt {}/{} failed: {}; retrying in {:?}",
                            attempt,
                            self.policy.max_attempts,
                            e,
                            delay
                        );
                        thread::sleep(delay);
                        self.resume();
                    }
                    None => {
                        return Err(RetryError {
                            attempts: attempt,
                            last: e,
                        })
                    }
                },
            }
        }
    }
}
