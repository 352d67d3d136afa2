/*!
 * Poll policies: how often to ask, how long to keep asking.
 */

use rand::Rng;
use std::time::Duration;

use crate::transport::MAX_RETRY_AFTER;

/// Longest sleep after a transient failure, regardless of attempt count
const MAX_TRANSIENT_DELAY: Duration = Duration::from_secs(60);

/// Growth of the delay between consecutive status polls
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Always wait `interval`
    Fixed,
    /// Multiply the delay by `multiplier` after every poll, up to `max_interval`
    Exponential { multiplier: f64, max_interval: Duration },
}

/// Configuration governing interval, backoff and timeout of a status wait
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay after the first poll
    pub interval: Duration,

    pub backoff: Backoff,

    /// Random spread applied to every delay, as a fraction (0.0 disables)
    pub jitter_ratio: f64,

    /// Ceiling on the total time spent waiting
    pub max_wait: Duration,

    /// Ceiling on the number of status requests
    pub max_polls: u32,

    /// Consecutive transient failures tolerated before giving up
    pub max_transient_retries: u32,

    /// Base delay after a transient failure, doubled per consecutive failure
    pub transient_backoff: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        // Video jobs take roughly as long as the video; two hours covers
        // feature-length input.
        Self {
            interval: Duration::from_secs(5),
            backoff: Backoff::Exponential {
                multiplier: 1.5,
                max_interval: Duration::from_secs(30),
            },
            jitter_ratio: 0.0,
            max_wait: Duration::from_secs(2 * 60 * 60),
            max_polls: 2000,
            max_transient_retries: 5,
            transient_backoff: Duration::from_secs(2),
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy bounded by `max_wait`
    pub fn fixed(interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval,
            backoff: Backoff::Fixed,
            max_wait,
            ..Default::default()
        }
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_jitter(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_transient_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_transient_retries = max_retries;
        self.transient_backoff = backoff;
        self
    }

    /// Delay before the next poll, after `polls` polls have completed (>= 1)
    pub fn delay_after_poll(&self, polls: u32) -> Duration {
        let base = match &self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential { multiplier, max_interval } => {
                let exponent = polls.saturating_sub(1).min(64) as i32;
                scale(self.interval, multiplier.max(1.0).powi(exponent), *max_interval)
            }
        };
        self.apply_jitter(base)
    }

    /// Delay after the `failures`-th consecutive transient failure (>= 1)
    ///
    /// A `Retry-After` hint from the service is honoured when it is longer,
    /// up to `MAX_RETRY_AFTER`.
    pub fn delay_after_transient(&self, failures: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = failures.saturating_sub(1).min(32) as i32;
        let computed = scale(self.transient_backoff, 2f64.powi(exponent), MAX_TRANSIENT_DELAY);
        let delay = self.apply_jitter(computed);
        match retry_after {
            Some(hint) if hint > delay => hint.min(MAX_RETRY_AFTER),
            _ => delay,
        }
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_ratio <= 0.0 || delay.is_zero() {
            return delay;
        }
        let spread = self.jitter_ratio.min(1.0);
        let factor = rand::rng().random_range((1.0 - spread)..=(1.0 + spread));
        Duration::from_secs_f64(delay.as_secs_f64() * factor)
    }
}

fn scale(base: Duration, factor: f64, cap: Duration) -> Duration {
    let secs = base.as_secs_f64() * factor;
    if !secs.is_finite() || secs >= cap.as_secs_f64() {
        cap
    } else {
        Duration::from_secs_f64(secs)
    }
}
