use std::time::Duration;

use rand::Rng;

/// Capped exponential backoff between resubscription attempts.
///
/// `delay(n) = min(base * 2^n, max)`; with jitter the delay is drawn
/// uniformly from `[delay / 2, delay]`. There is no attempt limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Backoff delay for a 0-indexed attempt, before jitter.
    pub fn compute_ms(&self, attempt: u32) -> u64 {
        let base = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        let exp = attempt.min(30);
        base.saturating_mul(1u64 << exp).min(max)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let ms = self.compute_ms(attempt);
        if !self.jitter || ms == 0 {
            return Duration::from_millis(ms);
        }
        Duration::from_millis(rand::rng().random_range(ms / 2..=ms))
    }
}
