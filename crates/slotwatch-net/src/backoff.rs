use std::time::Duration;

use rand::Rng;

/// Exponential backoff with jitter, bounded by `max_attempts`.
#[derive(Debug, Clone)]
pub struct Backoff {
    pub base_ms: u64,
    pub factor: f64,
    pub jitter_percent: f64,
    pub max_ms: u64,
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_ms: 500,
            factor: 2.0,
            jitter_percent: 0.20,
            max_ms: 8_000,
            max_attempts: 3,
        }
    }
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_ms,
            max_ms,
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based): `base * factor^attempt`, capped, ±jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = (self.base_ms as f64 * self.factor.powi(attempt as i32)).min(self.max_ms as f64);
        let jitter_range = base * self.jitter_percent;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        Duration::from_millis((base + jitter).max(0.0) as u64)
    }
}
