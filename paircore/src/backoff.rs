use std::time::Duration;

/// Bounded exponential backoff for socket reconnection. No jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub factor: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(3000),
            factor: 1.5,
            max_delay: Duration::from_millis(30_000),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// `min(base * factor^attempt, max_delay)` in milliseconds.
    pub fn delay_ms(&self, attempt: u32) -> f64 {
        let base_ms = self.base.as_secs_f64() * 1000.0;
        let max_ms = self.max_delay.as_secs_f64() * 1000.0;
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        (base_ms * self.factor.powi(exponent)).min(max_ms)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.delay_ms(attempt) / 1000.0)
    }

    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}
