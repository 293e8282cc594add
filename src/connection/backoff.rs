//! Capped exponential backoff with jitter for reconnection attempts.

use std::time::Duration;

use rand::Rng;

/// Reconnection delay schedule: base delay doubling per failed attempt up
/// to a cap, with up to 25% random shave so a fleet of consumers does not
/// reconnect in lockstep. Unbounded retries; resetting on success.
#[derive(Debug)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    attempts: u32,
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            attempts: 0,
        }
    }

    /// Failed attempts since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay to wait before the next attempt, advancing the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let exponent = self.attempts.min(16);
        self.attempts = self.attempts.saturating_add(1);
        let raw = self
            .base
            .saturating_mul(1u32 << exponent)
            .min(self.cap);
        let jitter = rand::rng().random_range(0.0..0.25);
        raw.mul_f64(1.0 - jitter)
    }

    /// Forget the failure history after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_and_cap() {
        let base = Duration::from_millis(200);
        let cap = Duration::from_secs(5);
        let mut policy = BackoffPolicy::new(base, cap);
        let mut previous = Duration::ZERO;
        for _ in 0..10 {
            let delay = policy.next_delay();
            assert!(delay <= cap);
            // Jitter shaves at most 25%, so growth still dominates early on.
            if previous < cap.mul_f64(0.5) {
                assert!(delay.mul_f64(2.0) > previous);
            }
            previous = delay;
        }
        assert!(policy.next_delay() >= cap.mul_f64(0.75));
    }

    #[test]
    fn reset_restarts_schedule() {
        let mut policy = BackoffPolicy::new(Duration::from_millis(200), Duration::from_secs(5));
        for _ in 0..5 {
            policy.next_delay();
        }
        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert!(policy.next_delay() <= Duration::from_millis(200));
    }
}
