//! Download rate limiting
//!
//! After each chunk of `k` bytes the receiver sleeps for
//! `max(0, k / limit - elapsed_since_last_chunk)` before acknowledging.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Per-chunk rate limiter
#[derive(Debug, Clone)]
pub struct Throttle {
    /// Bytes per second, `None` for unlimited
    limit: Option<u64>,
    last_chunk: Instant,
}

impl Throttle {
    /// A zero limit is treated as unlimited
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit: limit.filter(|&l| l > 0),
            last_chunk: Instant::now(),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Restart the clock, e.g. when the connection is established
    pub fn reset(&mut self) {
        self.last_chunk = Instant::now();
    }

    /// Delay owed for a chunk of `bytes` when `elapsed` has passed since the previous one
    pub fn delay_for(&self, bytes: usize, elapsed: Duration) -> Duration {
        match self.limit {
            Some(limit) => Duration::from_secs_f64(bytes as f64 / limit as f64).saturating_sub(elapsed),
            None => Duration::ZERO,
        }
    }

    /// Sleep as long as the chunk requires and restart the clock
    pub async fn wait(&mut self, bytes: usize) {
        let delay = self.delay_for(bytes, self.last_chunk.elapsed());
        if !delay.is_zero() {
            trace!("Throttling {} bytes for {:?}", bytes, delay);
            tokio::time::sleep(delay).await;
        }
        self.last_chunk = Instant::now();
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_never_waits() {
        let throttle = Throttle::unlimited();
        assert_eq!(throttle.delay_for(1_000_000, Duration::ZERO), Duration::ZERO);
        assert_eq!(Throttle::new(Some(0)).limit(), None);
    }

    #[test]
    fn test_delay_formula() {
        let throttle = Throttle::new(Some(1000));
        assert_eq!(throttle.delay_for(100, Duration::ZERO), Duration::from_millis(100));
        assert_eq!(
            throttle.delay_for(100, Duration::from_millis(30)),
            Duration::from_millis(70)
        );
        assert_eq!(throttle.delay_for(100, Duration::from_millis(500)), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_owed_time() {
        let mut throttle = Throttle::new(Some(1000));
        let start = Instant::now();
        for _ in 0..10 {
            throttle.wait(100).await;
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(990), "elapsed {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(1100), "elapsed {:?}", elapsed);
    }
}
