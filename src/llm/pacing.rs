//! Minimum spacing between outbound completion calls
//!
//! Not a rate limiter: callers are simply delayed until the configured gap
//! since the previous call has passed.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct CallPacer {
    min_spacing: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl CallPacer {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Wait for our turn and record the call. Returns how long we waited.
    ///
    /// The lock is held while sleeping so concurrent callers queue up behind
    /// each other instead of all firing once the gap has passed.
    pub async fn wait_turn(&self) -> Duration {
        let mut last_call = self.last_call.lock().await;

        let wait = match *last_call {
            Some(previous) => self.min_spacing.saturating_sub(previous.elapsed()),
            None => Duration::ZERO,
        };

        if !wait.is_zero() {
            log::debug!("Pacing completion call, waiting {}ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }

        *last_call = Some(Instant::now());
        wait
    }
}

impl Default for CallPacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_is_not_delayed() {
        let pacer = CallPacer::new(Duration::from_secs(60));
        assert_eq!(pacer.wait_turn().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_second_call_waits_for_spacing() {
        let pacer = CallPacer::new(Duration::from_millis(80));
        pacer.wait_turn().await;

        let started = Instant::now();
        let waited = pacer.wait_turn().await;

        assert!(waited > Duration::ZERO);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_zero_spacing_never_waits() {
        let pacer = CallPacer::new(Duration::ZERO);
        pacer.wait_turn().await;
        assert_eq!(pacer.wait_turn().await, Duration::ZERO);
    }
}
