//! Sliding one-second request window for a single upstream host.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

/// Caps outbound calls to `requests_per_second` within any one-second window.
///
/// Share one instance (behind an `Arc`) between every executor that talks to the
/// same host. The timestamp window is only touched while its lock is held, so two
/// workers can never both observe spare capacity and both proceed.
#[derive(Debug)]
pub struct RateLimiter {
    requests_per_second: usize,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub const DEFAULT_REQUESTS_PER_SECOND: usize = 5;

    pub fn new(requests_per_second: usize) -> Self {
        let requests_per_second = requests_per_second.max(1);
        Self {
            requests_per_second,
            window: Mutex::new(VecDeque::with_capacity(requests_per_second)),
        }
    }

    /// Waits until one more request fits in the window, then records it.
    pub async fn acquire(&self) {
        // Held across the sleep: callers queue behind the one waiting for capacity.
        let mut window = self.window.lock().await;

        let now = Instant::now();
        while window
            .front()
            .is_some_and(|oldest| now.duration_since(*oldest) >= WINDOW)
        {
            window.pop_front();
        }

        if window.len() >= self.requests_per_second {
            if let Some(oldest) = window.front().copied() {
                let wait = WINDOW.saturating_sub(now.duration_since(oldest));
                if !wait.is_zero() {
                    tracing::debug!("Rate limit reached, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
            }
            window.pop_front();
        }

        window.push_back(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REQUESTS_PER_SECOND)
    }
}
