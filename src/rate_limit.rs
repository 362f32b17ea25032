//! Fixed-interval pacing for registry requests.

use tokio::time::{Duration, Instant};

/// Enforces a minimum pause between consecutive registry requests.
///
/// The first request goes out immediately; every later one waits until
/// `pause` has elapsed since the previous request was sent. Requests are
/// strictly sequential, so the limiter is owned by the resolver rather than
/// shared.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Minimum time between two requests.
    pause: Duration,
    /// Time of the last request.
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter that keeps at least `pause` between requests.
    pub fn new(pause: Duration) -> Self {
        Self {
            pause,
            last_request: None,
        }
    }

    /// The configured pause.
    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Wait until a request is allowed, then mark it as sent.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.pause {
                tokio::time::sleep(self.pause - elapsed).await;
            }
        }

        self.last_request = Some(Instant::now());
    }
}
