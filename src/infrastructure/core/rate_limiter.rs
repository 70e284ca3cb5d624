use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

/// Per-adapter rolling-window rate limiter with an optional minimum gap
/// between consecutive requests. The window resets every 60s rather than
/// using a true sliding window, matching how the providers themselves
/// publish their limits ("N requests per minute").
pub struct RateLimiter {
    limit_per_minute: u32,
    min_gap: Option<Duration>,
    state: Mutex<State>,
}

struct State {
    window_start: Instant,
    count: u32,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        Self::with_min_gap(limit_per_minute, None)
    }

    pub fn with_min_gap(limit_per_minute: u32, min_gap: Option<Duration>) -> Self {
        Self {
            limit_per_minute,
            min_gap,
            state: Mutex::new(State {
                window_start: Instant::now(),
                count: 0,
                last_request: None,
            }),
        }
    }

    /// Blocks (async) until a request is permitted, then records it.
    pub async fn acquire(&self, adapter_name: &str) {
        loop {
            let wait = {
                let mut state = self.state.lock().expect("rate limiter mutex poisoned");
                let now = Instant::now();

                if now.duration_since(state.window_start) >= Duration::from_secs(60) {
                    state.window_start = now;
                    state.count = 0;
                }

                if state.count >= self.limit_per_minute {
                    let elapsed = now.duration_since(state.window_start);
                    Some(Duration::from_secs(60).saturating_sub(elapsed))
                } else if let Some(gap) = self.min_gap {
                    match state.last_request {
                        Some(last) if now.duration_since(last) < gap => {
                            Some(gap - now.duration_since(last))
                        }
                        _ => None,
                    }
                } else {
                    None
                }
            };

            match wait {
                Some(wait) if !wait.is_zero() => {
                    warn!(adapter = adapter_name, ?wait, "rate limit reached, waiting");
                    tokio::time::sleep(wait).await;
                }
                _ => break,
            }
        }

        let mut state = self.state.lock().expect("rate limiter mutex poisoned");
        state.count += 1;
        state.last_request = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_requests_under_the_limit_without_waiting() {
        let limiter = RateLimiter::new(60);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire("test").await;
        }
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn enforces_minimum_gap_between_requests() {
        let limiter = RateLimiter::with_min_gap(600, Some(Duration::from_millis(50)));
        let start = Instant::now();
        limiter.acquire("test").await;
        limiter.acquire("test").await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
