use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use reqwest::header::HeaderMap;
use reqwest::Response;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep};

/// Tracks GitHub's advertised quota and an optional self-imposed per-minute budget.
pub struct RateLimiter {
    state: Arc<Mutex<RateLimitState>>,
    requests_per_minute: u32,
}

struct RateLimitState {
    remaining: u32,
    reset_at: Option<Instant>,
    requests_this_minute: u32,
    minute_start: Instant,
}

impl RateLimiter {
    /// No soft budget; only the server's quota headers are honoured.
    pub fn new() -> Self {
        Self::with_soft_limit(0)
    }

    /// `requests_per_minute == 0` disables the soft budget.
    pub fn with_soft_limit(requests_per_minute: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimitState {
                remaining: 5000,
                reset_at: None,
                requests_this_minute: 0,
                minute_start: Instant::now(),
            })),
            requests_per_minute,
        }
    }

    pub async fn wait(&self) {
        let mut state = self.state.lock().await;

        if state.remaining == 0 {
            if let Some(reset_at) = state.reset_at {
                let now = Instant::now();
                if reset_at > now {
                    let wait_duration = reset_at - now;
                    drop(state);
                    tracing::info!("Rate limited, waiting {:?}", wait_duration);
                    sleep(wait_duration).await;
                    state = self.state.lock().await;
                }
                state.remaining = 1;
                state.reset_at = None;
            }
        }

        if self.requests_per_minute > 0 {
            let minute_elapsed = state.minute_start.elapsed();
            if minute_elapsed < Duration::from_secs(60) {
                if state.requests_this_minute >= self.requests_per_minute {
                    let wait_time = Duration::from_secs(60) - minute_elapsed;
                    drop(state);
                    tracing::debug!("Soft rate limiting, waiting {:?}", wait_time);
                    sleep(wait_time).await;
                    state = self.state.lock().await;
                    state.requests_this_minute = 0;
                    state.minute_start = Instant::now();
                }
            } else {
                state.requests_this_minute = 0;
                state.minute_start = Instant::now();
            }
        }

        state.requests_this_minute += 1;
    }

    pub async fn update_from_response(&self, response: &Response) {
        self.update_from_headers(response.headers()).await;
    }

    /// Applies quota headers before returning, so the next `wait` sees them.
    pub async fn update_from_headers(&self, headers: &HeaderMap) {
        let Some(remaining) = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
        else {
            return;
        };

        let mut state = self.state.lock().await;
        state.remaining = remaining;
        if let Some(wait_secs) = seconds_until_reset(headers) {
            state.reset_at = Some(Instant::now() + Duration::from_secs(wait_secs));
        }
    }

    pub async fn remaining(&self) -> u32 {
        self.state.lock().await.remaining
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Seconds until the `x-ratelimit-reset` epoch, if that is in the future.
pub fn seconds_until_reset(headers: &HeaderMap) -> Option<u64> {
    let reset_timestamp = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    (reset_timestamp > now).then(|| reset_timestamp - now)
}
