use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Request-rate limiter shared by every catalog lookup in a run.
/// Cloning shares the same bucket.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    requests_per_sec: u32,
    // token bucket: current tokens and the time of the last refill
    tokens: Mutex<(f64, Instant)>,
}

impl RateLimiter {
    /// `requests_per_sec == 0` disables limiting
    pub fn new(requests_per_sec: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                requests_per_sec,
                tokens: Mutex::new((requests_per_sec as f64, Instant::now())),
            }),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Waits until one request may be sent.
    pub async fn acquire(&self) {
        let capacity = self.inner.requests_per_sec as f64;
        if capacity <= 0.0 {
            return;
        }

        loop {
            let mut guard = self.inner.tokens.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *tokens = (*tokens + elapsed * capacity).min(capacity);
            *last = now;
            if *tokens >= 1.0 {
                *tokens -= 1.0;
                break;
            }
            let secs = (1.0 - *tokens) / capacity;
            drop(guard);
            tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
        }
    }
}
