//! Fixed-window request counting per client key.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::{Duration, Instant},
};

use moka::future::Cache;

#[derive(Debug)]
struct Window {
    started: Instant,
    hits: AtomicU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { wait_for: Duration },
}

/// Each key gets `max` hits per window. The window opens on the key's first hit
/// and the entry expires with it.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Cache<String, Arc<Window>>,
    max: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        let windows = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(window)
            .build();
        Self {
            windows,
            max,
            window,
        }
    }

    pub async fn check(&self, key: &str) -> RateLimitDecision {
        let entry = self
            .windows
            .get_with(key.to_string(), async {
                Arc::new(Window {
                    started: Instant::now(),
                    hits: AtomicU32::new(0),
                })
            })
            .await;
        let hits = entry.hits.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        if hits > self.max {
            RateLimitDecision::Limited {
                wait_for: self.window.saturating_sub(entry.started.elapsed()),
            }
        } else {
            RateLimitDecision::Allowed {
                remaining: self.max - hits,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limits_after_max_hits() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert_eq!(
            limiter.check("10.0.0.1").await,
            RateLimitDecision::Allowed { remaining: 1 }
        );
        assert_eq!(
            limiter.check("10.0.0.1").await,
            RateLimitDecision::Allowed { remaining: 0 }
        );
        match limiter.check("10.0.0.1").await {
            RateLimitDecision::Limited { wait_for } => {
                assert!(wait_for <= Duration::from_secs(60));
                assert!(wait_for > Duration::from_secs(50));
            }
            other => panic!("expected limit, got {other:?}"),
        }
        // other clients are counted separately
        assert_eq!(
            limiter.check("10.0.0.2").await,
            RateLimitDecision::Allowed { remaining: 1 }
        );
    }

    #[tokio::test]
    async fn test_window_expires() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));
        limiter.check("k").await;
        assert!(matches!(
            limiter.check("k").await,
            RateLimitDecision::Limited { .. }
        ));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(
            limiter.check("k").await,
            RateLimitDecision::Allowed { remaining: 0 }
        );
    }
}
