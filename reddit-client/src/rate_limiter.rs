use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Minimum spacing between two requests to the same source.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    pub min_interval: Duration,
    /// Extra random wait, as a fraction of `min_interval` (0.0 to 1.0).
    pub jitter_factor: f64,
}

impl RateLimitConfig {
    /// The public JSON listing endpoints throttle anonymous clients hard.
    pub fn reddit_json() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            jitter_factor: 0.2,
        }
    }

    pub fn pushshift() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            jitter_factor: 0.1,
        }
    }

    pub fn unpaced() -> Self {
        Self {
            min_interval: Duration::ZERO,
            jitter_factor: 0.0,
        }
    }

    /// Replaces the interval when the configuration overrides it.
    pub fn with_delay_ms(mut self, delay_ms: Option<u64>) -> Self {
        if let Some(ms) = delay_ms {
            self.min_interval = Duration::from_millis(ms);
        }
        self
    }

    pub fn next_delay(&self) -> Duration {
        let base_ms = self.min_interval.as_millis() as u64;
        let jitter_range = (base_ms as f64 * self.jitter_factor.clamp(0.0, 1.0)) as u64;
        let jitter = if jitter_range == 0 {
            0
        } else {
            fastrand::u64(0..=jitter_range)
        };
        self.min_interval + Duration::from_millis(jitter)
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            last_request: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Waits until the source may be called again and claims the slot.
    ///
    /// The lock is held across the sleep, so callers sharing a limiter are
    /// served one at a time.
    pub async fn acquire_permit(&self) -> RateLimitPermit {
        let start_time = Instant::now();
        let mut last_request = self.last_request.lock().await;

        if let Some(previous) = *last_request {
            let wait_for = self.config.next_delay();
            let elapsed = previous.elapsed();
            if elapsed < wait_for {
                let remaining = wait_for - elapsed;
                tracing::debug!("Pacing source requests, waiting {:?}", remaining);
                sleep(remaining).await;
            }
        }

        *last_request = Some(Instant::now());
        RateLimitPermit {
            queue_wait_time: start_time.elapsed(),
        }
    }
}

#[derive(Debug)]
pub struct RateLimitPermit {
    pub queue_wait_time: Duration,
}
