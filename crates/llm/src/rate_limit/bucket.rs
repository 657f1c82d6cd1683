use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use relnotes_core::{ConfigError, RateLimitConfig};
use tracing::{debug, info, warn};

use super::RateLimitExceeded;

#[derive(Debug, Clone)]
pub struct BucketConfig {
    /// Bucket capacity; also defines the refill rate (capacity per minute).
    pub requests_per_minute: u32,
    pub requests_per_day: u32,
    /// Poll interval while waiting for a token.
    pub min_request_interval: Duration,
}

impl BucketConfig {
    pub fn from_config(config: &RateLimitConfig) -> Result<Self, ConfigError> {
        if config.requests_per_minute == 0 {
            return Err(ConfigError::NotPositive { key: "REQUESTS_PER_MINUTE" });
        }
        if config.requests_per_day == 0 {
            return Err(ConfigError::NotPositive { key: "REQUESTS_PER_DAY" });
        }
        Ok(Self {
            requests_per_minute: config.requests_per_minute,
            requests_per_day: config.requests_per_day,
            min_request_interval: Duration::from_millis(config.min_request_interval_ms),
        })
    }

    fn refill_rate(&self) -> f64 {
        self.requests_per_minute as f64 / 60.0
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
    daily_requests: u32,
    last_reset: NaiveDate,
}

/// Token bucket with a daily ceiling.
///
/// All `*_at` methods take the current instant and calendar day explicitly;
/// the plain variants read the clock.
#[derive(Debug)]
pub struct BucketLimiter {
    config: BucketConfig,
    state: Mutex<BucketState>,
}

impl BucketLimiter {
    pub fn new(config: BucketConfig) -> Self {
        Self::new_at(config, Instant::now(), today())
    }

    pub fn new_at(config: BucketConfig, now: Instant, today: NaiveDate) -> Self {
        let state = BucketState {
            tokens: config.requests_per_minute as f64,
            last_refill: now,
            daily_requests: 0,
            last_reset: today,
        };
        Self { config, state: Mutex::new(state) }
    }

    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn refresh(&self, state: &mut BucketState, now: Instant, today: NaiveDate) {
        if today != state.last_reset {
            info!(
                previous = %state.last_reset,
                used = state.daily_requests,
                "new day, resetting daily request counter"
            );
            state.daily_requests = 0;
            state.last_reset = today;
        }

        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        let capacity = self.config.requests_per_minute as f64;
        state.tokens = (state.tokens + elapsed * self.config.refill_rate()).min(capacity);
        state.last_refill = now.max(state.last_refill);
    }

    fn check(&self, state: &BucketState) -> Result<(), RateLimitExceeded> {
        if state.daily_requests >= self.config.requests_per_day {
            return Err(RateLimitExceeded::Daily { limit: self.config.requests_per_day });
        }
        if state.tokens < 1.0 {
            return Err(RateLimitExceeded::Minute { limit: self.config.requests_per_minute });
        }
        Ok(())
    }

    /// Whether a request would be admitted now. Does not consume anything.
    pub fn can_make_request(&self) -> bool {
        self.can_make_request_at(Instant::now(), today())
    }

    pub fn can_make_request_at(&self, now: Instant, today: NaiveDate) -> bool {
        let mut state = self.lock();
        self.refresh(&mut state, now, today);
        self.check(&state).is_ok()
    }

    /// Record one request: take a token and bump the daily counter.
    pub fn increment_counters(&self) {
        self.increment_counters_at(Instant::now(), today())
    }

    pub fn increment_counters_at(&self, now: Instant, today: NaiveDate) {
        let mut state = self.lock();
        self.refresh(&mut state, now, today);
        state.tokens = (state.tokens - 1.0).max(0.0);
        state.daily_requests += 1;
    }

    /// Check and consume in one step.
    pub fn try_acquire(&self) -> Result<(), RateLimitExceeded> {
        self.try_acquire_at(Instant::now(), today())
    }

    pub fn try_acquire_at(&self, now: Instant, today: NaiveDate) -> Result<(), RateLimitExceeded> {
        let mut state = self.lock();
        self.refresh(&mut state, now, today);
        self.check(&state)?;
        state.tokens -= 1.0;
        state.daily_requests += 1;
        debug!(
            tokens = state.tokens,
            daily = state.daily_requests,
            "rate limit slot acquired"
        );
        Ok(())
    }

    /// Time until the next token is available (zero if one is ready).
    pub fn next_token_in_at(&self, now: Instant, today: NaiveDate) -> Duration {
        let mut state = self.lock();
        self.refresh(&mut state, now, today);
        if state.tokens >= 1.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((1.0 - state.tokens) / self.config.refill_rate())
    }

    /// Wait for a slot. Fails immediately once the daily ceiling is reached;
    /// a per-minute shortage is waited out.
    pub async fn acquire(&self) -> Result<(), RateLimitExceeded> {
        loop {
            match self.try_acquire() {
                Ok(()) => return Ok(()),
                Err(e) if e.is_daily() => {
                    warn!(limit = self.config.requests_per_day, "daily request ceiling reached");
                    return Err(e);
                }
                Err(_) => {
                    let wait = self
                        .next_token_in_at(Instant::now(), today())
                        .max(self.config.min_request_interval);
                    debug!(wait_ms = wait.as_millis() as u64, "waiting for rate limit token");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    pub fn daily_requests(&self) -> u32 {
        self.lock().daily_requests
    }

    pub fn remaining_today(&self) -> u32 {
        self.config.requests_per_day.saturating_sub(self.daily_requests())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rpm: u32, rpd: u32) -> BucketConfig {
        BucketConfig {
            requests_per_minute: rpm,
            requests_per_day: rpd,
            min_request_interval: Duration::from_millis(1),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn burst_of_capacity_then_rejection() {
        let t0 = Instant::now();
        let limiter = BucketLimiter::new_at(config(5, 25), t0, day(1));

        for _ in 0..5 {
            assert!(limiter.try_acquire_at(t0, day(1)).is_ok());
        }
        assert_eq!(
            limiter.try_acquire_at(t0, day(1)),
            Err(RateLimitExceeded::Minute { limit: 5 })
        );
        assert!(!limiter.can_make_request_at(t0, day(1)));
    }

    #[test]
    fn tokens_refill_continuously() {
        let t0 = Instant::now();
        let limiter = BucketLimiter::new_at(config(5, 25), t0, day(1));
        for _ in 0..5 {
            limiter.try_acquire_at(t0, day(1)).unwrap();
        }

        // 5 per minute = one token every 12 seconds.
        assert!(!limiter.can_make_request_at(t0 + Duration::from_secs(11), day(1)));
        assert!(limiter.can_make_request_at(t0 + Duration::from_secs(13), day(1)));
        assert!(limiter.try_acquire_at(t0 + Duration::from_secs(13), day(1)).is_ok());
        assert!(limiter.try_acquire_at(t0 + Duration::from_secs(13), day(1)).is_err());
    }

    #[test]
    fn refill_is_capped_at_capacity() {
        let t0 = Instant::now();
        let limiter = BucketLimiter::new_at(config(2, 25), t0, day(1));
        let later = t0 + Duration::from_secs(3600);

        assert!(limiter.try_acquire_at(later, day(1)).is_ok());
        assert!(limiter.try_acquire_at(later, day(1)).is_ok());
        assert!(limiter.try_acquire_at(later, day(1)).is_err());
    }

    #[test]
    fn can_make_request_does_not_consume() {
        let t0 = Instant::now();
        let limiter = BucketLimiter::new_at(config(1, 25), t0, day(1));
        assert!(limiter.can_make_request_at(t0, day(1)));
        assert!(limiter.can_make_request_at(t0, day(1)));
        assert_eq!(limiter.daily_requests(), 0);

        limiter.increment_counters_at(t0, day(1));
        assert!(!limiter.can_make_request_at(t0, day(1)));
        assert_eq!(limiter.daily_requests(), 1);
    }

    #[test]
    fn daily_ceiling_and_rollover() {
        let t0 = Instant::now();
        let limiter = BucketLimiter::new_at(config(60, 3), t0, day(1));
        let mut t = t0;
        for _ in 0..3 {
            t += Duration::from_secs(5);
            limiter.try_acquire_at(t, day(1)).unwrap();
        }

        t += Duration::from_secs(60);
        assert_eq!(
            limiter.try_acquire_at(t, day(1)),
            Err(RateLimitExceeded::Daily { limit: 3 })
        );
        assert_eq!(limiter.remaining_today(), 0);

        // First request on the next calendar day resets the counter.
        assert!(limiter.try_acquire_at(t, day(2)).is_ok());
        assert_eq!(limiter.daily_requests(), 1);
    }

    #[test]
    fn next_token_estimate() {
        let t0 = Instant::now();
        let limiter = BucketLimiter::new_at(config(6, 25), t0, day(1));
        assert_eq!(limiter.next_token_in_at(t0, day(1)), Duration::ZERO);
        for _ in 0..6 {
            limiter.try_acquire_at(t0, day(1)).unwrap();
        }
        // 6 per minute = one every 10 seconds.
        let wait = limiter.next_token_in_at(t0, day(1));
        assert!((wait.as_secs_f64() - 10.0).abs() < 0.01, "wait was {wait:?}");
    }

    #[tokio::test]
    async fn acquire_fails_fast_on_daily_ceiling() {
        let limiter = BucketLimiter::new(config(10, 1));
        assert!(limiter.acquire().await.is_ok());
        assert_eq!(
            limiter.acquire().await,
            Err(RateLimitExceeded::Daily { limit: 1 })
        );
    }

    #[test]
    fn from_config_rejects_zero() {
        let cfg = RateLimitConfig {
            requests_per_minute: 0,
            requests_per_day: 25,
            min_request_interval_ms: 200,
            max_parallel_chunks: 2,
            chunk_timeout_secs: 300,
        };
        assert!(BucketConfig::from_config(&cfg).is_err());
    }
}
