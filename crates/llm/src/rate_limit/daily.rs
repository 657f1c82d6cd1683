use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use relnotes_core::ConfigError;
use tracing::{debug, warn};

use super::RateLimitExceeded;

/// Counts successful requests against a per-day maximum.
///
/// Failed calls do not consume budget. The counter never resets on its own;
/// a limiter lives for one run.
#[derive(Debug)]
pub struct DailyLimiter {
    max_requests_per_day: u32,
    request_counter: AtomicU32,
}

impl DailyLimiter {
    pub fn new(max_requests_per_day: u32) -> Result<Self, ConfigError> {
        if max_requests_per_day == 0 {
            return Err(ConfigError::NotPositive { key: "REQUESTS_PER_DAY" });
        }
        Ok(Self {
            max_requests_per_day,
            request_counter: AtomicU32::new(0),
        })
    }

    pub fn max_requests_per_day(&self) -> u32 {
        self.max_requests_per_day
    }

    pub fn count(&self) -> u32 {
        self.request_counter.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> u32 {
        self.max_requests_per_day.saturating_sub(self.count())
    }

    pub fn reset(&self) {
        self.request_counter.store(0, Ordering::SeqCst);
    }

    /// Run `f` if budget remains. A slot is reserved before `f` runs and
    /// handed back if `f` fails, so concurrent callers never overshoot the
    /// budget and failures do not consume it. An exhausted budget returns the
    /// error without invoking `f`.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<RateLimitExceeded>,
    {
        let max = self.max_requests_per_day;
        let reserved = self
            .request_counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| (c < max).then_some(c + 1));
        let used = match reserved {
            Ok(prev) => prev + 1,
            Err(_) => {
                warn!(limit = max, "daily request budget exhausted");
                return Err(RateLimitExceeded::Daily { limit: max }.into());
            }
        };

        match f().await {
            Ok(value) => {
                debug!(used, limit = max, "request counted");
                Ok(value)
            }
            Err(e) => {
                self.request_counter.fetch_sub(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Limited(RateLimitExceeded),
        Failed,
    }

    impl From<RateLimitExceeded> for TestError {
        fn from(e: RateLimitExceeded) -> Self {
            TestError::Limited(e)
        }
    }

    #[test]
    fn zero_budget_is_a_config_error() {
        assert!(matches!(
            DailyLimiter::new(0),
            Err(ConfigError::NotPositive { key: "REQUESTS_PER_DAY" })
        ));
    }

    #[tokio::test]
    async fn exact_budget_then_rejection_without_invoking() {
        let limiter = DailyLimiter::new(3).unwrap();
        let invoked = AtomicUsize::new(0);
        let invoked = &invoked;

        for i in 0..3 {
            let out: Result<usize, TestError> = limiter
                .call(move || async move {
                    invoked.fetch_add(1, Ordering::SeqCst);
                    Ok(i)
                })
                .await;
            assert_eq!(out, Ok(i));
        }
        assert_eq!(limiter.count(), 3);
        assert_eq!(limiter.remaining(), 0);

        let out: Result<usize, TestError> = limiter
            .call(move || async move {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .await;
        assert_eq!(out, Err(TestError::Limited(RateLimitExceeded::Daily { limit: 3 })));
        assert_eq!(invoked.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failures_do_not_consume_budget() {
        let limiter = DailyLimiter::new(1).unwrap();

        let out: Result<(), TestError> = limiter.call(|| async { Err(TestError::Failed) }).await;
        assert_eq!(out, Err(TestError::Failed));
        assert_eq!(limiter.count(), 0);

        let out: Result<&str, TestError> = limiter.call(|| async { Ok("ok") }).await;
        assert_eq!(out, Ok("ok"));
        assert_eq!(limiter.count(), 1);
    }

    #[tokio::test]
    async fn reset_restores_budget() {
        let limiter = DailyLimiter::new(1).unwrap();
        let _: Result<(), TestError> = limiter.call(|| async { Ok(()) }).await;
        assert_eq!(limiter.remaining(), 0);

        limiter.reset();
        assert_eq!(limiter.remaining(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_cannot_overshoot_budget() {
        let limiter = DailyLimiter::new(1).unwrap();
        let call = || {
            limiter.call(|| async {
                tokio::task::yield_now().await;
                Ok::<(), TestError>(())
            })
        };

        let (a, b) = tokio::join!(call(), call());

        let ok = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1, "a={a:?} b={b:?}");
        assert!([&a, &b]
            .iter()
            .any(|r| **r == Err(TestError::Limited(RateLimitExceeded::Daily { limit: 1 }))));
        assert_eq!(limiter.count(), 1);
    }

    #[tokio::test]
    async fn failed_call_returns_its_reserved_slot() {
        let limiter = DailyLimiter::new(1).unwrap();
        let (a, b) = tokio::join!(
            limiter.call(|| async {
                tokio::task::yield_now().await;
                Err::<(), TestError>(TestError::Failed)
            }),
            limiter.call(|| async { Ok::<(), TestError>(()) }),
        );

        assert_eq!(a, Err(TestError::Failed));
        // The second call saw the slot held by the first and was refused.
        assert_eq!(b, Err(TestError::Limited(RateLimitExceeded::Daily { limit: 1 })));
        assert_eq!(limiter.count(), 0);

        let out: Result<(), TestError> = limiter.call(|| async { Ok(()) }).await;
        assert_eq!(out, Ok(()));
        assert_eq!(limiter.count(), 1);
    }
}
