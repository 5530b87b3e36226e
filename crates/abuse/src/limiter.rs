//! Token-bucket rate limiter contract and in-process default.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Limiter parameters for throttled subjects.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Bucket capacity (burst allowance).
    pub burst_capacity: u32,
    /// Sustained refill rate, tokens per second.
    pub refill_per_second: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            burst_capacity: 5,
            refill_per_second: 1.0,
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum LimiterError {
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// When denied, how long until a token is available.
    pub retry_after: Duration,
}

/// Rate-limiter contract. The enforcement hook treats any error as denial
/// (fail-closed).
pub trait RateLimiter: Send + Sync {
    fn check_rate_limit(
        &self,
        key: &str,
        config: &RateLimiterConfig,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, LimiterError>;
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    refilled_at: DateTime<Utc>,
}

/// In-process token bucket, one bucket per key.
///
/// Buckets for idle keys are never reclaimed; like the rest of the abuse
/// state this is single-node and unbounded.
#[derive(Debug, Default)]
pub struct TokenBucketLimiter {
    buckets: RwLock<HashMap<String, Bucket>>,
}

impl TokenBucketLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn check_rate_limit(
        &self,
        key: &str,
        config: &RateLimiterConfig,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, LimiterError> {
        let capacity = f64::from(config.burst_capacity);
        let mut buckets = self.buckets.write().unwrap();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: capacity,
            refilled_at: now,
        });

        let elapsed = (now - bucket.refilled_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0;
        bucket.tokens = (bucket.tokens + elapsed * config.refill_per_second).min(capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(RateLimitDecision {
                allowed: true,
                retry_after: Duration::zero(),
            })
        } else {
            let deficit = 1.0 - bucket.tokens;
            let wait_ms = if config.refill_per_second > 0.0 {
                (deficit / config.refill_per_second * 1000.0).ceil() as i64
            } else {
                i64::from(u32::MAX)
            };
            Ok(RateLimitDecision {
                allowed: false,
                retry_after: Duration::milliseconds(wait_ms.max(1)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_capacity_then_denial() {
        let limiter = TokenBucketLimiter::new();
        let config = RateLimiterConfig {
            burst_capacity: 3,
            refill_per_second: 1.0,
        };
        let now = Utc::now();

        for _ in 0..3 {
            assert!(limiter.check_rate_limit("k", &config, now).unwrap().allowed);
        }
        let denied = limiter.check_rate_limit("k", &config, now).unwrap();
        assert!(!denied.allowed);
        assert!(denied.retry_after > Duration::zero());
    }

    #[test]
    fn tokens_refill_over_time() {
        let limiter = TokenBucketLimiter::new();
        let config = RateLimiterConfig {
            burst_capacity: 1,
            refill_per_second: 2.0,
        };
        let t0 = Utc::now();

        assert!(limiter.check_rate_limit("k", &config, t0).unwrap().allowed);
        assert!(!limiter.check_rate_limit("k", &config, t0).unwrap().allowed);
        // Half a second refills one token at 2 tokens/s.
        let t1 = t0 + Duration::milliseconds(600);
        assert!(limiter.check_rate_limit("k", &config, t1).unwrap().allowed);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = TokenBucketLimiter::new();
        let config = RateLimiterConfig {
            burst_capacity: 1,
            refill_per_second: 0.1,
        };
        let now = Utc::now();

        assert!(limiter.check_rate_limit("a", &config, now).unwrap().allowed);
        assert!(limiter.check_rate_limit("b", &config, now).unwrap().allowed);
        assert!(!limiter.check_rate_limit("a", &config, now).unwrap().allowed);
    }
}
