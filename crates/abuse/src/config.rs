//! Abuse-protection configuration.

use chrono::Duration;

use crate::limiter::RateLimiterConfig;

/// One detector's window, threshold, and tier expiry durations.
#[derive(Debug, Clone)]
pub struct PatternConfig {
    pub window: Duration,
    /// Counts strictly above this trigger the detector.
    pub threshold: u32,
    /// `throttle_until` horizon when this pattern pushes a subject into
    /// `Throttle`.
    pub throttle_for: Duration,
    /// `block_until` horizon when this pattern pushes a subject into `Block`.
    pub block_for: Duration,
}

/// Full engine configuration. Defaults match production expectations.
#[derive(Debug, Clone)]
pub struct AbuseConfig {
    /// Request bursts: >60 requests / 2 s.
    pub burst: PatternConfig,
    /// Auth-endpoint failure spam: >20 failures / 5 min.
    pub auth_failures: PatternConfig,
    /// Path scraping: >40 distinct normalized paths / 60 s.
    pub scraping: PatternConfig,
    /// Quiet time with no violations before a tier relaxes one step.
    pub cooldown: Duration,
    /// Token-bucket parameters applied to throttled subjects.
    pub limiter: RateLimiterConfig,
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            burst: PatternConfig {
                window: Duration::seconds(2),
                threshold: 60,
                throttle_for: Duration::minutes(1),
                block_for: Duration::minutes(5),
            },
            auth_failures: PatternConfig {
                window: Duration::minutes(5),
                threshold: 20,
                throttle_for: Duration::minutes(10),
                block_for: Duration::minutes(30),
            },
            scraping: PatternConfig {
                window: Duration::seconds(60),
                threshold: 40,
                throttle_for: Duration::minutes(5),
                block_for: Duration::minutes(15),
            },
            cooldown: Duration::minutes(10),
            limiter: RateLimiterConfig::default(),
        }
    }
}
