//! `ledgergate-abuse`: stateful per-client abuse detection and enforcement.
//!
//! Three sliding-window detectors (request bursts, auth-endpoint failure
//! spam, path scraping) drive a four-tier escalation state machine per
//! subject. Enforcement happens in a pre-request hook: `BLOCK` rejects with a
//! retry-after, `THROTTLE` caps the subject through a token-bucket limiter.
//!
//! Tier transitions are strictly monotonic: one step up per detection cycle,
//! one step down per cooldown/expiry event, never a skip. Expiries are
//! evaluated lazily on the subject's next contact; there is no background
//! sweep. All state is in-process: it does not survive a restart and is not
//! shared across replicas.

pub mod config;
pub mod engine;
pub mod limiter;
pub mod subject;
pub mod tier;
pub mod window;

pub use config::{AbuseConfig, PatternConfig};
pub use engine::{AbuseMetrics, AbuseProtectionEngine, EnforcementDecision};
pub use limiter::{
    LimiterError, RateLimitDecision, RateLimiter, RateLimiterConfig, TokenBucketLimiter,
};
pub use subject::SubjectKey;
pub use tier::Tier;
