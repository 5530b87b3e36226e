//! Per-subject detection and enforcement engine.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;

use ledgergate_audit::{Details, RbacAuditLogger};
use ledgergate_core::RequestId;

use crate::config::{AbuseConfig, PatternConfig};
use crate::limiter::RateLimiter;
use crate::subject::SubjectKey;
use crate::tier::Tier;
use crate::window::{normalize_path, KeyedWindow, SlidingWindow};

/// Which detector fired.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Pattern {
    AuthFailures,
    Scraping,
    Burst,
}

impl Pattern {
    fn as_str(&self) -> &'static str {
        match self {
            Self::AuthFailures => "AUTH_FAILURES",
            Self::Scraping => "SCRAPING",
            Self::Burst => "BURST",
        }
    }
}

#[derive(Debug)]
struct AbuseState {
    tier: Tier,
    tier_since: DateTime<Utc>,
    last_escalation_at: Option<DateTime<Utc>>,
    block_until: Option<DateTime<Utc>>,
    throttle_until: Option<DateTime<Utc>>,
    requests: SlidingWindow,
    auth_failures: SlidingWindow,
    scraped_paths: KeyedWindow,
}

impl AbuseState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            tier: Tier::Normal,
            tier_since: now,
            last_escalation_at: None,
            block_until: None,
            throttle_until: None,
            requests: SlidingWindow::new(),
            auth_failures: SlidingWindow::new(),
            scraped_paths: KeyedWindow::new(),
        }
    }
}

/// Pre-request enforcement outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcementDecision {
    Allow,
    Throttled { retry_after: Duration },
    Blocked { retry_after: Duration },
}

/// Engine-wide counters for operator dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct AbuseMetrics {
    pub subjects: usize,
    pub normal: usize,
    pub warned: usize,
    pub throttled: usize,
    pub blocked: usize,
}

/// Sliding-window pattern detectors driving the four-tier escalation state
/// machine, enforced in a pre-request hook.
///
/// Call discipline per request: [`check_request`](Self::check_request) and
/// [`record_request`](Self::record_request) strictly before the route handler
/// runs, [`record_response`](Self::record_response) strictly after the
/// response is finalized. Tier recomputation only happens in the end phase, so
/// one request moves a subject at most one tier, never mid-handler.
pub struct AbuseProtectionEngine {
    config: AbuseConfig,
    limiter: Arc<dyn RateLimiter>,
    audit: Option<Arc<RbacAuditLogger>>,
    states: RwLock<HashMap<SubjectKey, AbuseState>>,
}

impl AbuseProtectionEngine {
    pub fn new(
        config: AbuseConfig,
        limiter: Arc<dyn RateLimiter>,
        audit: Option<Arc<RbacAuditLogger>>,
    ) -> Self {
        Self {
            config,
            limiter,
            audit,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Pre-request enforcement. Fail-closed: a limiter failure throttles.
    pub fn check_request(&self, subject: &SubjectKey, now: DateTime<Utc>) -> EnforcementDecision {
        let (tier, block_until) = {
            let mut states = self.states.write().unwrap();
            let state = states.entry(*subject).or_insert_with(|| AbuseState::new(now));
            self.maybe_relax(state, now);
            (state.tier, state.block_until)
        };

        match tier {
            Tier::Block => {
                let retry_after = block_until
                    .map(|until| until - now)
                    .filter(|d| *d > Duration::zero())
                    .unwrap_or(self.config.cooldown);
                EnforcementDecision::Blocked { retry_after }
            }
            Tier::Throttle => {
                match self
                    .limiter
                    .check_rate_limit(&subject.bucket_key(), &self.config.limiter, now)
                {
                    Ok(decision) if decision.allowed => EnforcementDecision::Allow,
                    Ok(decision) => EnforcementDecision::Throttled {
                        retry_after: decision.retry_after,
                    },
                    Err(err) => {
                        warn!(error = %err, subject = %subject, "rate limiter failed; throttling");
                        EnforcementDecision::Throttled {
                            retry_after: Duration::seconds(1),
                        }
                    }
                }
            }
            Tier::Warn | Tier::Normal => EnforcementDecision::Allow,
        }
    }

    /// Start-phase tracking: burst and scraping windows. Never recomputes the
    /// tier.
    pub fn record_request(&self, subject: &SubjectKey, path: &str, now: DateTime<Utc>) {
        let mut states = self.states.write().unwrap();
        let state = states.entry(*subject).or_insert_with(|| AbuseState::new(now));
        state.requests.note(now, self.config.burst.window);
        state
            .scraped_paths
            .note(now, normalize_path(path), self.config.scraping.window);
    }

    /// End-phase tracking: auth-failure window and tier recomputation.
    ///
    /// One detection cycle per call; at most one tier step, regardless of how
    /// many detectors fire or by how much a threshold is exceeded.
    pub fn record_response(
        &self,
        subject: &SubjectKey,
        path: &str,
        status: u16,
        request_id: &RequestId,
        now: DateTime<Utc>,
    ) {
        let mut states = self.states.write().unwrap();
        let state = states.entry(*subject).or_insert_with(|| AbuseState::new(now));

        if status >= 400 && is_auth_endpoint(path) {
            state
                .auth_failures
                .note(now, self.config.auth_failures.window);
        }

        let triggered = self.evaluate(state, now);
        if let Some(pattern) = triggered {
            self.escalate(subject, state, pattern, request_id, now);
        }
    }

    /// Current tier without mutating state (lazy expiries not applied).
    pub fn tier_of(&self, subject: &SubjectKey) -> Tier {
        self.states
            .read()
            .unwrap()
            .get(subject)
            .map_or(Tier::Normal, |s| s.tier)
    }

    pub fn metrics(&self) -> AbuseMetrics {
        let states = self.states.read().unwrap();
        let mut metrics = AbuseMetrics {
            subjects: states.len(),
            normal: 0,
            warned: 0,
            throttled: 0,
            blocked: 0,
        };
        for state in states.values() {
            match state.tier {
                Tier::Normal => metrics.normal += 1,
                Tier::Warn => metrics.warned += 1,
                Tier::Throttle => metrics.throttled += 1,
                Tier::Block => metrics.blocked += 1,
            }
        }
        metrics
    }

    // ─────────────────────────────────────────────────────────────────────
    // Detection
    // ─────────────────────────────────────────────────────────────────────

    /// Evaluate all detectors; returns the most severe triggered pattern.
    fn evaluate(&self, state: &mut AbuseState, now: DateTime<Utc>) -> Option<Pattern> {
        let auth = &self.config.auth_failures;
        if state.auth_failures.count(now, auth.window) > auth.threshold as usize {
            return Some(Pattern::AuthFailures);
        }
        let scraping = &self.config.scraping;
        if state.scraped_paths.distinct(now, scraping.window) > scraping.threshold as usize {
            return Some(Pattern::Scraping);
        }
        let burst = &self.config.burst;
        if state.requests.count(now, burst.window) > burst.threshold as usize {
            return Some(Pattern::Burst);
        }
        None
    }

    fn pattern_config(&self, pattern: Pattern) -> &PatternConfig {
        match pattern {
            Pattern::AuthFailures => &self.config.auth_failures,
            Pattern::Scraping => &self.config.scraping,
            Pattern::Burst => &self.config.burst,
        }
    }

    fn escalate(
        &self,
        subject: &SubjectKey,
        state: &mut AbuseState,
        pattern: Pattern,
        request_id: &RequestId,
        now: DateTime<Utc>,
    ) {
        let from = state.tier;
        let to = from.escalated();
        state.last_escalation_at = Some(now);
        if to != from {
            state.tier = to;
            state.tier_since = now;
        }

        let config = self.pattern_config(pattern);
        match state.tier {
            Tier::Throttle => state.throttle_until = Some(now + config.throttle_for),
            Tier::Block => state.block_until = Some(now + config.block_for),
            Tier::Normal | Tier::Warn => {}
        }

        warn!(
            subject = %subject,
            pattern = pattern.as_str(),
            from = from.as_str(),
            to = state.tier.as_str(),
            "abuse tier escalated"
        );

        if let (Some(audit), Some((tenant, user))) = (&self.audit, subject.tenant_user()) {
            let mut details = Details::new();
            details.insert("pattern".to_string(), pattern.as_str().into());
            details.insert("tier".to_string(), state.tier.as_str().into());
            audit.suspicious_access(
                tenant,
                user,
                user,
                request_id,
                &format!("ABUSE_{}", pattern.as_str()),
                details,
            );
        }
    }

    /// Lazy de-escalation: at most one step per contact.
    ///
    /// `Block` relaxes when its expiry passes; `Throttle` and `Warn` relax
    /// after a quiet cooldown with no new violations.
    fn maybe_relax(&self, state: &mut AbuseState, now: DateTime<Utc>) {
        let quiet = state
            .last_escalation_at
            .is_none_or(|t| now - t >= self.config.cooldown);

        match state.tier {
            Tier::Block => {
                if state.block_until.is_some_and(|until| now >= until) {
                    state.tier = state.tier.relaxed();
                    state.tier_since = now;
                    state.block_until = None;
                    state.throttle_until = Some(now + self.config.cooldown);
                }
            }
            Tier::Throttle => {
                let expired = state.throttle_until.is_none_or(|until| now >= until);
                if expired && quiet {
                    state.tier = state.tier.relaxed();
                    state.tier_since = now;
                    state.throttle_until = None;
                }
            }
            Tier::Warn => {
                if quiet && now - state.tier_since >= self.config.cooldown {
                    state.tier = state.tier.relaxed();
                    state.tier_since = now;
                }
            }
            Tier::Normal => {}
        }
    }
}

fn is_auth_endpoint(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    ["/auth", "/login", "/token", "/session"]
        .iter()
        .any(|marker| path.contains(marker))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::{RateLimiterConfig, TokenBucketLimiter};
    use std::net::IpAddr;

    fn engine() -> AbuseProtectionEngine {
        AbuseProtectionEngine::new(
            AbuseConfig::default(),
            Arc::new(TokenBucketLimiter::new()),
            None,
        )
    }

    fn ip_subject(last_octet: u8) -> SubjectKey {
        let ip: IpAddr = format!("203.0.113.{last_octet}").parse().unwrap();
        SubjectKey::Ip(ip)
    }

    fn req_id() -> RequestId {
        RequestId::from_upstream("req-1")
    }

    #[test]
    fn burst_detection_steps_exactly_one_tier() {
        let engine = engine();
        let subject = ip_subject(1);
        let now = Utc::now();

        // 61 requests inside the 2-second burst window.
        for i in 0..61 {
            engine.record_request(&subject, "/invoices", now + Duration::milliseconds(i * 10));
        }
        let eval_at = now + Duration::milliseconds(700);
        engine.record_response(&subject, "/invoices", 200, &req_id(), eval_at);

        // First detection: NORMAL → WARN, never a jump.
        assert_eq!(engine.tier_of(&subject), Tier::Warn);
    }

    #[test]
    fn sustained_violations_step_one_tier_per_cycle() {
        let engine = engine();
        let subject = ip_subject(2);
        let now = Utc::now();

        for i in 0..61 {
            engine.record_request(&subject, "/invoices", now + Duration::milliseconds(i * 10));
        }
        let eval_at = now + Duration::milliseconds(700);
        let expected = [Tier::Warn, Tier::Throttle, Tier::Block, Tier::Block];
        for (i, want) in expected.iter().enumerate() {
            engine.record_response(
                &subject,
                "/invoices",
                200,
                &req_id(),
                eval_at + Duration::milliseconds(i as i64 * 10),
            );
            assert_eq!(engine.tier_of(&subject), *want, "cycle {i}");
        }
    }

    #[test]
    fn auth_failure_spam_escalates_to_block_and_blocks_next_request() {
        let engine = engine();
        let subject = ip_subject(3);
        let t0 = Utc::now();

        // Failed auth responses inside the 5-minute window. The threshold
        // (>20) first fires at failure 21; each further failure is its own
        // detection cycle, stepping WARN → THROTTLE → BLOCK.
        let mut now = t0;
        for i in 0..23 {
            now = t0 + Duration::seconds(i);
            engine.record_response(&subject, "/auth/login", 401, &req_id(), now);
        }
        assert_eq!(engine.tier_of(&subject), Tier::Block);

        let decision = engine.check_request(&subject, now + Duration::seconds(1));
        let EnforcementDecision::Blocked { retry_after } = decision else {
            panic!("expected block, got {decision:?}");
        };
        assert!(retry_after > Duration::zero());
    }

    #[test]
    fn successful_auth_responses_do_not_count_as_failures() {
        let engine = engine();
        let subject = ip_subject(4);
        let t0 = Utc::now();

        for i in 0..30 {
            engine.record_response(
                &subject,
                "/auth/login",
                200,
                &req_id(),
                t0 + Duration::seconds(i),
            );
        }
        assert_eq!(engine.tier_of(&subject), Tier::Normal);
    }

    #[test]
    fn scraping_distinct_paths_triggers_but_id_variants_do_not() {
        let engine = engine();
        let t0 = Utc::now();

        // 50 distinct invoice IDs normalize to one path: no detection.
        let ids = ip_subject(5);
        for i in 0..50 {
            let path = format!("/invoices/inv-{i}");
            let at = t0 + Duration::milliseconds(i * 20);
            engine.record_request(&ids, &path, at);
        }
        engine.record_response(&ids, "/invoices/inv-0", 200, &req_id(), t0 + Duration::seconds(2));
        assert_eq!(engine.tier_of(&ids), Tier::Normal);

        // 41 genuinely distinct paths inside 60 s: detection.
        let scraper = ip_subject(6);
        for i in 0..41 {
            let path = format!("/area{i}/list");
            let at = t0 + Duration::milliseconds(i * 20);
            engine.record_request(&scraper, &path, at);
        }
        engine.record_response(&scraper, "/area0/list", 200, &req_id(), t0 + Duration::seconds(2));
        assert_eq!(engine.tier_of(&scraper), Tier::Warn);
    }

    #[test]
    fn throttle_tier_delegates_to_token_bucket() {
        let engine = AbuseProtectionEngine::new(
            AbuseConfig {
                limiter: RateLimiterConfig {
                    burst_capacity: 2,
                    refill_per_second: 0.01,
                },
                ..AbuseConfig::default()
            },
            Arc::new(TokenBucketLimiter::new()),
            None,
        );
        let subject = ip_subject(7);
        let t0 = Utc::now();

        // Drive the subject to THROTTLE via two burst detection cycles.
        for i in 0..61 {
            engine.record_request(&subject, "/invoices", t0 + Duration::milliseconds(i * 10));
        }
        let eval = t0 + Duration::milliseconds(700);
        engine.record_response(&subject, "/invoices", 200, &req_id(), eval);
        engine.record_response(&subject, "/invoices", 200, &req_id(), eval);
        assert_eq!(engine.tier_of(&subject), Tier::Throttle);

        let at = eval + Duration::seconds(1);
        assert_eq!(engine.check_request(&subject, at), EnforcementDecision::Allow);
        assert_eq!(engine.check_request(&subject, at), EnforcementDecision::Allow);
        let third = engine.check_request(&subject, at);
        let EnforcementDecision::Throttled { retry_after } = third else {
            panic!("expected throttle, got {third:?}");
        };
        assert!(retry_after > Duration::zero());
    }

    #[test]
    fn block_expiry_relaxes_one_step_not_to_normal() {
        let engine = engine();
        let subject = ip_subject(8);
        let t0 = Utc::now();

        for i in 0..23 {
            engine.record_response(
                &subject,
                "/auth/login",
                401,
                &req_id(),
                t0 + Duration::seconds(i),
            );
        }
        assert_eq!(engine.tier_of(&subject), Tier::Block);

        // Past block_until (30 min for the auth pattern): one step down.
        let later = t0 + Duration::minutes(31);
        let decision = engine.check_request(&subject, later);
        assert_eq!(engine.tier_of(&subject), Tier::Throttle);
        assert!(!matches!(decision, EnforcementDecision::Blocked { .. }));
    }

    #[test]
    fn throttle_expiry_relaxes_to_warn_not_normal() {
        let engine = engine();
        let subject = ip_subject(14);
        let t0 = Utc::now();

        // Two burst cycles: NORMAL → WARN → THROTTLE.
        for i in 0..61 {
            engine.record_request(&subject, "/invoices", t0 + Duration::milliseconds(i * 10));
        }
        let eval = t0 + Duration::milliseconds(700);
        engine.record_response(&subject, "/invoices", 200, &req_id(), eval);
        engine.record_response(&subject, "/invoices", 200, &req_id(), eval);
        assert_eq!(engine.tier_of(&subject), Tier::Throttle);

        // Quiet past the throttle expiry and cooldown: exactly one step down.
        engine.check_request(&subject, eval + Duration::minutes(11));
        assert_eq!(engine.tier_of(&subject), Tier::Warn);
    }

    #[test]
    fn warn_decays_to_normal_after_quiet_cooldown() {
        let engine = engine();
        let subject = ip_subject(9);
        let t0 = Utc::now();

        for i in 0..61 {
            engine.record_request(&subject, "/invoices", t0 + Duration::milliseconds(i * 10));
        }
        engine.record_response(&subject, "/invoices", 200, &req_id(), t0 + Duration::seconds(1));
        assert_eq!(engine.tier_of(&subject), Tier::Warn);

        // Quiet for the 10-minute cooldown.
        engine.check_request(&subject, t0 + Duration::minutes(11));
        assert_eq!(engine.tier_of(&subject), Tier::Normal);
    }

    #[test]
    fn subjects_are_isolated() {
        let engine = engine();
        let noisy = ip_subject(10);
        let quiet = ip_subject(11);
        let t0 = Utc::now();

        for i in 0..23 {
            engine.record_response(&noisy, "/auth/login", 401, &req_id(), t0 + Duration::seconds(i));
        }
        assert_eq!(engine.tier_of(&noisy), Tier::Block);
        assert_eq!(engine.tier_of(&quiet), Tier::Normal);
        assert_eq!(
            engine.check_request(&quiet, t0 + Duration::seconds(30)),
            EnforcementDecision::Allow
        );
    }

    #[test]
    fn metrics_count_tiers() {
        let engine = engine();
        let t0 = Utc::now();
        for i in 0..23 {
            engine.record_response(
                &ip_subject(12),
                "/auth/login",
                401,
                &req_id(),
                t0 + Duration::seconds(i),
            );
        }
        engine.check_request(&ip_subject(13), t0);

        let metrics = engine.metrics();
        assert_eq!(metrics.subjects, 2);
        assert_eq!(metrics.blocked, 1);
        assert_eq!(metrics.normal, 1);
    }
}
