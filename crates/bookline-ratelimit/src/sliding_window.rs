//! Sliding-window rate limiter
//!
//! An in-process limiter keeping an ordered set of request timestamps per
//! key. The prune-then-append sequence on `check` runs under one lock, so
//! two concurrent requests for the same key can never both claim the last
//! remaining slot.
//!
//! Correctness holds only within a single process. Multi-instance
//! deployments need a shared counter behind the same [`RateLimiter`]
//! interface.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// How often the background sweeper prunes fully-expired records.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,

    /// Requests left in the current window after this one
    pub remaining: u32,

    /// When the window frees its oldest slot
    pub reset_at: DateTime<Utc>,

    /// For denied requests, how long to wait before retrying
    /// (ceiled to whole seconds)
    pub retry_after: Option<Duration>,
}

/// Debug snapshot of one key's window.
#[derive(Debug, Clone, Default)]
pub struct RateLimitStats {
    /// Requests currently inside the window
    pub in_window: u32,

    /// Age of the oldest in-window request
    pub oldest_age: Option<Duration>,
}

/// Interface all limiter implementations expose.
///
/// The in-process sliding window below is one interchangeable
/// implementation; a deployment spanning multiple processes would put a
/// shared counter service behind this same trait.
pub trait RateLimiter: Send + Sync {
    /// Record an attempt for `key` and decide whether it may proceed.
    fn check(&self, key: &str) -> RateLimitDecision;

    /// Drop all recorded attempts for `key`.
    fn reset(&self, key: &str);

    /// Snapshot the current window for `key`.
    fn stats(&self, key: &str) -> RateLimitStats;
}

struct WindowRecord {
    timestamps: VecDeque<Instant>,
}

/// Sliding-window limiter over an in-memory record map.
///
/// Records are keyed by `prefix:key` where the prefix comes from the
/// instance's [`RateLimitConfig`], so distinct named instances (invitations,
/// status changes, resend links, admin creation) never share windows even if
/// their raw keys collide.
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    records: Mutex<HashMap<String, WindowRecord>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter for the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// The configuration this instance enforces.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.config.prefix, key)
    }

    /// Remove records whose windows have fully expired.
    ///
    /// Bounds memory growth for keys that stopped sending requests. Called
    /// periodically by the task spawned from [`Self::spawn_sweeper`].
    pub fn sweep(&self) {
        let window = self.config.window();
        let now = Instant::now();
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, record| {
            record
                .timestamps
                .back()
                .map(|newest| now.duration_since(*newest) < window)
                .unwrap_or(false)
        });
        let removed = before - records.len();
        if removed > 0 {
            tracing::debug!(
                prefix = %self.config.prefix,
                removed,
                remaining = records.len(),
                "swept expired rate limit records"
            );
        }
    }

    /// Spawn a background task sweeping expired records every five minutes.
    ///
    /// The task runs for the life of the process; dropping the handle
    /// detaches it.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                limiter.sweep();
            }
        })
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, key: &str) -> RateLimitDecision {
        let window = self.config.window();
        let max = self.config.max_requests;
        let now = Instant::now();
        let namespaced = self.namespaced(key);

        // Prune and append under one lock: the critical section that keeps
        // concurrent checks for the same key from double-claiming the last
        // slot.
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(namespaced)
            .or_insert_with(|| WindowRecord {
                timestamps: VecDeque::new(),
            });

        while let Some(oldest) = record.timestamps.front() {
            if now.duration_since(*oldest) >= window {
                record.timestamps.pop_front();
            } else {
                break;
            }
        }

        let count = record.timestamps.len() as u32;
        if count < max {
            record.timestamps.push_back(now);
            let oldest = *record.timestamps.front().unwrap();
            let resets_in = window.saturating_sub(now.duration_since(oldest));
            RateLimitDecision {
                allowed: true,
                remaining: max - count - 1,
                reset_at: Utc::now() + chrono::Duration::from_std(resets_in).unwrap_or_else(|_| chrono::Duration::zero()),
                retry_after: None,
            }
        } else {
            let oldest = *record.timestamps.front().unwrap();
            let resets_in = window.saturating_sub(now.duration_since(oldest));
            let retry_after = Duration::from_secs(resets_in.as_secs_f64().ceil().max(1.0) as u64);
            tracing::debug!(
                prefix = %self.config.prefix,
                key,
                retry_after_secs = retry_after.as_secs(),
                "rate limit exceeded"
            );
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: Utc::now() + chrono::Duration::from_std(resets_in).unwrap_or_else(|_| chrono::Duration::zero()),
                retry_after: Some(retry_after),
            }
        }
    }

    fn reset(&self, key: &str) {
        let namespaced = self.namespaced(key);
        self.records.lock().unwrap().remove(&namespaced);
    }

    fn stats(&self, key: &str) -> RateLimitStats {
        let window = self.config.window();
        let now = Instant::now();
        let namespaced = self.namespaced(key);
        let records = self.records.lock().unwrap();
        match records.get(&namespaced) {
            Some(record) => {
                let in_window = record
                    .timestamps
                    .iter()
                    .filter(|ts| now.duration_since(**ts) < window)
                    .count() as u32;
                RateLimitStats {
                    in_window,
                    oldest_age: record.timestamps.front().map(|ts| now.duration_since(*ts)),
                }
            }
            None => RateLimitStats::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, window: Duration) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(RateLimitConfig::new("test", max, window))
    }

    #[test]
    fn test_allows_up_to_max_then_denies() {
        let limiter = limiter(3, Duration::from_secs(1));

        for i in 0..3 {
            let decision = limiter.check("k");
            assert!(decision.allowed, "call {i} should be allowed");
        }

        let denied = limiter.check("k");
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after.unwrap() > Duration::ZERO);
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = limiter(3, Duration::from_secs(10));
        assert_eq!(limiter.check("k").remaining, 2);
        assert_eq!(limiter.check("k").remaining, 1);
        assert_eq!(limiter.check("k").remaining, 0);
    }

    #[test]
    fn test_window_recovers_after_expiry() {
        let limiter = limiter(2, Duration::from_millis(50));
        assert!(limiter.check("k").allowed);
        assert!(limiter.check("k").allowed);
        assert!(!limiter.check("k").allowed);

        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.check("k").allowed);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1, Duration::from_secs(10));
        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);
        assert!(limiter.check("b").allowed);
    }

    #[test]
    fn test_prefixes_are_independent() {
        let invites = SlidingWindowLimiter::new(RateLimitConfig::new(
            "invite",
            1,
            Duration::from_secs(10),
        ));
        let status = SlidingWindowLimiter::new(RateLimitConfig::new(
            "status",
            1,
            Duration::from_secs(10),
        ));
        assert!(invites.check("actor-1").allowed);
        assert!(!invites.check("actor-1").allowed);
        // Same raw key, different instance: unaffected.
        assert!(status.check("actor-1").allowed);
    }

    #[test]
    fn test_reset_clears_window() {
        let limiter = limiter(1, Duration::from_secs(10));
        assert!(limiter.check("k").allowed);
        assert!(!limiter.check("k").allowed);
        limiter.reset("k");
        assert!(limiter.check("k").allowed);
    }

    #[test]
    fn test_stats_reports_window() {
        let limiter = limiter(5, Duration::from_secs(10));
        limiter.check("k");
        limiter.check("k");
        let stats = limiter.stats("k");
        assert_eq!(stats.in_window, 2);
        assert!(stats.oldest_age.is_some());
        assert_eq!(limiter.stats("unknown").in_window, 0);
    }

    #[test]
    fn test_sweep_drops_expired_records() {
        let limiter = limiter(2, Duration::from_millis(30));
        limiter.check("k");
        std::thread::sleep(Duration::from_millis(60));
        limiter.sweep();
        assert_eq!(limiter.records.lock().unwrap().len(), 0);
    }

    #[test]
    fn test_concurrent_checks_never_overshoot() {
        let limiter = Arc::new(limiter(10, Duration::from_secs(10)));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            handles.push(std::thread::spawn(move || {
                let mut allowed = 0u32;
                for _ in 0..5 {
                    if limiter.check("shared").allowed {
                        allowed += 1;
                    }
                }
                allowed
            }));
        }
        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 10);
    }
}
