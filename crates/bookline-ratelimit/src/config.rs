//! Rate limit configuration
//!
//! Each guarded mutation class gets its own named limiter instance with an
//! independent key prefix and thresholds, so exhausting one class never
//! affects another.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one sliding-window limiter instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Key prefix namespacing this instance's records (`prefix:key`)
    pub prefix: String,

    /// Maximum number of requests allowed per window
    pub max_requests: u32,

    /// Length of the sliding window in milliseconds
    pub window_ms: u64,
}

impl RateLimitConfig {
    /// Create a configuration with an explicit prefix and thresholds.
    pub fn new(prefix: impl Into<String>, max_requests: u32, window: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            max_requests,
            window_ms: window.as_millis() as u64,
        }
    }

    /// Limits for sending member invitations.
    pub fn invitations() -> Self {
        Self::new("invite", 10, Duration::from_secs(60 * 60))
    }

    /// Limits for membership status changes (suspend/reactivate).
    pub fn status_changes() -> Self {
        Self::new("status", 20, Duration::from_secs(5 * 60))
    }

    /// Limits for re-sending activation links.
    pub fn resend_links() -> Self {
        Self::new("resend", 5, Duration::from_secs(15 * 60))
    }

    /// Limits for admin-created memberships and organization onboarding.
    pub fn admin_creation() -> Self {
        Self::new("admin-create", 5, Duration::from_secs(60 * 60))
    }

    /// The window as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}
