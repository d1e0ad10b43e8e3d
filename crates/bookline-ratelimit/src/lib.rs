//! # Bookline Rate Limiting
//!
//! In-process sliding-window rate limiting for the Bookline platform,
//! guarding high-risk membership mutations (invitations, status changes,
//! resend links, admin creation).
//!
//! ## Overview
//!
//! Each guarded mutation class runs its own [`SlidingWindowLimiter`]
//! instance with an independent key prefix and thresholds. A check prunes
//! timestamps older than the window, then either appends the current
//! attempt or reports how long the caller must wait.
//!
//! ```rust
//! use bookline_ratelimit::{RateLimitConfig, RateLimiter, SlidingWindowLimiter};
//! use std::time::Duration;
//!
//! let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(
//!     "invite",
//!     3,
//!     Duration::from_secs(60),
//! ));
//!
//! let decision = limiter.check("actor-123");
//! assert!(decision.allowed);
//! assert_eq!(decision.remaining, 2);
//! ```
//!
//! ## Deployment Note
//!
//! This limiter is process-local. Running multiple instances of a service
//! gives each process its own windows; deployments needing a global limit
//! should implement [`RateLimiter`] over a shared counter store and swap it
//! in at construction time.

pub mod config;
pub mod sliding_window;

// Re-export main types for convenience
pub use config::RateLimitConfig;
pub use sliding_window::{RateLimitDecision, RateLimitStats, RateLimiter, SlidingWindowLimiter};
