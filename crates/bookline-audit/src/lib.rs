//! # Bookline Audit Trail
//!
//! Audit events and sinks for the Bookline platform. Every successful
//! membership or organization mutation appends one [`AuditEvent`] describing
//! the actor, the target, and the before/after values.
//!
//! ## Delivery Semantics
//!
//! Recording is fire-and-forget from the mutation's point of view: sinks
//! are invoked after the authoritative write commits, and failures are
//! logged and swallowed via [`record_best_effort`] rather than escalated.
//!
//! ## Implementations
//!
//! - [`MemoryAuditSink`]: in-memory, for tests and single-process use
//! - [`NoopAuditSink`]: discards everything
//!
//! Durable backends (database table, log pipeline) implement [`AuditSink`]
//! in their own crates.

pub mod sink;
pub mod types;

// Re-export main types for convenience
pub use sink::{record_best_effort, AuditError, AuditResult, AuditSink, MemoryAuditSink, NoopAuditSink};
pub use types::AuditEvent;
