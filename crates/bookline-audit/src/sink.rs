//! Audit sink implementations
//!
//! The sink is a best-effort collaborator: callers log and swallow failures
//! via [`record_best_effort`] so the audit path never sits inside a
//! mutation's critical section.

use crate::types::AuditEvent;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Audit sink error types.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink could not persist the event
    #[error("Failed to record audit event: {0}")]
    RecordError(String),

    /// The sink is no longer accepting events
    #[error("Audit sink closed")]
    Closed,
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record a single event.
    async fn record(&self, event: AuditEvent) -> AuditResult<()>;
}

/// Record an event, logging instead of propagating on failure.
///
/// Mutations call this after their write commits; a sink outage must never
/// fail or roll back an otherwise successful mutation.
pub async fn record_best_effort(sink: &dyn AuditSink, event: AuditEvent) {
    let action = event.action.clone();
    if let Err(err) = sink.record(event).await {
        tracing::warn!(%action, error = %err, "audit record failed; continuing");
    }
}

/// In-memory audit sink.
///
/// Suitable for tests and single-process deployments; production services
/// put a durable store behind the same trait.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in order.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }

    /// Number of events recorded so far.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether no events have been recorded.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) -> AuditResult<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

/// Sink that discards every event.
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _event: AuditEvent) -> AuditResult<()> {
        Ok(())
    }
}
