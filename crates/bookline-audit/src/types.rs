//! Audit event types
//!
//! Every successful membership mutation appends one audit event describing
//! who acted, who was affected, and what changed. Events are append-only and
//! best-effort: a failed append never blocks or rolls back the mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Audit event envelope.
///
/// Previous and new values are carried as JSON snapshots so the sink never
/// needs domain-type knowledge to store or display them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: Uuid,

    /// Action performed (e.g. "membership.status_changed",
    /// "membership.removed", "organization.created")
    pub action: String,

    /// Provider organization context
    pub provider_id: Option<Uuid>,

    /// The actor who performed the action
    pub actor_id: Option<Uuid>,

    /// The membership or organization the action targeted
    pub target_id: Option<Uuid>,

    /// The user affected by the action, when different from the actor
    pub target_actor_id: Option<Uuid>,

    /// Snapshot of the changed fields before the mutation
    pub previous: Option<serde_json::Value>,

    /// Snapshot of the changed fields after the mutation
    pub new: Option<serde_json::Value>,

    /// When the event was created
    pub timestamp: DateTime<Utc>,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AuditEvent {
    /// Create a new event for an action.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            action: action.into(),
            provider_id: None,
            actor_id: None,
            target_id: None,
            target_actor_id: None,
            previous: None,
            new: None,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Set the provider organization context.
    pub fn with_provider(mut self, provider_id: Uuid) -> Self {
        self.provider_id = Some(provider_id);
        self
    }

    /// Set the acting user.
    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Set the targeted record.
    pub fn with_target(mut self, target_id: Uuid) -> Self {
        self.target_id = Some(target_id);
        self
    }

    /// Set the affected user.
    pub fn with_target_actor(mut self, target_actor_id: Uuid) -> Self {
        self.target_actor_id = Some(target_actor_id);
        self
    }

    /// Attach before/after snapshots of the changed fields.
    pub fn with_diff(mut self, previous: serde_json::Value, new: serde_json::Value) -> Self {
        self.previous = Some(previous);
        self.new = Some(new);
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
