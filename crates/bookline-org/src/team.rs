//! Team domain model
//!
//! A team groups members within one provider organization at one service
//! location. Members are attached via `Membership::team_id`; only active
//! teams may receive new assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a team.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    /// Operating normally; may receive new member assignments
    Active,

    /// Temporarily closed; keeps members but accepts no new assignments
    Inactive,

    /// Retired permanently
    Archived,
}

/// A team within a provider organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Unique team ID
    pub id: Uuid,

    /// Provider organization the team belongs to
    pub provider_id: Uuid,

    /// Service location the team operates at
    pub location_id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Lifecycle status
    pub status: TeamStatus,

    /// When the team was created
    pub created_at: DateTime<Utc>,

    /// When the team was last updated
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Creates a new active team.
    pub fn new(provider_id: Uuid, location_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            provider_id,
            location_id,
            name: name.into(),
            status: TeamStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the team may receive new member assignments.
    pub fn accepts_assignments(&self) -> bool {
        self.status == TeamStatus::Active
    }
}
