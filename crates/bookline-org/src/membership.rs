//! Membership domain model
//!
//! A membership binds one actor (user) to one provider organization with a
//! role, a status, and an optional team. It is the record every authorization
//! decision and every lifecycle mutation in the platform operates on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::Role;

/// Lifecycle status of a membership.
///
/// `Pending` memberships were created on the actor's behalf (admin creation
/// or invitation) and become `Active` on the actor's first successful login.
/// `Suspended` memberships keep their role and team but grant no access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Created but not yet activated by the actor
    Pending,

    /// Full access per the membership's role
    Active,

    /// Access revoked without removing the record
    Suspended,
}

impl MembershipStatus {
    /// Lowercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }
}

/// A membership linking an actor to a provider organization.
///
/// At most one non-deleted membership may exist per
/// `(provider_id, actor_id)` pair; the store enforces this.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use bookline_org::{Membership, Role};
///
/// let provider_id = Uuid::now_v7();
/// let actor_id = Uuid::now_v7();
/// let membership = Membership::new(provider_id, actor_id, Role::Staff);
/// assert!(membership.is_active());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Unique membership ID
    pub id: Uuid,

    /// Provider organization ID
    pub provider_id: Uuid,

    /// Actor (user) ID
    pub actor_id: Uuid,

    /// Role within the organization
    pub role: Role,

    /// Lifecycle status
    pub status: MembershipStatus,

    /// Team the member is attached to, if any
    pub team_id: Option<Uuid>,

    /// Whether this membership was created by an admin on the actor's
    /// behalf. Admin-created pending memberships activate on first login.
    #[serde(default)]
    pub admin_created: bool,

    /// Set exactly once, at the actor's first successful login
    pub first_login_at: Option<DateTime<Utc>>,

    /// Who invited or created this member (if applicable)
    pub invited_by: Option<Uuid>,

    /// When the membership was created
    pub created_at: DateTime<Utc>,

    /// When the membership was last updated
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// Creates a new active membership.
    ///
    /// The membership is created with:
    /// - A newly generated UUID v7 ID
    /// - `Active` status and no team
    /// - Current timestamps
    ///
    /// # Arguments
    ///
    /// * `provider_id` - The provider organization ID
    /// * `actor_id` - The actor (user) ID
    /// * `role` - The actor's role in the organization
    pub fn new(provider_id: Uuid, actor_id: Uuid, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            provider_id,
            actor_id,
            role,
            status: MembershipStatus::Active,
            team_id: None,
            admin_created: false,
            first_login_at: None,
            invited_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a pending membership on the actor's behalf.
    ///
    /// The membership activates on the actor's first successful login via
    /// [`Membership::activate_on_first_login`].
    pub fn new_admin_created(provider_id: Uuid, actor_id: Uuid, role: Role) -> Self {
        let mut membership = Self::new(provider_id, actor_id, role);
        membership.status = MembershipStatus::Pending;
        membership.admin_created = true;
        membership
    }

    /// Set who invited or created this member.
    pub fn with_inviter(mut self, inviter_id: Uuid) -> Self {
        self.invited_by = Some(inviter_id);
        self
    }

    /// Set the member's team.
    pub fn with_team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Whether the membership currently grants access.
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }

    /// Activate an admin-created pending membership at first login.
    ///
    /// Transitions `Pending` to `Active` exactly once, stamping
    /// `first_login_at` at that moment. Idempotent: any later call is a
    /// no-op.
    ///
    /// # Returns
    ///
    /// `true` if the membership was activated by this call.
    pub fn activate_on_first_login(&mut self) -> bool {
        if self.status != MembershipStatus::Pending || !self.admin_created {
            return false;
        }
        if self.first_login_at.is_some() {
            return false;
        }
        let now = Utc::now();
        self.status = MembershipStatus::Active;
        self.first_login_at = Some(now);
        self.updated_at = now;
        true
    }
}
