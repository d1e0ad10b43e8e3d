//! Collaborator store contracts
//!
//! These traits are the narrow seams between the access-control core and
//! the backing stores. Implementations must execute the guarded write
//! methods with transactional isolation: the invariant counts named by an
//! [`InvariantGuard`] and the write itself are one atomic unit, never two
//! independent round-trips, or concurrent mutations could strip a provider
//! of its last owner or a team of its last supervisor.

use async_trait::async_trait;
use bookline_org::{Membership, MembershipStatus, NewOrganization, Organization, Role, Team};
use thiserror::Error;
use uuid::Uuid;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record absent
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Uniqueness constraint violated
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// An [`InvariantGuard`] condition failed inside the transaction
    #[error("Guard violated: {0}")]
    GuardViolation(String),

    /// Concurrent-write collision; retryable
    #[error("Concurrent write conflict: {0}")]
    Conflict(String),

    /// Backend failure
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Partial update to a membership record.
///
/// `team_id` is doubly optional: `None` leaves the team untouched,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct MembershipPatch {
    /// New status, if changing
    pub status: Option<MembershipStatus>,

    /// New role, if changing
    pub role: Option<Role>,

    /// New team assignment, if changing (`Some(None)` detaches)
    pub team_id: Option<Option<Uuid>>,
}

/// Structural conditions a guarded write must verify atomically with the
/// write itself.
///
/// Counts always exclude the record being written, so "at least one other
/// active owner" is `min_other_active_owners: Some(1)`. Implementations
/// reject with [`StoreError::GuardViolation`] when a count falls short.
#[derive(Debug, Clone, Default)]
pub struct InvariantGuard {
    /// Minimum active owner memberships in the provider, excluding the
    /// record being written
    pub min_other_active_owners: Option<u32>,

    /// `(team_id, n)`: minimum active supervisor memberships that must
    /// remain on the team, excluding the record being written
    pub min_other_active_supervisors: Option<(Uuid, u32)>,
}

impl InvariantGuard {
    /// A guard with no conditions; the write proceeds unconditionally.
    pub fn none() -> Self {
        Self::default()
    }

    /// Require at least one other active owner in the provider.
    pub fn keep_an_owner(mut self) -> Self {
        self.min_other_active_owners = Some(1);
        self
    }

    /// Require at least one other active supervisor on the given team.
    pub fn keep_a_supervisor(mut self, team_id: Uuid) -> Self {
        self.min_other_active_supervisors = Some((team_id, 1));
        self
    }
}

/// How a membership is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalMode {
    /// Keep the record, revoke access (status becomes `Suspended`)
    Soft,

    /// Delete the record
    Hard,
}

/// Point of truth for memberships, teams, organizations, and booking
/// assignments.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Look up the membership binding an actor to a provider.
    async fn find_membership(
        &self,
        provider_id: Uuid,
        actor_id: Uuid,
    ) -> StoreResult<Option<Membership>>;

    /// Look up a membership by ID.
    async fn get_membership(&self, id: Uuid) -> StoreResult<Option<Membership>>;

    /// All of an actor's active memberships, ordered by creation time.
    async fn active_memberships_for_actor(&self, actor_id: Uuid) -> StoreResult<Vec<Membership>>;

    /// Count active memberships with the given role, optionally scoped to
    /// one team.
    async fn count_active(
        &self,
        provider_id: Uuid,
        role: Role,
        team_id: Option<Uuid>,
    ) -> StoreResult<u64>;

    /// Look up a team by ID.
    async fn get_team(&self, team_id: Uuid) -> StoreResult<Option<Team>>;

    /// Insert a membership, enforcing the one-per-(provider, actor)
    /// uniqueness constraint.
    async fn insert_membership(&self, membership: Membership) -> StoreResult<Membership>;

    /// Apply a patch to a membership, verifying the guard atomically with
    /// the write.
    async fn update_membership_guarded(
        &self,
        id: Uuid,
        patch: MembershipPatch,
        guard: InvariantGuard,
    ) -> StoreResult<Membership>;

    /// Remove a membership (soft or hard), verifying the guard atomically
    /// with the removal. Returns the record as of the removal.
    async fn remove_membership_guarded(
        &self,
        id: Uuid,
        mode: RemovalMode,
        guard: InvariantGuard,
    ) -> StoreResult<Membership>;

    /// Apply the idempotent first-login activation to a membership.
    ///
    /// Returns the membership and whether this call activated it.
    async fn activate_first_login(&self, id: Uuid) -> StoreResult<(Membership, bool)>;

    /// The first active admin-or-higher member of the provider other than
    /// `excluding_actor`, by membership creation time. Used to pick a
    /// deterministic fallback assignee for booking reassignment.
    async fn find_reassignment_fallback(
        &self,
        provider_id: Uuid,
        excluding_actor: Uuid,
    ) -> StoreResult<Option<Membership>>;

    /// Number of open bookings assigned to an actor within a provider.
    async fn count_open_bookings(&self, provider_id: Uuid, assignee_id: Uuid)
        -> StoreResult<u64>;

    /// Move every open booking assigned to `from` onto `to`. Returns the
    /// number reassigned.
    async fn reassign_open_bookings(
        &self,
        provider_id: Uuid,
        from: Uuid,
        to: Uuid,
    ) -> StoreResult<u64>;

    /// The organization an actor already owns, if any. Advisory pre-check
    /// for onboarding; the uniqueness constraint inside
    /// [`Self::create_organization_with_owner`] is authoritative.
    async fn actor_owned_organization(&self, actor_id: Uuid) -> StoreResult<Option<Uuid>>;

    /// Atomically create an organization together with its first owner
    /// membership. Fails with [`StoreError::Duplicate`] if the actor
    /// already owns an organization or the slug is taken.
    async fn create_organization_with_owner(
        &self,
        actor_id: Uuid,
        org: NewOrganization,
    ) -> StoreResult<Organization>;
}

/// Object storage for uploaded assets.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Write an object at a deterministic path, overwriting any previous
    /// content. Returns the public URL.
    ///
    /// Overwrite-on-retry makes uploads idempotent: onboarding retries
    /// rewrite the same paths instead of compensating with deletes.
    async fn put_idempotent(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<String>;
}
