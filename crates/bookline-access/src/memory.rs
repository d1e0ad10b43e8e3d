//! In-memory reference store
//!
//! Backs tests and single-process deployments. All state lives behind one
//! `RwLock`, so every guarded write naturally evaluates its invariant
//! counts and applies the patch in the same critical section, which is the
//! isolation level the [`MembershipStore`] contract demands of any backend.

use async_trait::async_trait;
use bookline_org::{Membership, MembershipStatus, NewOrganization, Organization, Role, Team};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{
    AssetStore, InvariantGuard, MembershipPatch, MembershipStore, RemovalMode, StoreError,
    StoreResult,
};

#[derive(Debug, Clone)]
struct BookingRecord {
    id: Uuid,
    provider_id: Uuid,
    assignee_id: Uuid,
    open: bool,
}

#[derive(Default)]
struct Inner {
    organizations: HashMap<Uuid, Organization>,
    memberships: HashMap<Uuid, Membership>,
    teams: HashMap<Uuid, Team>,
    bookings: Vec<BookingRecord>,
}

impl Inner {
    fn count_active(&self, provider_id: Uuid, role: Role, team_id: Option<Uuid>) -> u64 {
        self.memberships
            .values()
            .filter(|m| {
                m.provider_id == provider_id
                    && m.role == role
                    && m.is_active()
                    && team_id.map(|t| m.team_id == Some(t)).unwrap_or(true)
            })
            .count() as u64
    }

    fn check_guard(&self, excluding: Uuid, guard: &InvariantGuard) -> StoreResult<()> {
        if let Some(min) = guard.min_other_active_owners {
            let membership = self
                .memberships
                .get(&excluding)
                .ok_or_else(|| StoreError::NotFound(format!("membership {excluding}")))?;
            let others = self
                .memberships
                .values()
                .filter(|m| {
                    m.id != excluding
                        && m.provider_id == membership.provider_id
                        && m.role == Role::Owner
                        && m.is_active()
                })
                .count() as u32;
            if others < min {
                return Err(StoreError::GuardViolation(
                    "cannot remove the provider's last active owner".into(),
                ));
            }
        }
        if let Some((team_id, min)) = guard.min_other_active_supervisors {
            let others = self
                .memberships
                .values()
                .filter(|m| {
                    m.id != excluding
                        && m.team_id == Some(team_id)
                        && m.role == Role::Supervisor
                        && m.is_active()
                })
                .count() as u32;
            if others < min {
                return Err(StoreError::GuardViolation(
                    "cannot remove the team's last active supervisor".into(),
                ));
            }
        }
        Ok(())
    }
}

/// In-memory [`MembershipStore`] implementation.
#[derive(Default)]
pub struct MemoryMembershipStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryMembershipStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a team. Test and bootstrap helper.
    pub async fn seed_team(&self, team: Team) -> Team {
        let mut inner = self.inner.write().await;
        inner.teams.insert(team.id, team.clone());
        team
    }

    /// Insert an open booking assigned to an actor. Test helper.
    pub async fn seed_booking(&self, provider_id: Uuid, assignee_id: Uuid) -> Uuid {
        let mut inner = self.inner.write().await;
        let id = Uuid::now_v7();
        inner.bookings.push(BookingRecord {
            id,
            provider_id,
            assignee_id,
            open: true,
        });
        id
    }

    /// Current assignee of a booking. Test helper.
    pub async fn booking_assignee(&self, booking_id: Uuid) -> Option<Uuid> {
        let inner = self.inner.read().await;
        inner
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .map(|b| b.assignee_id)
    }

    /// Look up an organization. Test helper.
    pub async fn get_organization(&self, id: Uuid) -> Option<Organization> {
        self.inner.read().await.organizations.get(&id).cloned()
    }

    /// Number of organizations in the store. Test helper.
    pub async fn organization_count(&self) -> usize {
        self.inner.read().await.organizations.len()
    }
}

#[async_trait]
impl MembershipStore for MemoryMembershipStore {
    async fn find_membership(
        &self,
        provider_id: Uuid,
        actor_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        let inner = self.inner.read().await;
        Ok(inner
            .memberships
            .values()
            .find(|m| m.provider_id == provider_id && m.actor_id == actor_id)
            .cloned())
    }

    async fn get_membership(&self, id: Uuid) -> StoreResult<Option<Membership>> {
        Ok(self.inner.read().await.memberships.get(&id).cloned())
    }

    async fn active_memberships_for_actor(&self, actor_id: Uuid) -> StoreResult<Vec<Membership>> {
        let inner = self.inner.read().await;
        let mut memberships: Vec<Membership> = inner
            .memberships
            .values()
            .filter(|m| m.actor_id == actor_id && m.is_active())
            .cloned()
            .collect();
        memberships.sort_by_key(|m| (m.created_at, m.id));
        Ok(memberships)
    }

    async fn count_active(
        &self,
        provider_id: Uuid,
        role: Role,
        team_id: Option<Uuid>,
    ) -> StoreResult<u64> {
        Ok(self.inner.read().await.count_active(provider_id, role, team_id))
    }

    async fn get_team(&self, team_id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.inner.read().await.teams.get(&team_id).cloned())
    }

    async fn insert_membership(&self, membership: Membership) -> StoreResult<Membership> {
        let mut inner = self.inner.write().await;
        let duplicate = inner.memberships.values().any(|m| {
            m.provider_id == membership.provider_id && m.actor_id == membership.actor_id
        });
        if duplicate {
            return Err(StoreError::Duplicate(format!(
                "membership for actor {} in provider {}",
                membership.actor_id, membership.provider_id
            )));
        }
        inner.memberships.insert(membership.id, membership.clone());
        Ok(membership)
    }

    async fn update_membership_guarded(
        &self,
        id: Uuid,
        patch: MembershipPatch,
        guard: InvariantGuard,
    ) -> StoreResult<Membership> {
        let mut inner = self.inner.write().await;
        inner.check_guard(id, &guard)?;
        let membership = inner
            .memberships
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("membership {id}")))?;
        if let Some(status) = patch.status {
            membership.status = status;
        }
        if let Some(role) = patch.role {
            membership.role = role;
        }
        if let Some(team_id) = patch.team_id {
            membership.team_id = team_id;
        }
        membership.updated_at = Utc::now();
        Ok(membership.clone())
    }

    async fn remove_membership_guarded(
        &self,
        id: Uuid,
        mode: RemovalMode,
        guard: InvariantGuard,
    ) -> StoreResult<Membership> {
        let mut inner = self.inner.write().await;
        inner.check_guard(id, &guard)?;
        match mode {
            RemovalMode::Soft => {
                let membership = inner
                    .memberships
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::NotFound(format!("membership {id}")))?;
                membership.status = MembershipStatus::Suspended;
                membership.updated_at = Utc::now();
                Ok(membership.clone())
            }
            RemovalMode::Hard => inner
                .memberships
                .remove(&id)
                .ok_or_else(|| StoreError::NotFound(format!("membership {id}"))),
        }
    }

    async fn activate_first_login(&self, id: Uuid) -> StoreResult<(Membership, bool)> {
        let mut inner = self.inner.write().await;
        let membership = inner
            .memberships
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("membership {id}")))?;
        let activated = membership.activate_on_first_login();
        Ok((membership.clone(), activated))
    }

    async fn find_reassignment_fallback(
        &self,
        provider_id: Uuid,
        excluding_actor: Uuid,
    ) -> StoreResult<Option<Membership>> {
        let inner = self.inner.read().await;
        let mut candidates: Vec<&Membership> = inner
            .memberships
            .values()
            .filter(|m| {
                m.provider_id == provider_id
                    && m.actor_id != excluding_actor
                    && m.is_active()
                    && m.role.is_admin()
            })
            .collect();
        candidates.sort_by_key(|m| (m.created_at, m.id));
        Ok(candidates.first().map(|m| (*m).clone()))
    }

    async fn count_open_bookings(
        &self,
        provider_id: Uuid,
        assignee_id: Uuid,
    ) -> StoreResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .bookings
            .iter()
            .filter(|b| b.provider_id == provider_id && b.assignee_id == assignee_id && b.open)
            .count() as u64)
    }

    async fn reassign_open_bookings(
        &self,
        provider_id: Uuid,
        from: Uuid,
        to: Uuid,
    ) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let mut moved = 0u64;
        for booking in inner
            .bookings
            .iter_mut()
            .filter(|b| b.provider_id == provider_id && b.assignee_id == from && b.open)
        {
            booking.assignee_id = to;
            moved += 1;
        }
        Ok(moved)
    }

    async fn actor_owned_organization(&self, actor_id: Uuid) -> StoreResult<Option<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner
            .organizations
            .values()
            .find(|org| org.owner_id == actor_id)
            .map(|org| org.id))
    }

    async fn create_organization_with_owner(
        &self,
        actor_id: Uuid,
        org: NewOrganization,
    ) -> StoreResult<Organization> {
        let mut inner = self.inner.write().await;
        if inner.organizations.values().any(|o| o.owner_id == actor_id) {
            return Err(StoreError::Duplicate(format!(
                "actor {actor_id} already owns an organization"
            )));
        }
        if inner.organizations.values().any(|o| o.slug == org.slug) {
            return Err(StoreError::Duplicate(format!("slug {}", org.slug)));
        }

        let mut organization = Organization::new(org.name, org.slug, actor_id);
        organization.description = org.description;
        organization.logo_url = org.logo_url;
        organization.sample_menu_url = org.sample_menu_url;

        let membership = Membership::new(organization.id, actor_id, Role::Owner);
        inner
            .organizations
            .insert(organization.id, organization.clone());
        inner.memberships.insert(membership.id, membership);
        Ok(organization)
    }
}

/// In-memory [`AssetStore`] implementation.
#[derive(Default)]
pub struct MemoryAssetStore {
    objects: Arc<RwLock<HashMap<String, (Vec<u8>, String)>>>,
}

impl MemoryAssetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects. Test helper.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Fetch a stored object's bytes. Test helper.
    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(path).map(|(b, _)| b.clone())
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn put_idempotent(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<String> {
        let mut objects = self.objects.write().await;
        objects.insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(format!("https://assets.bookline.io/{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_membership_uniqueness() {
        let store = MemoryMembershipStore::new();
        let provider = Uuid::now_v7();
        let actor = Uuid::now_v7();

        store
            .insert_membership(Membership::new(provider, actor, Role::Staff))
            .await
            .unwrap();
        let err = store
            .insert_membership(Membership::new(provider, actor, Role::Viewer))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_guard_rejects_last_owner_removal() {
        let store = MemoryMembershipStore::new();
        let provider = Uuid::now_v7();
        let owner = store
            .insert_membership(Membership::new(provider, Uuid::now_v7(), Role::Owner))
            .await
            .unwrap();

        let err = store
            .remove_membership_guarded(owner.id, RemovalMode::Hard, InvariantGuard::none().keep_an_owner())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::GuardViolation(_)));

        // A second active owner satisfies the guard.
        store
            .insert_membership(Membership::new(provider, Uuid::now_v7(), Role::Owner))
            .await
            .unwrap();
        store
            .remove_membership_guarded(owner.id, RemovalMode::Hard, InvariantGuard::none().keep_an_owner())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_soft_removal_suspends() {
        let store = MemoryMembershipStore::new();
        let provider = Uuid::now_v7();
        let member = store
            .insert_membership(Membership::new(provider, Uuid::now_v7(), Role::Staff))
            .await
            .unwrap();

        let removed = store
            .remove_membership_guarded(member.id, RemovalMode::Soft, InvariantGuard::none())
            .await
            .unwrap();
        assert_eq!(removed.status, MembershipStatus::Suspended);
        assert!(store.get_membership(member.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic_by_creation_time() {
        let store = MemoryMembershipStore::new();
        let provider = Uuid::now_v7();
        let target = Uuid::now_v7();

        let first_admin = store
            .insert_membership(Membership::new(provider, Uuid::now_v7(), Role::Admin))
            .await
            .unwrap();
        store
            .insert_membership(Membership::new(provider, Uuid::now_v7(), Role::Owner))
            .await
            .unwrap();
        // Staff and suspended admins never qualify.
        store
            .insert_membership(Membership::new(provider, Uuid::now_v7(), Role::Staff))
            .await
            .unwrap();

        let fallback = store
            .find_reassignment_fallback(provider, target)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fallback.id, first_admin.id);
    }

    #[tokio::test]
    async fn test_create_organization_with_owner_is_atomic_and_unique() {
        let store = MemoryMembershipStore::new();
        let actor = Uuid::now_v7();
        let input = NewOrganization {
            name: "Harbor Barbers".into(),
            slug: "harbor-barbers".into(),
            description: None,
            logo_url: None,
            sample_menu_url: None,
        };

        let org = store
            .create_organization_with_owner(actor, input.clone())
            .await
            .unwrap();
        let owner = store.find_membership(org.id, actor).await.unwrap().unwrap();
        assert_eq!(owner.role, Role::Owner);
        assert!(owner.is_active());

        let err = store
            .create_organization_with_owner(actor, input)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.organization_count().await, 1);
    }

    #[tokio::test]
    async fn test_reassign_open_bookings() {
        let store = MemoryMembershipStore::new();
        let provider = Uuid::now_v7();
        let from = Uuid::now_v7();
        let to = Uuid::now_v7();

        let booking = store.seed_booking(provider, from).await;
        store.seed_booking(Uuid::now_v7(), from).await; // other provider

        let moved = store.reassign_open_bookings(provider, from, to).await.unwrap();
        assert_eq!(moved, 1);
        assert_eq!(store.booking_assignee(booking).await, Some(to));
    }

    #[tokio::test]
    async fn test_asset_store_overwrites_idempotently() {
        let assets = MemoryAssetStore::new();
        let url1 = assets
            .put_idempotent("providers/a/logo.png", vec![1], "image/png")
            .await
            .unwrap();
        let url2 = assets
            .put_idempotent("providers/a/logo.png", vec![2], "image/png")
            .await
            .unwrap();
        assert_eq!(url1, url2);
        assert_eq!(assets.object_count().await, 1);
        assert_eq!(assets.get("providers/a/logo.png").await, Some(vec![2]));
    }
}
