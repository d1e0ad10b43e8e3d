//! End-to-end membership lifecycle tests
//!
//! Exercises the engine, store, limiter, and audit trail together the way a
//! request handler would: onboard an organization, grow its membership, and
//! drive mutations through the guards.

use bookline_access::{
    AccessError, AssetUpload, CreateOrganizationInput, MembershipMutationEngine,
    MembershipStore, MemoryAssetStore, MemoryMembershipStore, OnboardingOrchestrator,
    RemovalMode, RequestContext,
};
use bookline_audit::MemoryAuditSink;
use bookline_org::{Membership, MembershipStatus, Role, Team};
use bookline_ratelimit::{RateLimitConfig, RateLimiter, SlidingWindowLimiter};
use rand::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct Harness {
    store: Arc<MemoryMembershipStore>,
    audit: Arc<MemoryAuditSink>,
    engine: MembershipMutationEngine,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryMembershipStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let engine = MembershipMutationEngine::new(store.clone(), audit.clone());
        Self {
            store,
            audit,
            engine,
        }
    }

    async fn member(&self, provider: Uuid, role: Role) -> Uuid {
        let actor = Uuid::now_v7();
        self.store
            .insert_membership(Membership::new(provider, actor, role))
            .await
            .unwrap();
        actor
    }
}

#[tokio::test]
async fn only_owner_cannot_remove_themself() {
    let h = Harness::new();
    let provider = Uuid::now_v7();
    let owner = h.member(provider, Role::Owner).await;

    let ctx = RequestContext::new();
    let err = h
        .engine
        .remove_member(&ctx, provider, Some(owner), owner, RemovalMode::Hard)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidTransition(_)));
    assert!(h
        .store
        .find_membership(provider, owner)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn admin_demoting_owner_is_forbidden() {
    let h = Harness::new();
    let provider = Uuid::now_v7();
    let owner = h.member(provider, Role::Owner).await;
    let admin = h.member(provider, Role::Admin).await;

    let ctx = RequestContext::new();
    let err = h
        .engine
        .change_role(&ctx, provider, Some(admin), owner, Role::Staff)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::Forbidden(_)));

    let unchanged = h
        .store
        .find_membership(provider, owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.role, Role::Owner);
}

#[tokio::test]
async fn sole_supervisor_cannot_leave_their_team() {
    let h = Harness::new();
    let provider = Uuid::now_v7();
    let admin = h.member(provider, Role::Admin).await;
    h.member(provider, Role::Owner).await;
    let team = h
        .store
        .seed_team(Team::new(provider, Uuid::now_v7(), "Front Desk"))
        .await;
    let supervisor = Uuid::now_v7();
    h.store
        .insert_membership(
            Membership::new(provider, supervisor, Role::Supervisor).with_team(team.id),
        )
        .await
        .unwrap();

    let ctx = RequestContext::new();
    let err = h
        .engine
        .assign_team(&ctx, provider, Some(admin), supervisor, None)
        .await
        .unwrap_err();
    match err {
        AccessError::InvalidTransition(msg) => {
            assert!(msg.contains("last active supervisor"), "{msg}")
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }

    // A second supervisor unblocks the move.
    let second = Uuid::now_v7();
    h.store
        .insert_membership(
            Membership::new(provider, second, Role::Supervisor).with_team(team.id),
        )
        .await
        .unwrap();
    h.engine
        .assign_team(&ctx, provider, Some(admin), supervisor, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn limiter_allows_three_then_denies() {
    let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(
        "status",
        3,
        Duration::from_millis(1000),
    ));

    for i in 0..3 {
        assert!(limiter.check("k").allowed, "call {i} should pass");
    }
    let denied = limiter.check("k");
    assert!(!denied.allowed);
    assert!(denied.retry_after.unwrap() > Duration::ZERO);
}

#[tokio::test]
async fn onboarding_is_retry_safe_and_unique() {
    let store = Arc::new(MemoryMembershipStore::new());
    let assets = Arc::new(MemoryAssetStore::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let orchestrator = OnboardingOrchestrator::new(store.clone(), assets.clone(), audit);
    let actor = Uuid::now_v7();
    let input = CreateOrganizationInput {
        name: "Harbor Barbers".into(),
        slug: "harbor-barbers".into(),
        description: Some("Walk-ins welcome".into()),
        logo: Some(AssetUpload {
            bytes: vec![1, 2, 3],
            content_type: "image/png".into(),
        }),
        sample_menu: Some(AssetUpload {
            bytes: vec![4, 5],
            content_type: "application/pdf".into(),
        }),
    };

    let created = orchestrator
        .create_organization(Some(actor), input.clone())
        .await
        .unwrap();
    let owner = store
        .find_membership(created.organization_id, actor)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(owner.role, Role::Owner);
    assert!(owner.is_active());
    assert_eq!(assets.object_count().await, 2);

    // Retrying with identical input conflicts and leaves one organization.
    let err = orchestrator
        .create_organization(Some(actor), input)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::Conflict(_)));
    assert_eq!(store.organization_count().await, 1);
}

#[tokio::test]
async fn removal_reassigns_bookings_and_audits() {
    let h = Harness::new();
    let provider = Uuid::now_v7();
    h.member(provider, Role::Owner).await;
    let admin = h.member(provider, Role::Admin).await;
    let staff = h.member(provider, Role::Staff).await;
    let b1 = h.store.seed_booking(provider, staff).await;
    let b2 = h.store.seed_booking(provider, staff).await;

    let ctx = RequestContext::new();
    h.engine
        .remove_member(&ctx, provider, Some(admin), staff, RemovalMode::Soft)
        .await
        .unwrap();

    assert_eq!(h.store.booking_assignee(b1).await, Some(admin));
    assert_eq!(h.store.booking_assignee(b2).await, Some(admin));
    let suspended = h
        .store
        .find_membership(provider, staff)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(suspended.status, MembershipStatus::Suspended);

    let events = h.audit.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "membership.removed");
    assert_eq!(events[0].metadata["reassigned_bookings"], 2);
}

/// Drive a few hundred random mutations through the engine and assert the
/// structural invariants hold after every step: the provider never loses
/// its last active owner, and a team that ever had a supervisor never
/// drops to zero active supervisors.
#[tokio::test]
async fn random_mutation_sequences_preserve_invariants() {
    let mut rng = StdRng::seed_from_u64(0x600D5EED);
    let h = Harness::new();
    let provider = Uuid::now_v7();
    let team = h
        .store
        .seed_team(Team::new(provider, Uuid::now_v7(), "Front Desk"))
        .await;

    let mut actors = vec![h.member(provider, Role::Owner).await];
    for role in [
        Role::Owner,
        Role::Admin,
        Role::Admin,
        Role::Supervisor,
        Role::Staff,
        Role::Staff,
        Role::Viewer,
    ] {
        actors.push(h.member(provider, role).await);
    }

    let statuses = [MembershipStatus::Active, MembershipStatus::Suspended];
    let roles = [
        Role::Viewer,
        Role::Staff,
        Role::Supervisor,
        Role::Admin,
        Role::Owner,
    ];
    let mut team_had_supervisor = false;

    for _ in 0..300 {
        let ctx = RequestContext::new();
        let actor = *actors.choose(&mut rng).unwrap();
        let target = *actors.choose(&mut rng).unwrap();

        // Outcomes are irrelevant here; rejected mutations are part of the
        // sequence.
        let _ = match rng.gen_range(0..4) {
            0 => {
                h.engine
                    .change_status(
                        &ctx,
                        provider,
                        Some(actor),
                        target,
                        *statuses.choose(&mut rng).unwrap(),
                    )
                    .await
            }
            1 => {
                h.engine
                    .change_role(
                        &ctx,
                        provider,
                        Some(actor),
                        target,
                        *roles.choose(&mut rng).unwrap(),
                    )
                    .await
            }
            2 => {
                let new_team = if rng.gen_bool(0.5) { Some(team.id) } else { None };
                h.engine
                    .assign_team(&ctx, provider, Some(actor), target, new_team)
                    .await
            }
            _ => {
                let mode = if rng.gen_bool(0.5) {
                    RemovalMode::Soft
                } else {
                    RemovalMode::Hard
                };
                h.engine
                    .remove_member(&ctx, provider, Some(actor), target, mode)
                    .await
            }
        };

        let owners = h
            .store
            .count_active(provider, Role::Owner, None)
            .await
            .unwrap();
        assert!(owners >= 1, "provider lost its last active owner");

        let supervisors = h
            .store
            .count_active(provider, Role::Supervisor, Some(team.id))
            .await
            .unwrap();
        if team_had_supervisor {
            assert!(
                supervisors >= 1,
                "team lost its last active supervisor"
            );
        } else if supervisors > 0 {
            team_had_supervisor = true;
        }
    }
}
