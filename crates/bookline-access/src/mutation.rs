//! Membership mutation engine
//!
//! A state machine over a membership's `(status, role, team)` triple, gated
//! by the acting user's own resolved role. Every transition re-reads the
//! authoritative record from the store, never trusting the request cache,
//! and every invariant-sensitive write goes through a guarded store call so
//! the count check and the write commit as one atomic unit.
//!
//! Guard failures surface as `InvalidTransition` or `Forbidden`; the only
//! silent successes are genuine no-change requests, which return without
//! touching the store or the audit trail. No-change requests still pass
//! the same authorization checks as real ones, so an unprivileged caller
//! cannot probe a membership's current state through them.

use bookline_audit::{record_best_effort, AuditEvent, AuditSink};
use bookline_org::{Membership, MembershipStatus, Role};
use bookline_ratelimit::RateLimiter;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::authorize::AuthorizationService;
use crate::context::{RequestContext, ResolvedActor};
use crate::error::{AccessError, AccessResult};
use crate::store::{InvariantGuard, MembershipPatch, MembershipStore, RemovalMode};

/// Result of a mutation request.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// The membership after the mutation
    pub membership: Membership,

    /// `false` for idempotent no-change requests
    pub changed: bool,
}

/// Enforces the membership lifecycle rules.
pub struct MembershipMutationEngine {
    store: Arc<dyn MembershipStore>,
    audit: Arc<dyn AuditSink>,
    authz: AuthorizationService,
    status_limiter: Option<Arc<dyn RateLimiter>>,
}

impl MembershipMutationEngine {
    /// Create an engine over a store and an audit sink.
    pub fn new(store: Arc<dyn MembershipStore>, audit: Arc<dyn AuditSink>) -> Self {
        let authz = AuthorizationService::new(store.clone());
        Self {
            store,
            audit,
            authz,
            status_limiter: None,
        }
    }

    /// Guard status changes with a rate limiter, keyed by acting user.
    pub fn with_status_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.status_limiter = Some(limiter);
        self
    }

    /// The authorization service sharing this engine's store.
    pub fn authorization(&self) -> &AuthorizationService {
        &self.authz
    }

    fn check_status_limiter(&self, actor_id: Uuid) -> AccessResult<()> {
        if let Some(limiter) = &self.status_limiter {
            let decision = limiter.check(&actor_id.to_string());
            if !decision.allowed {
                tracing::warn!(
                    %actor_id,
                    retry_after = ?decision.retry_after,
                    "status change rejected by rate limiter"
                );
                return Err(AccessError::RateLimited {
                    retry_after: decision.retry_after.unwrap_or(Duration::from_secs(1)),
                    reset_at: decision.reset_at,
                });
            }
        }
        Ok(())
    }

    async fn target_membership(
        &self,
        provider_id: Uuid,
        target_actor_id: Uuid,
    ) -> AccessResult<Membership> {
        self.store
            .find_membership(provider_id, target_actor_id)
            .await?
            .ok_or_else(|| {
                AccessError::NotFound(format!(
                    "membership for actor {target_actor_id} in provider {provider_id}"
                ))
            })
    }

    /// Suspend or reactivate a membership.
    ///
    /// Admins and owners act across the organization; a supervisor may only
    /// change the status of staff on their own team. Suspending the last
    /// active owner of a provider, or the last active supervisor of a team,
    /// is rejected.
    pub async fn change_status(
        &self,
        ctx: &RequestContext,
        provider_id: Uuid,
        actor_id: Option<Uuid>,
        target_actor_id: Uuid,
        new_status: MembershipStatus,
    ) -> AccessResult<MutationOutcome> {
        if new_status == MembershipStatus::Pending {
            return Err(AccessError::InvalidTransition(
                "memberships cannot be returned to pending".into(),
            ));
        }

        let actor = self.authz.resolve(ctx, actor_id, Some(provider_id)).await?;
        self.check_status_limiter(actor.membership.actor_id)?;

        let target = self.target_membership(provider_id, target_actor_id).await?;
        self.authorize_status_change(&actor, &target, new_status)?;

        // No-op detection comes after authorization: an unprivileged caller
        // must not learn the current status from a cheap Ok.
        if target.status == new_status {
            return Ok(MutationOutcome {
                membership: target,
                changed: false,
            });
        }
        if target.status == MembershipStatus::Pending {
            return Err(AccessError::InvalidTransition(
                "pending memberships activate on the actor's first login".into(),
            ));
        }

        let mut guard = InvariantGuard::none();
        if new_status == MembershipStatus::Suspended && target.is_active() {
            if target.role == Role::Owner {
                guard = guard.keep_an_owner();
            }
            if target.role == Role::Supervisor {
                if let Some(team_id) = target.team_id {
                    guard = guard.keep_a_supervisor(team_id);
                }
            }
        }

        let previous_status = target.status;
        let updated = self
            .store
            .update_membership_guarded(
                target.id,
                MembershipPatch {
                    status: Some(new_status),
                    ..Default::default()
                },
                guard,
            )
            .await?;
        ctx.invalidate(target_actor_id, provider_id).await;

        record_best_effort(
            self.audit.as_ref(),
            AuditEvent::new("membership.status_changed")
                .with_provider(provider_id)
                .with_actor(actor.membership.actor_id)
                .with_target(updated.id)
                .with_target_actor(target_actor_id)
                .with_diff(
                    json!({ "status": previous_status.as_str() }),
                    json!({ "status": new_status.as_str() }),
                ),
        )
        .await;

        Ok(MutationOutcome {
            membership: updated,
            changed: true,
        })
    }

    fn authorize_status_change(
        &self,
        actor: &ResolvedActor,
        target: &Membership,
        new_status: MembershipStatus,
    ) -> AccessResult<()> {
        let actor_role = actor.membership.role;
        let acting_on_self = actor.membership.actor_id == target.actor_id;

        match target.role {
            Role::Owner => {
                if actor_role != Role::Owner {
                    return Err(AccessError::Forbidden(
                        "only an owner may change another owner's status".into(),
                    ));
                }
                if acting_on_self && new_status == MembershipStatus::Suspended {
                    return Err(AccessError::InvalidTransition(
                        "an owner cannot suspend themself".into(),
                    ));
                }
            }
            Role::Admin => {
                // Peer admins cannot touch each other; the actor must be
                // strictly higher privileged.
                if !actor_role.outranks(Role::Admin) {
                    return Err(AccessError::Forbidden(
                        "changing an admin's status requires a higher-privileged actor".into(),
                    ));
                }
            }
            _ => {
                if actor_role.is_admin() {
                    return Ok(());
                }
                if actor_role == Role::Supervisor {
                    let own_team = actor.membership.team_id;
                    if target.role == Role::Staff
                        && own_team.is_some()
                        && target.team_id == own_team
                    {
                        return Ok(());
                    }
                    return Err(AccessError::Forbidden(
                        "supervisors may only change the status of staff on their own team"
                            .into(),
                    ));
                }
                return Err(AccessError::Forbidden(
                    "changing membership status requires admin role or team-scoped supervisor"
                        .into(),
                ));
            }
        }
        Ok(())
    }

    /// Change a member's role.
    ///
    /// Admin-or-higher only. The owner role can never be changed away, only
    /// an owner may assign it, and actors cannot change their own role.
    pub async fn change_role(
        &self,
        ctx: &RequestContext,
        provider_id: Uuid,
        actor_id: Option<Uuid>,
        target_actor_id: Uuid,
        new_role: Role,
    ) -> AccessResult<MutationOutcome> {
        let actor = self
            .authz
            .require_role(ctx, provider_id, actor_id, Role::Admin)
            .await?;

        let target = self.target_membership(provider_id, target_actor_id).await?;
        if target.role == new_role {
            return Ok(MutationOutcome {
                membership: target,
                changed: false,
            });
        }

        if actor.membership.actor_id == target.actor_id {
            return Err(AccessError::InvalidTransition(
                "actors cannot change their own role".into(),
            ));
        }
        if target.role == Role::Owner {
            if actor.membership.role != Role::Owner {
                return Err(AccessError::Forbidden(
                    "only an owner may modify another owner".into(),
                ));
            }
            return Err(AccessError::InvalidTransition(
                "the owner role cannot be changed".into(),
            ));
        }
        if new_role == Role::Owner && actor.membership.role != Role::Owner {
            return Err(AccessError::Forbidden(
                "only an owner may assign the owner role".into(),
            ));
        }

        let mut guard = InvariantGuard::none();
        if target.is_active() && target.role == Role::Supervisor {
            if let Some(team_id) = target.team_id {
                guard = guard.keep_a_supervisor(team_id);
            }
        }

        let previous_role = target.role;
        let updated = self
            .store
            .update_membership_guarded(
                target.id,
                MembershipPatch {
                    role: Some(new_role),
                    ..Default::default()
                },
                guard,
            )
            .await?;
        ctx.invalidate(target_actor_id, provider_id).await;

        record_best_effort(
            self.audit.as_ref(),
            AuditEvent::new("membership.role_changed")
                .with_provider(provider_id)
                .with_actor(actor.membership.actor_id)
                .with_target(updated.id)
                .with_target_actor(target_actor_id)
                .with_diff(
                    json!({ "role": previous_role.as_str() }),
                    json!({ "role": new_role.as_str() }),
                ),
        )
        .await;

        Ok(MutationOutcome {
            membership: updated,
            changed: true,
        })
    }

    /// Assign a member to a team, move them, or clear their team.
    ///
    /// The target team must belong to the same provider and be active. A
    /// supervisor (not admin or owner) may only move staff into or out of
    /// their own team. Detaching a team's last active supervisor is
    /// rejected.
    pub async fn assign_team(
        &self,
        ctx: &RequestContext,
        provider_id: Uuid,
        actor_id: Option<Uuid>,
        target_actor_id: Uuid,
        new_team: Option<Uuid>,
    ) -> AccessResult<MutationOutcome> {
        let actor = self.authz.resolve(ctx, actor_id, Some(provider_id)).await?;

        let target = self.target_membership(provider_id, target_actor_id).await?;

        let actor_role = actor.membership.role;
        if !actor_role.is_admin() {
            if actor_role != Role::Supervisor {
                return Err(AccessError::Forbidden(
                    "assigning teams requires admin role or a supervisor".into(),
                ));
            }
            let own_team = actor.membership.team_id.ok_or_else(|| {
                AccessError::Forbidden("supervisor has no team to manage".into())
            })?;
            let into_own = new_team == Some(own_team);
            let out_of_own = target.team_id == Some(own_team) && new_team.is_none();
            if target.role != Role::Staff || !(into_own || out_of_own) {
                return Err(AccessError::Forbidden(
                    "supervisors may only move staff into or out of their own team".into(),
                ));
            }
        }

        // No-op detection comes after the scope checks, same as status
        // changes: a cheap Ok must not confirm the current assignment.
        if target.team_id == new_team {
            return Ok(MutationOutcome {
                membership: target,
                changed: false,
            });
        }

        if let Some(team_id) = new_team {
            let team = self
                .store
                .get_team(team_id)
                .await?
                .filter(|t| t.provider_id == provider_id)
                .ok_or_else(|| AccessError::NotFound(format!("team {team_id}")))?;
            if !team.accepts_assignments() {
                return Err(AccessError::InvalidTransition(format!(
                    "team {} is not active and cannot receive assignments",
                    team_id
                )));
            }
        }

        let mut guard = InvariantGuard::none();
        if target.is_active() && target.role == Role::Supervisor {
            if let Some(old_team) = target.team_id {
                guard = guard.keep_a_supervisor(old_team);
            }
        }

        let previous_team = target.team_id;
        let updated = self
            .store
            .update_membership_guarded(
                target.id,
                MembershipPatch {
                    team_id: Some(new_team),
                    ..Default::default()
                },
                guard,
            )
            .await?;
        ctx.invalidate(target_actor_id, provider_id).await;

        record_best_effort(
            self.audit.as_ref(),
            AuditEvent::new("membership.team_assigned")
                .with_provider(provider_id)
                .with_actor(actor.membership.actor_id)
                .with_target(updated.id)
                .with_target_actor(target_actor_id)
                .with_diff(json!({ "team_id": previous_team }), json!({ "team_id": new_team })),
        )
        .await;

        Ok(MutationOutcome {
            membership: updated,
            changed: true,
        })
    }

    /// Remove a member, soft (suspend-and-keep) or hard (delete).
    ///
    /// Admin-or-higher only; only an owner may remove another owner; an
    /// owner cannot remove themself; removing the last active owner or a
    /// team's last active supervisor is rejected. Open bookings assigned to
    /// the target are reassigned before the removal commits: to the acting
    /// user, or, when the target is the acting user, to the earliest-joined
    /// active admin-or-higher member. With bookings to move and no eligible
    /// assignee, the removal fails instead of orphaning assignments.
    pub async fn remove_member(
        &self,
        ctx: &RequestContext,
        provider_id: Uuid,
        actor_id: Option<Uuid>,
        target_actor_id: Uuid,
        mode: RemovalMode,
    ) -> AccessResult<MutationOutcome> {
        let actor = self
            .authz
            .require_role(ctx, provider_id, actor_id, Role::Admin)
            .await?;

        let target = self.target_membership(provider_id, target_actor_id).await?;
        let acting_on_self = actor.membership.actor_id == target.actor_id;

        if target.role == Role::Owner {
            if actor.membership.role != Role::Owner {
                return Err(AccessError::Forbidden(
                    "only an owner may remove another owner".into(),
                ));
            }
            if acting_on_self {
                return Err(AccessError::InvalidTransition(
                    "an owner cannot remove themself".into(),
                ));
            }
        }

        // Advisory pre-checks so booking reassignment is not attempted for
        // a removal the guard would reject anyway. The guarded removal
        // below remains the authoritative check.
        if target.is_active() {
            if target.role == Role::Owner
                && self.store.count_active(provider_id, Role::Owner, None).await? <= 1
            {
                return Err(AccessError::InvalidTransition(
                    "cannot remove the provider's last active owner".into(),
                ));
            }
            if target.role == Role::Supervisor {
                if let Some(team_id) = target.team_id {
                    let supervisors = self
                        .store
                        .count_active(provider_id, Role::Supervisor, Some(team_id))
                        .await?;
                    if supervisors <= 1 {
                        return Err(AccessError::InvalidTransition(
                            "cannot remove the team's last active supervisor".into(),
                        ));
                    }
                }
            }
        }

        let open_bookings = self
            .store
            .count_open_bookings(provider_id, target_actor_id)
            .await?;
        let mut reassigned_to = None;
        if open_bookings > 0 {
            let assignee = if !acting_on_self {
                actor.membership.actor_id
            } else {
                self.store
                    .find_reassignment_fallback(provider_id, target_actor_id)
                    .await?
                    .map(|m| m.actor_id)
                    .ok_or_else(|| {
                        AccessError::InvalidTransition(format!(
                            "no eligible member to take over {open_bookings} open bookings"
                        ))
                    })?
            };
            self.store
                .reassign_open_bookings(provider_id, target_actor_id, assignee)
                .await?;
            reassigned_to = Some(assignee);
        }

        let mut guard = InvariantGuard::none();
        if target.is_active() {
            if target.role == Role::Owner {
                guard = guard.keep_an_owner();
            }
            if target.role == Role::Supervisor {
                if let Some(team_id) = target.team_id {
                    guard = guard.keep_a_supervisor(team_id);
                }
            }
        }

        let removed = self
            .store
            .remove_membership_guarded(target.id, mode, guard)
            .await?;
        ctx.invalidate(target_actor_id, provider_id).await;

        let mut event = AuditEvent::new("membership.removed")
            .with_provider(provider_id)
            .with_actor(actor.membership.actor_id)
            .with_target(removed.id)
            .with_target_actor(target_actor_id)
            .with_metadata(
                "mode",
                json!(match mode {
                    RemovalMode::Soft => "soft",
                    RemovalMode::Hard => "hard",
                }),
            )
            .with_metadata("reassigned_bookings", json!(open_bookings));
        if let Some(assignee) = reassigned_to {
            event = event.with_metadata("reassigned_to", json!(assignee));
        }
        record_best_effort(self.audit.as_ref(), event).await;

        Ok(MutationOutcome {
            membership: removed,
            changed: true,
        })
    }

    /// Activate an admin-created pending membership at the actor's first
    /// successful login.
    ///
    /// Idempotent: later calls (and calls for memberships that were never
    /// admin-created pending) succeed without changing anything.
    pub async fn record_first_login(
        &self,
        provider_id: Uuid,
        actor_id: Uuid,
    ) -> AccessResult<MutationOutcome> {
        let membership = self.target_membership(provider_id, actor_id).await?;
        let (membership, activated) = self.store.activate_first_login(membership.id).await?;

        if activated {
            record_best_effort(
                self.audit.as_ref(),
                AuditEvent::new("membership.activated")
                    .with_provider(provider_id)
                    .with_actor(actor_id)
                    .with_target(membership.id)
                    .with_diff(
                        json!({ "status": "pending" }),
                        json!({ "status": "active" }),
                    ),
            )
            .await;
        }

        Ok(MutationOutcome {
            membership,
            changed: activated,
        })
    }
}
