//! Membership authorization service
//!
//! Resolves "who is the actor, what is their role, are they authorized"
//! for a provider/actor pair, composing the capability resolver with the
//! membership store. Resolutions within one request are cached in the
//! caller's [`RequestContext`].

use bookline_org::Role;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::{RequestContext, ResolvedActor};
use crate::error::{AccessError, AccessResult};
use crate::store::MembershipStore;

/// Resolves and checks actor memberships.
#[derive(Clone)]
pub struct AuthorizationService {
    store: Arc<dyn MembershipStore>,
}

impl AuthorizationService {
    /// Create a service over a membership store.
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    /// Resolve an actor's membership and capabilities.
    ///
    /// Fails `Unauthenticated` when no actor identity is present, and
    /// `Forbidden` when the actor has no active membership for the resolved
    /// provider. With `provider_id` omitted, the actor's earliest-created
    /// active membership picks the provider.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        actor_id: Option<Uuid>,
        provider_id: Option<Uuid>,
    ) -> AccessResult<ResolvedActor> {
        let actor_id = actor_id.ok_or(AccessError::Unauthenticated)?;

        let provider_id = match provider_id {
            Some(id) => id,
            None => {
                let memberships = self.store.active_memberships_for_actor(actor_id).await?;
                memberships
                    .first()
                    .map(|m| m.provider_id)
                    .ok_or_else(|| {
                        AccessError::Forbidden("no active membership for actor".into())
                    })?
            }
        };

        if let Some(cached) = ctx.get(actor_id, provider_id).await {
            return Ok(cached);
        }

        let membership = self
            .store
            .find_membership(provider_id, actor_id)
            .await?
            .filter(|m| m.is_active())
            .ok_or_else(|| {
                AccessError::Forbidden("no active membership for actor in provider".into())
            })?;

        let resolved = ResolvedActor::from_membership(membership);
        ctx.insert(resolved.clone()).await;
        Ok(resolved)
    }

    /// Resolve the actor and require at least `min_role`.
    pub async fn require_role(
        &self,
        ctx: &RequestContext,
        provider_id: Uuid,
        actor_id: Option<Uuid>,
        min_role: Role,
    ) -> AccessResult<ResolvedActor> {
        let resolved = self.resolve(ctx, actor_id, Some(provider_id)).await?;
        if !resolved.membership.role.at_least(min_role) {
            return Err(AccessError::Forbidden(format!(
                "requires role {} or higher",
                min_role.as_str()
            )));
        }
        Ok(resolved)
    }

    /// Resolve the actor and require membership in an explicit role set.
    pub async fn require_any_role(
        &self,
        ctx: &RequestContext,
        provider_id: Uuid,
        actor_id: Option<Uuid>,
        allowed: &[Role],
    ) -> AccessResult<ResolvedActor> {
        let resolved = self.resolve(ctx, actor_id, Some(provider_id)).await?;
        if !allowed.contains(&resolved.membership.role) {
            return Err(AccessError::Forbidden(format!(
                "role {} is not permitted for this action",
                resolved.membership.role.as_str()
            )));
        }
        Ok(resolved)
    }
}
