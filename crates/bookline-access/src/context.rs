//! Per-request resolution cache
//!
//! A `RequestContext` lives for exactly one logical request and caches
//! membership resolutions within it. It is created by the request handler,
//! threaded through the call chain, and dropped when the request finishes,
//! so cached entries can never leak across requests. The mutation engine
//! still re-reads the authoritative record before acting; the cache only
//! saves redundant lookups on the authorization path.

use bookline_org::{Capabilities, Membership};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// An actor's resolved membership plus the capabilities derived from its
/// role at resolution time.
#[derive(Debug, Clone)]
pub struct ResolvedActor {
    /// The authoritative membership record as of resolution
    pub membership: Membership,

    /// Capabilities recomputed from the membership's role
    pub capabilities: Capabilities,
}

impl ResolvedActor {
    /// Wrap a membership, deriving its capabilities.
    pub fn from_membership(membership: Membership) -> Self {
        let capabilities = Capabilities::for_role(membership.role);
        Self {
            membership,
            capabilities,
        }
    }
}

/// Short-lived cache of membership resolutions, keyed by
/// `(actor_id, provider_id)`.
#[derive(Default)]
pub struct RequestContext {
    cache: RwLock<HashMap<(Uuid, Uuid), ResolvedActor>>,
}

impl RequestContext {
    /// Create an empty context for one request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached resolution for an actor/provider pair, if present.
    pub async fn get(&self, actor_id: Uuid, provider_id: Uuid) -> Option<ResolvedActor> {
        self.cache.read().await.get(&(actor_id, provider_id)).cloned()
    }

    /// Cache a resolution.
    pub async fn insert(&self, resolved: ResolvedActor) {
        let key = (resolved.membership.actor_id, resolved.membership.provider_id);
        self.cache.write().await.insert(key, resolved);
    }

    /// Drop a cached resolution that is about to go stale, e.g. because
    /// the caller is mutating that membership.
    pub async fn invalidate(&self, actor_id: Uuid, provider_id: Uuid) {
        self.cache.write().await.remove(&(actor_id, provider_id));
    }

    /// Drop every cached resolution.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }
}
