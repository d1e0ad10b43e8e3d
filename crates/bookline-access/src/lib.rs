//! # Bookline Access Control
//!
//! The access-control and membership-lifecycle engine for the Bookline
//! platform: who may act on behalf of a provider organization, at what
//! privilege level, and under which structural invariants.
//!
//! ## Overview
//!
//! The bookline-access crate handles:
//! - **Authorization**: resolving an actor's membership and capabilities
//! - **Mutation rules**: status, role, team, and removal transitions with
//!   protective invariants (last owner, last supervisor, self-demotion)
//! - **Onboarding**: retry-safe creation of an organization with its first
//!   owner membership and uploaded assets
//! - **Store contracts**: the narrow seams to the membership store, asset
//!   store, and audit sink, plus in-memory reference implementations
//!
//! ## Control Flow
//!
//! ```text
//! inbound action (actor, provider)
//!   → AuthorizationService.resolve      (membership + capabilities)
//!   → RateLimiter.check                 (mutation-class actions)
//!   → MembershipMutationEngine          (guards + guarded store write)
//!   → MembershipStore                   (atomic invariant check + persist)
//!   → AuditSink.record                  (best-effort, never blocking)
//! ```
//!
//! ## Concurrency
//!
//! The engine is request-scoped and stateless between requests. The
//! invariant counts and the mutating write execute inside one store
//! transaction (see [`store::InvariantGuard`]); the per-request cache is an
//! explicit [`RequestContext`] that never outlives its request.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bookline_access::{
//!     MembershipMutationEngine, MemoryMembershipStore, RequestContext,
//! };
//! use bookline_audit::MemoryAuditSink;
//! use bookline_org::MembershipStatus;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), bookline_access::AccessError> {
//! let store = Arc::new(MemoryMembershipStore::new());
//! let audit = Arc::new(MemoryAuditSink::new());
//! let engine = MembershipMutationEngine::new(store, audit);
//!
//! let ctx = RequestContext::new();
//! let (provider, actor, target) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
//! engine
//!     .change_status(&ctx, provider, Some(actor), target, MembershipStatus::Suspended)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod authorize;
pub mod context;
pub mod error;
pub mod memory;
pub mod mutation;
pub mod onboarding;
pub mod store;

// Re-export main types for convenience
pub use authorize::AuthorizationService;
pub use context::{RequestContext, ResolvedActor};
pub use error::{AccessError, AccessResult};
pub use memory::{MemoryAssetStore, MemoryMembershipStore};
pub use mutation::{MembershipMutationEngine, MutationOutcome};
pub use onboarding::{
    AssetUpload, CreateOrganizationInput, CreatedOrganization, OnboardingOrchestrator,
};
pub use store::{
    AssetStore, InvariantGuard, MembershipPatch, MembershipStore, RemovalMode, StoreError,
    StoreResult,
};
