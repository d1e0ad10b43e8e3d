//! # Bookline Organization Model
//!
//! This crate provides the provider-organization domain model for the
//! Bookline platform, shared across the scheduling and admin applications.
//!
//! ## Overview
//!
//! The bookline-org crate handles:
//! - **Organizations**: Top-level provider tenant entities
//! - **Memberships**: Actor-organization bindings with role, status, and team
//! - **Roles**: The hierarchical role order all privilege checks reduce to
//! - **Capabilities**: Boolean permission flags derived purely from role
//! - **Teams**: Location-scoped member groupings
//!
//! ## Architecture
//!
//! ```text
//! Actor
//!   └─ Membership ─→ Organization
//!                       └─ Teams ←─ Membership.team_id
//!        ├─ Role  ──→ Capabilities (derived, never stored)
//!        └─ Status (pending / active / suspended)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bookline_org::{Capabilities, Membership, Organization, Role};
//! use uuid::Uuid;
//!
//! let owner_id = Uuid::now_v7();
//! let org = Organization::new("Harbor Barbers", "harbor-barbers", owner_id);
//!
//! let membership = Membership::new(org.id, owner_id, Role::Owner);
//! let caps = Capabilities::for_role(membership.role);
//! assert!(caps.manage_billing);
//! ```
//!
//! ## Cross-Crate Integration
//!
//! This crate is designed to work with:
//! - `bookline-access`: Authorization and membership mutation rules
//! - `bookline-ratelimit`: Sliding-window rate limiting for mutations
//! - `bookline-audit`: Audit trail for membership changes
//!
//! ## Feature Flags
//!
//! - `serde`: Serialization support (enabled by default)

pub mod capabilities;
pub mod membership;
pub mod organization;
pub mod roles;
pub mod team;

// Re-export main types for convenience
pub use capabilities::Capabilities;
pub use membership::{Membership, MembershipStatus};
pub use organization::{NewOrganization, Organization};
pub use roles::Role;
pub use team::{Team, TeamStatus};
