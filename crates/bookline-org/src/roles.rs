//! Role hierarchy
//!
//! This module defines the provider organization role hierarchy. The ordering
//! of `Role` is the single source of truth for every privilege comparison in
//! the platform: capability thresholds, mutation guards, and authorization
//! checks all reduce to comparisons on this enum.

use serde::{Deserialize, Serialize};

/// A member's role within a provider organization.
///
/// Roles are hierarchical, with each role inheriting the privileges of lower
/// roles. The hierarchy is: Viewer < Staff < Supervisor < Admin < Owner.
///
/// # Permission Model
///
/// - **Viewer**: Read-only access to organization resources
/// - **Staff**: Works bookings assigned to them
/// - **Supervisor**: Manages a single team's staff and their bookings
/// - **Admin**: Manages members, roles, and teams across the organization
/// - **Owner**: Full organization control including billing and settings
///
/// # Examples
///
/// ```
/// use bookline_org::Role;
///
/// assert!(Role::Admin > Role::Supervisor);
/// assert!(Role::Admin.outranks(Role::Staff));
/// assert!(!Role::Admin.outranks(Role::Admin));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access to organization resources
    Viewer = 0,

    /// Works bookings assigned to them
    Staff = 1,

    /// Manages one team's staff and bookings
    Supervisor = 2,

    /// Manages members, roles, and teams
    Admin = 3,

    /// Full organization control
    Owner = 4,
}

impl Role {
    /// All roles, highest privilege first.
    pub const ALL: [Role; 5] = [
        Role::Owner,
        Role::Admin,
        Role::Supervisor,
        Role::Staff,
        Role::Viewer,
    ];

    /// Check if this role holds at least the privilege of `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bookline_org::Role;
    ///
    /// assert!(Role::Owner.at_least(Role::Admin));
    /// assert!(Role::Admin.at_least(Role::Admin));
    /// assert!(!Role::Supervisor.at_least(Role::Admin));
    /// ```
    pub fn at_least(&self, other: Role) -> bool {
        *self >= other
    }

    /// Check if this role is strictly more privileged than `other`.
    ///
    /// Mutation guards that act on `admin`-or-higher targets require the
    /// actor to outrank the target, not merely equal them.
    pub fn outranks(&self, other: Role) -> bool {
        *self > other
    }

    /// Check if this role has admin privileges (member and team management).
    pub fn is_admin(&self) -> bool {
        *self >= Role::Admin
    }

    /// Parse a role from its string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use bookline_org::Role;
    ///
    /// assert_eq!(Role::parse("admin"), Some(Role::Admin));
    /// assert_eq!(Role::parse("SUPERVISOR"), Some(Role::Supervisor));
    /// assert_eq!(Role::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "staff" => Some(Self::Staff),
            "supervisor" => Some(Self::Supervisor),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Get the lowercase string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Staff => "staff",
            Self::Supervisor => "supervisor",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Get a human-readable display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Viewer => "Viewer",
            Self::Staff => "Staff",
            Self::Supervisor => "Supervisor",
            Self::Admin => "Admin",
            Self::Owner => "Owner",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Viewer
    }
}
