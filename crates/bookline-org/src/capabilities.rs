//! Capability resolution
//!
//! Capabilities are boolean permission flags derived purely from a member's
//! role. They are never stored: callers recompute them on every resolution so
//! a role change can never leave stale capabilities behind.

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// The set of capabilities a role grants within a provider organization.
///
/// Each flag is computed as `role >= threshold` for a capability-specific
/// threshold role, so higher-privileged roles never lose a capability held
/// by a lower-privileged one.
///
/// # Examples
///
/// ```
/// use bookline_org::{Capabilities, Role};
///
/// let caps = Capabilities::for_role(Role::Supervisor);
/// assert!(caps.assign_bookings);
/// assert!(!caps.invite_members);
///
/// let caps = Capabilities::for_role(Role::Admin);
/// assert!(caps.invite_members);
/// assert!(!caps.manage_billing);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Invite new members to the organization
    pub invite_members: bool,

    /// Remove members from the organization
    pub remove_members: bool,

    /// Change other members' roles
    pub manage_roles: bool,

    /// View every booking in the organization
    pub view_all_bookings: bool,

    /// Edit every booking in the organization
    pub edit_all_bookings: bool,

    /// Assign bookings to staff
    pub assign_bookings: bool,

    /// View organization analytics
    pub view_analytics: bool,

    /// Manage billing and payouts
    pub manage_billing: bool,

    /// Edit organization settings
    pub edit_settings: bool,
}

impl Capabilities {
    /// Resolve the capability set for a role.
    ///
    /// Pure and total: no side effects, no error cases. Callers must invoke
    /// this on every resolution rather than caching the result across role
    /// changes.
    pub fn for_role(role: Role) -> Self {
        Self {
            invite_members: role.at_least(Role::Admin),
            remove_members: role.at_least(Role::Admin),
            manage_roles: role.at_least(Role::Admin),
            view_all_bookings: role.at_least(Role::Supervisor),
            edit_all_bookings: role.at_least(Role::Supervisor),
            assign_bookings: role.at_least(Role::Supervisor),
            view_analytics: role.at_least(Role::Admin),
            manage_billing: role.at_least(Role::Owner),
            edit_settings: role.at_least(Role::Admin),
        }
    }

    /// Iterate the flags in a fixed order, for monotonicity checks and
    /// diagnostic output.
    pub fn flags(&self) -> [(&'static str, bool); 9] {
        [
            ("invite_members", self.invite_members),
            ("remove_members", self.remove_members),
            ("manage_roles", self.manage_roles),
            ("view_all_bookings", self.view_all_bookings),
            ("edit_all_bookings", self.edit_all_bookings),
            ("assign_bookings", self.assign_bookings),
            ("view_analytics", self.view_analytics),
            ("manage_billing", self.manage_billing),
            ("edit_settings", self.edit_settings),
        ]
    }
}
