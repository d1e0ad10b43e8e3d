//! Provider organization domain model
//!
//! Organizations are the top-level tenant entities. Every membership, team,
//! and booking belongs to exactly one organization, and an organization must
//! always have at least one active owner membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A provider organization (tenant).
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use bookline_org::Organization;
///
/// let owner_id = Uuid::now_v7();
/// let org = Organization::new("Harbor Barbers", "harbor-barbers", owner_id);
/// assert_eq!(org.name, "Harbor Barbers");
/// assert!(org.is_active);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: Uuid,

    /// Human-readable name
    pub name: String,

    /// URL-friendly slug (unique across the platform)
    pub slug: String,

    /// Optional description
    pub description: Option<String>,

    /// Logo URL, set by onboarding asset upload
    pub logo_url: Option<String>,

    /// Sample menu URL, set by onboarding asset upload
    pub sample_menu_url: Option<String>,

    /// The user who created the organization and holds its first owner
    /// membership
    pub owner_id: Uuid,

    /// Whether the organization is active
    pub is_active: bool,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a new active organization.
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable name
    /// * `slug` - URL-friendly unique slug
    /// * `owner_id` - The creating user, who becomes the first owner
    pub fn new(name: impl Into<String>, slug: impl Into<String>, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            slug: slug.into(),
            description: None,
            logo_url: None,
            sample_menu_url: None,
            owner_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input fields for creating a new organization during onboarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrganization {
    /// Human-readable name
    pub name: String,

    /// URL-friendly unique slug
    pub slug: String,

    /// Optional description
    pub description: Option<String>,

    /// Logo URL, if an asset was uploaded before the create
    pub logo_url: Option<String>,

    /// Sample menu URL, if an asset was uploaded before the create
    pub sample_menu_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_creation() {
        let owner_id = Uuid::now_v7();
        let org = Organization::new("Harbor Barbers", "harbor-barbers", owner_id);

        assert_eq!(org.slug, "harbor-barbers");
        assert_eq!(org.owner_id, owner_id);
        assert!(org.is_active);
        assert!(org.logo_url.is_none());
    }
}
