//! Organization onboarding orchestrator
//!
//! Creates a new provider organization, its first owner membership, and any
//! uploaded assets as one retry-safe logical operation. Assets go to
//! deterministic paths with overwrite-on-retry semantics, so a failed
//! attempt needs no compensating deletes: the caller just retries the whole
//! operation, and the atomic organization-plus-owner create deduplicates.

use bookline_audit::{record_best_effort, AuditEvent, AuditSink};
use bookline_org::NewOrganization;
use bookline_ratelimit::RateLimiter;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AccessError, AccessResult};
use crate::store::{AssetStore, MembershipStore};

/// One asset uploaded with the onboarding request.
#[derive(Debug, Clone)]
pub struct AssetUpload {
    /// Raw bytes
    pub bytes: Vec<u8>,

    /// MIME content type, e.g. `image/png`
    pub content_type: String,
}

/// Onboarding input.
#[derive(Debug, Clone)]
pub struct CreateOrganizationInput {
    /// Human-readable organization name
    pub name: String,

    /// URL-friendly unique slug
    pub slug: String,

    /// Optional description
    pub description: Option<String>,

    /// Organization logo
    pub logo: Option<AssetUpload>,

    /// Sample service menu
    pub sample_menu: Option<AssetUpload>,
}

/// Outcome of a successful onboarding.
#[derive(Debug, Clone)]
pub struct CreatedOrganization {
    /// The new organization's ID
    pub organization_id: Uuid,

    /// Public logo URL, if a logo was uploaded
    pub logo_url: Option<String>,

    /// Public sample menu URL, if one was uploaded
    pub sample_menu_url: Option<String>,
}

/// Creates organizations with their first owner membership.
pub struct OnboardingOrchestrator {
    store: Arc<dyn MembershipStore>,
    assets: Arc<dyn AssetStore>,
    audit: Arc<dyn AuditSink>,
    limiter: Option<Arc<dyn RateLimiter>>,
}

impl OnboardingOrchestrator {
    /// Create an orchestrator over its collaborator stores.
    pub fn new(
        store: Arc<dyn MembershipStore>,
        assets: Arc<dyn AssetStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            assets,
            audit,
            limiter: None,
        }
    }

    /// Guard onboarding with a rate limiter, keyed by acting user.
    pub fn with_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Create an organization with its first owner membership.
    ///
    /// Steps, in order:
    /// 1. advisory pre-check that the actor does not already own an
    ///    organization (the store's uniqueness constraint is authoritative)
    /// 2. idempotent asset uploads to paths derived from the actor and
    ///    asset kind
    /// 3. one atomic store call creating the organization row together with
    ///    its owner membership
    ///
    /// A failure after step 2 leaves only overwritable uploads behind; the
    /// caller may retry the whole operation and either succeeds cleanly or
    /// gets `Conflict`, never two organizations.
    pub async fn create_organization(
        &self,
        actor_id: Option<Uuid>,
        input: CreateOrganizationInput,
    ) -> AccessResult<CreatedOrganization> {
        let actor_id = actor_id.ok_or(AccessError::Unauthenticated)?;

        if let Some(limiter) = &self.limiter {
            let decision = limiter.check(&actor_id.to_string());
            if !decision.allowed {
                tracing::warn!(
                    %actor_id,
                    retry_after = ?decision.retry_after,
                    "onboarding rejected by rate limiter"
                );
                return Err(AccessError::RateLimited {
                    retry_after: decision.retry_after.unwrap_or(Duration::from_secs(1)),
                    reset_at: decision.reset_at,
                });
            }
        }

        if let Some(existing) = self.store.actor_owned_organization(actor_id).await? {
            return Err(AccessError::Conflict(format!(
                "actor already owns organization {existing}"
            )));
        }

        let logo_url = match &input.logo {
            Some(asset) => Some(self.upload(actor_id, "logo", asset).await?),
            None => None,
        };
        let sample_menu_url = match &input.sample_menu {
            Some(asset) => Some(self.upload(actor_id, "sample-menu", asset).await?),
            None => None,
        };

        let organization = self
            .store
            .create_organization_with_owner(
                actor_id,
                NewOrganization {
                    name: input.name,
                    slug: input.slug,
                    description: input.description,
                    logo_url: logo_url.clone(),
                    sample_menu_url: sample_menu_url.clone(),
                },
            )
            .await?;

        record_best_effort(
            self.audit.as_ref(),
            AuditEvent::new("organization.created")
                .with_provider(organization.id)
                .with_actor(actor_id)
                .with_target(organization.id)
                .with_metadata("slug", json!(organization.slug)),
        )
        .await;

        Ok(CreatedOrganization {
            organization_id: organization.id,
            logo_url,
            sample_menu_url,
        })
    }

    async fn upload(
        &self,
        actor_id: Uuid,
        kind: &str,
        asset: &AssetUpload,
    ) -> AccessResult<String> {
        let path = format!(
            "providers/{actor_id}/{kind}.{}",
            extension_for(&asset.content_type)
        );
        let url = self
            .assets
            .put_idempotent(&path, asset.bytes.clone(), &asset.content_type)
            .await?;
        Ok(url)
    }
}

/// File extension for a content type, for deterministic asset paths.
fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryAssetStore, MemoryMembershipStore};
    use bookline_audit::MemoryAuditSink;
    use bookline_ratelimit::{RateLimitConfig, SlidingWindowLimiter};

    fn input(slug: &str) -> CreateOrganizationInput {
        CreateOrganizationInput {
            name: "Harbor Barbers".into(),
            slug: slug.into(),
            description: None,
            logo: Some(AssetUpload {
                bytes: vec![0x89, 0x50],
                content_type: "image/png".into(),
            }),
            sample_menu: None,
        }
    }

    fn orchestrator() -> (
        OnboardingOrchestrator,
        Arc<MemoryMembershipStore>,
        Arc<MemoryAssetStore>,
        Arc<MemoryAuditSink>,
    ) {
        let store = Arc::new(MemoryMembershipStore::new());
        let assets = Arc::new(MemoryAssetStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        (
            OnboardingOrchestrator::new(store.clone(), assets.clone(), audit.clone()),
            store,
            assets,
            audit,
        )
    }

    #[tokio::test]
    async fn test_creates_organization_with_owner_and_assets() {
        let (orchestrator, store, assets, audit) = orchestrator();
        let actor = Uuid::now_v7();

        let created = orchestrator
            .create_organization(Some(actor), input("harbor-barbers"))
            .await
            .unwrap();

        let org = store.get_organization(created.organization_id).await.unwrap();
        assert_eq!(org.owner_id, actor);
        assert_eq!(org.logo_url, created.logo_url);
        assert!(created
            .logo_url
            .as_deref()
            .unwrap()
            .ends_with(&format!("providers/{actor}/logo.png")));
        assert_eq!(assets.object_count().await, 1);
        assert_eq!(audit.len().await, 1);
    }

    #[tokio::test]
    async fn test_unauthenticated_actor_rejected() {
        let (orchestrator, ..) = orchestrator();
        let err = orchestrator
            .create_organization(None, input("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_second_create_conflicts_with_one_organization() {
        let (orchestrator, store, ..) = orchestrator();
        let actor = Uuid::now_v7();

        orchestrator
            .create_organization(Some(actor), input("harbor-barbers"))
            .await
            .unwrap();
        let err = orchestrator
            .create_organization(Some(actor), input("harbor-barbers"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Conflict(_)));
        assert_eq!(store.organization_count().await, 1);
    }

    #[tokio::test]
    async fn test_retry_after_partial_failure_succeeds_once() {
        let (orchestrator, store, assets, _) = orchestrator();
        let actor = Uuid::now_v7();

        // Simulate a first attempt that failed after the asset upload but
        // before the atomic create: the upload landed, no organization
        // exists.
        let upload = input("harbor-barbers").logo.unwrap();
        orchestrator
            .upload(actor, "logo", &upload)
            .await
            .unwrap();
        assert_eq!(store.organization_count().await, 0);
        assert_eq!(assets.object_count().await, 1);

        // The retry overwrites the upload and creates exactly one org.
        orchestrator
            .create_organization(Some(actor), input("harbor-barbers"))
            .await
            .unwrap();
        assert_eq!(store.organization_count().await, 1);
        assert_eq!(assets.object_count().await, 1);
    }

    #[tokio::test]
    async fn test_rate_limited_onboarding() {
        let (orchestrator, ..) = orchestrator();
        let limiter = Arc::new(SlidingWindowLimiter::new(RateLimitConfig::new(
            "admin-create",
            1,
            Duration::from_secs(60),
        )));
        let orchestrator = orchestrator.with_limiter(limiter);
        let actor = Uuid::now_v7();

        orchestrator
            .create_organization(Some(actor), input("one"))
            .await
            .unwrap();
        let err = orchestrator
            .create_organization(Some(actor), input("two"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::RateLimited { .. }));
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("application/pdf"), "pdf");
        assert_eq!(extension_for("application/unknown"), "bin");
    }
}
