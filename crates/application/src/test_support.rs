use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tenantgate_core::{
    AppError, AppResult, FixedClock, NonEmptyString, OrganizationId, UserId, VerifiedSession,
};
use tenantgate_domain::{
    ApiKeyCredential, ApiKeyCredentialParts, ApiKeyId, MemberKey, Organization,
    OrganizationPatch, Permission, PermissionSet, RoleKey, TeamMember,
};
use tokio::sync::Mutex;

use crate::token_crypto::generate_api_key;
use crate::{
    ApiKeyRepository, ApiKeyService, AuditDispatcher, AuditEvent, AuditRepository, AuthContext,
    AuthorizationService, ContextCacheKey, InboundRequest, OrganizationContextCache,
    OrganizationStore, PermissionInvalidator, RoleAdminService, TemporaryGrantService,
};

pub(crate) const SELECTOR: &str = "acme";

pub(crate) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

pub(crate) fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(start_time()))
}

pub(crate) fn session_request(user: &str, selector: &str) -> AppResult<InboundRequest> {
    Ok(InboundRequest {
        authorization: None,
        session: Some(VerifiedSession::new(
            UserId::new(user)?,
            Some(selector.to_owned()),
        )),
    })
}

pub(crate) fn bearer_request(raw_token: &str) -> InboundRequest {
    InboundRequest {
        authorization: Some(format!("Bearer {raw_token}")),
        session: None,
    }
}

#[derive(Default)]
pub(crate) struct FakeOrganizationStore {
    organizations: Mutex<HashMap<OrganizationId, Organization>>,
    reads: AtomicUsize,
}

impl FakeOrganizationStore {
    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) async fn snapshot(&self, organization_id: OrganizationId) -> Option<Organization> {
        self.organizations
            .lock()
            .await
            .get(&organization_id)
            .cloned()
    }
}

#[async_trait]
impl OrganizationStore for FakeOrganizationStore {
    async fn insert_organization(&self, organization: Organization) -> AppResult<()> {
        self.organizations
            .lock()
            .await
            .insert(organization.id(), organization);
        Ok(())
    }

    async fn get_organization(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Option<Organization>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot(organization_id).await)
    }

    async fn get_organization_by_selector(
        &self,
        selector: &str,
    ) -> AppResult<Option<Organization>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .organizations
            .lock()
            .await
            .values()
            .find(|organization| organization.selector() == selector)
            .cloned())
    }

    async fn get_membership(
        &self,
        user_id: &UserId,
        organization_id: OrganizationId,
    ) -> AppResult<Option<TeamMember>> {
        Ok(self
            .snapshot(organization_id)
            .await
            .and_then(|organization| organization.member_for_user(user_id).cloned()))
    }

    async fn patch_organization(
        &self,
        organization_id: OrganizationId,
        patches: &[OrganizationPatch],
    ) -> AppResult<Organization> {
        let mut organizations = self.organizations.lock().await;
        let organization = organizations
            .get_mut(&organization_id)
            .ok_or(AppError::OrganizationNotFound)?;
        organization.apply_patches(patches)?;
        Ok(organization.clone())
    }

    async fn permissions_version(&self, organization_id: OrganizationId) -> AppResult<Option<u64>> {
        Ok(self
            .snapshot(organization_id)
            .await
            .map(|organization| organization.permissions_version()))
    }

    async fn list_organization_ids(&self) -> AppResult<Vec<OrganizationId>> {
        let mut ids = self
            .organizations
            .lock()
            .await
            .keys()
            .copied()
            .collect::<Vec<_>>();
        ids.sort();
        Ok(ids)
    }
}

#[derive(Default)]
pub(crate) struct FakeContextCache {
    entries: Mutex<HashMap<ContextCacheKey, AuthContext>>,
    floors: Mutex<HashMap<OrganizationId, u64>>,
}

impl FakeContextCache {
    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl OrganizationContextCache for FakeContextCache {
    async fn get(&self, key: &ContextCacheKey) -> AppResult<Option<AuthContext>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn insert(&self, key: ContextCacheKey, context: AuthContext) -> AppResult<()> {
        let floor = self
            .floors
            .lock()
            .await
            .get(&context.organization_id())
            .copied()
            .unwrap_or_default();
        if context.organization().permissions_version() >= floor {
            self.entries.lock().await.insert(key, context);
        }
        Ok(())
    }

    async fn invalidate_organization(&self, organization_id: OrganizationId) -> AppResult<usize> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, context| context.organization_id() != organization_id);
        Ok(before - entries.len())
    }

    async fn invalidate_entry(
        &self,
        actor_id: &str,
        organization_id: OrganizationId,
    ) -> AppResult<usize> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, context| {
            key.actor_id() != actor_id || context.organization_id() != organization_id
        });
        Ok(before - entries.len())
    }

    async fn note_version(&self, organization_id: OrganizationId, version: u64) -> AppResult<()> {
        let mut floors = self.floors.lock().await;
        let floor = floors.entry(organization_id).or_default();
        *floor = (*floor).max(version);
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        self.entries.lock().await.clear();
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeApiKeyRepository {
    keys: Mutex<Vec<ApiKeyCredential>>,
}

#[async_trait]
impl ApiKeyRepository for FakeApiKeyRepository {
    async fn insert(&self, credential: ApiKeyCredential) -> AppResult<()> {
        self.keys.lock().await.push(credential);
        Ok(())
    }

    async fn find_by_hash(&self, key_hash: &str) -> AppResult<Option<ApiKeyCredential>> {
        Ok(self
            .keys
            .lock()
            .await
            .iter()
            .find(|credential| credential.key_hash() == key_hash)
            .cloned())
    }

    async fn find_by_id(
        &self,
        organization_id: OrganizationId,
        key_id: ApiKeyId,
    ) -> AppResult<Option<ApiKeyCredential>> {
        Ok(self
            .keys
            .lock()
            .await
            .iter()
            .find(|credential| {
                credential.id() == key_id && credential.organization_id() == organization_id
            })
            .cloned())
    }

    async fn list_for_organization(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Vec<ApiKeyCredential>> {
        Ok(self
            .keys
            .lock()
            .await
            .iter()
            .rev()
            .filter(|credential| credential.organization_id() == organization_id)
            .cloned()
            .collect())
    }

    async fn revoke(&self, organization_id: OrganizationId, key_id: ApiKeyId) -> AppResult<bool> {
        let mut keys = self.keys.lock().await;
        let Some(credential) = keys.iter_mut().find(|credential| {
            credential.id() == key_id && credential.organization_id() == organization_id
        }) else {
            return Ok(false);
        };
        let was_active = !credential.is_revoked();
        credential.revoke();
        Ok(was_active)
    }

    async fn touch_last_used(&self, key_id: ApiKeyId, used_at: DateTime<Utc>) -> AppResult<()> {
        if let Some(credential) = self
            .keys
            .lock()
            .await
            .iter_mut()
            .find(|credential| credential.id() == key_id)
        {
            credential.touch(used_at);
        }
        Ok(())
    }
}

/// Stores one credential for a throwaway organization and returns its raw token.
pub(crate) async fn issue_api_key(
    repository: &FakeApiKeyRepository,
    expires_at: Option<DateTime<Utc>>,
) -> AppResult<(String, ApiKeyCredential)> {
    let generated = generate_api_key()?;
    let credential = ApiKeyCredential::from(ApiKeyCredentialParts {
        id: ApiKeyId::new(),
        name: NonEmptyString::new("ci")?,
        key_hash: generated.key_hash,
        display_prefix: generated.display_prefix,
        organization_id: OrganizationId::new(),
        created_by: UserId::new("owner")?,
        permissions: PermissionSet::from([Permission::ViewForms]),
        expires_at,
        last_used_at: None,
        is_revoked: false,
        created_at: start_time(),
    });
    repository.insert(credential.clone()).await?;
    Ok((generated.raw_token, credential))
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
    fail: bool,
}

impl FakeAuditRepository {
    pub(crate) fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("audit sink unavailable".to_owned()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Fully wired services over fakes with one seeded organization.
///
/// Members: `owner` (admin, earliest), `editor` (editor) and `viewer` (viewer).
pub(crate) struct Harness {
    pub(crate) clock: Arc<FixedClock>,
    pub(crate) store: Arc<FakeOrganizationStore>,
    pub(crate) cache: Arc<FakeContextCache>,
    pub(crate) api_keys: Arc<FakeApiKeyRepository>,
    pub(crate) audit: Arc<FakeAuditRepository>,
    pub(crate) authorization: AuthorizationService,
    pub(crate) invalidator: PermissionInvalidator,
    pub(crate) organization_id: OrganizationId,
}

impl Harness {
    pub(crate) async fn new() -> AppResult<Self> {
        Self::with_audit(Arc::new(FakeAuditRepository::default())).await
    }

    pub(crate) async fn with_audit(audit: Arc<FakeAuditRepository>) -> AppResult<Self> {
        let clock = fixed_clock();
        let store = Arc::new(FakeOrganizationStore::default());
        let cache = Arc::new(FakeContextCache::default());
        let api_keys = Arc::new(FakeApiKeyRepository::default());

        let mut organization = Organization::create(
            OrganizationId::new(),
            NonEmptyString::new(SELECTOR)?,
            NonEmptyString::new("Acme")?,
            UserId::new("owner")?,
            start_time() - Duration::days(30),
        )?;
        for (offset, user, role) in [(1, "editor", "editor"), (2, "viewer", "viewer")] {
            organization.apply_patch(OrganizationPatch::AppendMember(TeamMember::new(
                MemberKey::generate(),
                UserId::new(user)?,
                RoleKey::new(role)?,
                start_time() - Duration::days(30 - offset),
            )))?;
        }
        let organization_id = organization.id();
        store.insert_organization(organization).await?;

        let authorization = AuthorizationService::new(
            store.clone(),
            cache.clone(),
            api_keys.clone(),
            clock.clone(),
        );
        let invalidator = PermissionInvalidator::new(store.clone(), cache.clone());

        Ok(Self {
            clock,
            store,
            cache,
            api_keys,
            audit,
            authorization,
            invalidator,
            organization_id,
        })
    }

    pub(crate) async fn context_for(&self, user: &str) -> AppResult<AuthContext> {
        self.authorization
            .resolve_context(&session_request(user, SELECTOR)?)
            .await
    }

    pub(crate) async fn member_key(&self, user: &str) -> AppResult<MemberKey> {
        let user_id = UserId::new(user)?;
        self.store
            .snapshot(self.organization_id)
            .await
            .and_then(|organization| {
                organization
                    .member_for_user(&user_id)
                    .map(|member| member.key().clone())
            })
            .ok_or(AppError::NotAMember)
    }

    pub(crate) async fn version(&self) -> AppResult<u64> {
        self.authorization
            .permissions_version_of(self.organization_id)
            .await
    }

    fn dispatcher(&self) -> AuditDispatcher {
        AuditDispatcher::new(self.audit.clone())
    }

    pub(crate) fn grants(&self) -> TemporaryGrantService {
        TemporaryGrantService::new(
            self.authorization.clone(),
            self.store.clone(),
            self.invalidator.clone(),
            self.dispatcher(),
        )
    }

    pub(crate) fn api_key_service(&self) -> ApiKeyService {
        ApiKeyService::new(
            self.authorization.clone(),
            self.api_keys.clone(),
            self.invalidator.clone(),
            self.dispatcher(),
        )
    }

    pub(crate) fn role_admin(&self) -> RoleAdminService {
        RoleAdminService::new(
            self.authorization.clone(),
            self.store.clone(),
            self.invalidator.clone(),
            self.dispatcher(),
        )
    }
}
