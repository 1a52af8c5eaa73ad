use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tenantgate_application::{AuthContext, ContextCacheKey, OrganizationContextCache};
use tenantgate_core::{AppResult, OrganizationId};
use tokio::sync::RwLock;
use tracing::debug;

/// Default lifetime of a cached context.
pub const DEFAULT_CONTEXT_TTL: Duration = Duration::from_secs(60);

/// Default maximum number of cached contexts.
pub const DEFAULT_CONTEXT_CAPACITY: usize = 10_000;

/// Sizing of the in-memory context cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextCacheSettings {
    /// Entry lifetime. Zero disables caching.
    pub ttl: Duration,
    /// Maximum entries. Zero disables caching.
    pub capacity: usize,
}

impl Default for ContextCacheSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CONTEXT_TTL,
            capacity: DEFAULT_CONTEXT_CAPACITY,
        }
    }
}

#[derive(Debug)]
struct CachedContext {
    context: AuthContext,
    expires_at: Instant,
    last_accessed: AtomicU64,
}

impl CachedContext {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<ContextCacheKey, CachedContext>,
    version_floors: HashMap<OrganizationId, u64>,
}

impl CacheState {
    fn remove_where(
        &mut self,
        predicate: impl Fn(&ContextCacheKey, &CachedContext) -> bool,
    ) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| !predicate(key, entry));
        before - self.entries.len()
    }
}

/// In-memory context cache with per-entry TTL and LRU eviction.
///
/// Lookups share a read lock; recency is an atomic tick per entry. When
/// full, the least recently accessed tenth of the entries is evicted in one
/// batch. Expired entries are dropped lazily on access.
pub struct InMemoryOrganizationContextCache {
    state: RwLock<CacheState>,
    access_tick: AtomicU64,
    settings: ContextCacheSettings,
}

impl InMemoryOrganizationContextCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(settings: ContextCacheSettings) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            access_tick: AtomicU64::new(0),
            settings,
        }
    }

    fn next_tick(&self) -> u64 {
        self.access_tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn is_enabled(&self) -> bool {
        !self.settings.ttl.is_zero() && self.settings.capacity > 0
    }

    fn eviction_batch_size(&self) -> usize {
        (self.settings.capacity / 10).max(1)
    }

    fn evict_if_needed(&self, state: &mut CacheState) {
        if state.entries.len() < self.settings.capacity {
            return;
        }

        let now = Instant::now();
        let expired = state.remove_where(|_, entry| entry.is_expired(now));
        if state.entries.len() < self.settings.capacity {
            debug!(expired, "dropped expired contexts before insert");
            return;
        }

        let target = self
            .settings
            .capacity
            .saturating_sub(self.eviction_batch_size());
        let to_evict = state.entries.len().saturating_sub(target);

        let mut by_access = state
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.last_accessed.load(Ordering::Relaxed)))
            .collect::<Vec<_>>();
        by_access.sort_by_key(|(_, last_accessed)| *last_accessed);

        for (key, _) in by_access.into_iter().take(to_evict) {
            state.entries.remove(&key);
        }

        debug!(
            evicted = to_evict,
            remaining = state.entries.len(),
            capacity = self.settings.capacity,
            "evicted least recently used contexts"
        );
    }
}

impl Default for InMemoryOrganizationContextCache {
    fn default() -> Self {
        Self::new(ContextCacheSettings::default())
    }
}

#[async_trait]
impl OrganizationContextCache for InMemoryOrganizationContextCache {
    async fn get(&self, key: &ContextCacheKey) -> AppResult<Option<AuthContext>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        {
            let state = self.state.read().await;
            match state.entries.get(key) {
                Some(entry) if !entry.is_expired(Instant::now()) => {
                    entry
                        .last_accessed
                        .store(self.next_tick(), Ordering::Relaxed);
                    return Ok(Some(entry.context.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut state = self.state.write().await;
        if state
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            state.entries.remove(key);
        }

        Ok(None)
    }

    async fn insert(&self, key: ContextCacheKey, context: AuthContext) -> AppResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let organization_id = context.organization_id();
        let version = context.organization().permissions_version();
        let mut state = self.state.write().await;
        if state
            .version_floors
            .get(&organization_id)
            .is_some_and(|floor| version < *floor)
        {
            debug!(
                organization_id = %organization_id,
                cache_key = %key,
                version,
                "dropping context built from a superseded permissions version"
            );
            return Ok(());
        }

        if !state.entries.contains_key(&key) {
            self.evict_if_needed(&mut state);
        }

        let now = Instant::now();
        let expires_at = now.checked_add(self.settings.ttl).unwrap_or(now);
        state.entries.insert(
            key,
            CachedContext {
                context,
                expires_at,
                last_accessed: AtomicU64::new(self.next_tick()),
            },
        );

        Ok(())
    }

    async fn invalidate_organization(&self, organization_id: OrganizationId) -> AppResult<usize> {
        Ok(self
            .state
            .write()
            .await
            .remove_where(|_, entry| entry.context.organization_id() == organization_id))
    }

    async fn invalidate_entry(
        &self,
        actor_id: &str,
        organization_id: OrganizationId,
    ) -> AppResult<usize> {
        Ok(self.state.write().await.remove_where(|key, entry| {
            key.actor_id() == actor_id && entry.context.organization_id() == organization_id
        }))
    }

    async fn note_version(&self, organization_id: OrganizationId, version: u64) -> AppResult<()> {
        let mut state = self.state.write().await;
        let floor = state.version_floors.entry(organization_id).or_default();
        *floor = (*floor).max(version);
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.version_floors.clear();
        Ok(())
    }
}
