//! In-memory entity cache using DashMap

use crud_core::EntityId;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// How long an entry may stay in an [`EntityCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Entries live until removed or cleared
    Never,
    /// Entries not read within the window are evicted
    Idle(Duration),
}

impl ExpiryPolicy {
    fn is_expired(self, last_access: Instant, now: Instant) -> bool {
        match self {
            ExpiryPolicy::Never => false,
            ExpiryPolicy::Idle(window) => now.saturating_duration_since(last_access) >= window,
        }
    }
}

/// Read-through cache of entities keyed by id, shared by all request tasks
pub struct EntityCache<V> {
    name: &'static str,
    policy: ExpiryPolicy,
    data: Arc<DashMap<EntityId, CacheEntry<V>>>,
}

struct CacheEntry<V> {
    value: V,
    last_access: Instant,
}

impl<V> EntityCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, policy: ExpiryPolicy) -> Self {
        let cache = Self {
            name,
            policy,
            data: Arc::new(DashMap::new()),
        };

        if let ExpiryPolicy::Idle(window) = policy {
            cache.start_sweep_task(window);
        }

        cache
    }

    /// Get a value, refreshing its access time
    pub fn get(&self, id: EntityId) -> Option<V> {
        let now = Instant::now();

        match self.data.get_mut(&id) {
            Some(mut entry) if !self.policy.is_expired(entry.last_access, now) => {
                entry.last_access = now;
                return Some(entry.value.clone());
            }
            Some(_) => {}
            None => return None,
        }

        // Expired; only drop it if nobody refreshed it in the meantime
        self.data
            .remove_if(&id, |_, entry| self.policy.is_expired(entry.last_access, now));
        None
    }

    /// Insert or overwrite a value
    pub fn insert(&self, id: EntityId, value: V) {
        self.data.insert(
            id,
            CacheEntry {
                value,
                last_access: Instant::now(),
            },
        );
    }

    /// Remove a single entry
    pub fn remove(&self, id: EntityId) {
        self.data.remove(&id);
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    fn start_sweep_task(&self, window: Duration) {
        // Caches built outside a runtime still expire lazily in `get`
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime, {} cache will only expire on access", self.name);
            return;
        };

        let data: Weak<DashMap<EntityId, CacheEntry<V>>> = Arc::downgrade(&self.data);
        let period = window
            .min(Duration::from_secs(60))
            .max(Duration::from_millis(10));
        let name = self.name;

        handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;

                let Some(data) = data.upgrade() else {
                    tracing::debug!("{} cache dropped, stopping sweep", name);
                    break;
                };

                let now = Instant::now();
                let before = data.len();
                data.retain(|_, entry| now.saturating_duration_since(entry.last_access) < window);
                let evicted = before.saturating_sub(data.len());
                if evicted > 0 {
                    tracing::debug!("Evicted {} idle entries from {} cache", evicted, name);
                }
            }
        });
    }
}
