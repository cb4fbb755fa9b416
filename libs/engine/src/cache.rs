//! Lookup cache for terminology version records
//!
//! Rule evaluation resolves the terminology release of every rule; the cache
//! keeps those records between expansions. It is owned by the caller and
//! handed to the engine through [`EngineContext`](crate::EngineContext), so
//! capacity, TTL and invalidation are explicit.

use crate::models::TerminologyVersion;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

pub struct LookupCache {
    entries: Mutex<LruCache<Uuid, (TerminologyVersion, Instant)>>,
    ttl: Duration,
}

impl LookupCache {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn from_config(config: &crate::config::EngineConfig) -> Self {
        Self::new(
            config.lookup_cache_capacity,
            Duration::from_secs(config.lookup_cache_ttl_seconds),
        )
    }

    /// Fresh entry for `uuid`. Entries older than the TTL are evicted and reported absent.
    pub fn get(&self, uuid: &Uuid) -> Option<TerminologyVersion> {
        let mut entries = self.lock();
        let expired = match entries.get(uuid) {
            Some((version, inserted_at)) => {
                if inserted_at.elapsed() < self.ttl {
                    return Some(version.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            entries.pop(uuid);
        }
        None
    }

    pub fn insert(&self, version: TerminologyVersion) {
        self.lock().put(version.uuid, (version, Instant::now()));
    }

    pub fn invalidate(&self, uuid: &Uuid) -> bool {
        self.lock().pop(uuid).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<Uuid, (TerminologyVersion, Instant)>> {
        // Entries are plain data; a panic mid-update cannot leave them inconsistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for LookupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(name: &str) -> TerminologyVersion {
        TerminologyVersion {
            uuid: Uuid::new_v4(),
            terminology: name.to_string(),
            version: "2024".to_string(),
            fhir_uri: "http://hl7.org/fhir/sid/icd-10-cm".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = LookupCache::new(8, Duration::from_secs(60));
        let icd = release("ICD-10 CM");
        cache.insert(icd.clone());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&icd.uuid), Some(icd.clone()));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&icd.uuid), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reinsert_refreshes_age() {
        let cache = LookupCache::new(8, Duration::from_secs(10));
        let icd = release("ICD-10 CM");
        cache.insert(icd.clone());

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert(icd.clone());
        tokio::time::advance(Duration::from_secs(8)).await;

        assert!(cache.get(&icd.uuid).is_some());
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = LookupCache::new(2, Duration::from_secs(3600));
        let a = release("A");
        let b = release("B");
        let c = release("C");

        cache.insert(a.clone());
        cache.insert(b.clone());
        assert!(cache.get(&a.uuid).is_some());
        cache.insert(c.clone());

        assert!(cache.get(&a.uuid).is_some());
        assert!(cache.get(&b.uuid).is_none());
        assert!(cache.get(&c.uuid).is_some());
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = LookupCache::new(0, Duration::from_secs(3600));
        let a = release("A");
        cache.insert(a.clone());

        assert!(cache.invalidate(&a.uuid));
        assert!(!cache.invalidate(&a.uuid));

        cache.insert(a);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
