//! Process-lifetime memoization of registry lookups.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::{RegistryClient, RegistryRecord, Result, TRACING_TARGET_CACHE};

type Slot = Arc<OnceCell<Option<RegistryRecord>>>;

/// Memoizes registry lookups by tax ID.
///
/// Both outcomes of a completed lookup are cached: a found record and a
/// confirmed "not registered". Failed lookups are not cached, so a later call
/// retries. Concurrent lookups of the same tax ID share a single in-flight
/// registry round-trip.
///
/// Entries live as long as the cache; there is no eviction.
#[derive(Debug, Default)]
pub struct LookupCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl LookupCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for `tax_id`, or looks it up with `client`.
    pub async fn lookup(
        &self,
        client: &RegistryClient,
        tax_id: &str,
    ) -> Result<Option<RegistryRecord>> {
        let key = RegistryClient::query_value(tax_id);
        self.get_or_fetch(&key, || client.lookup(&key)).await
    }

    /// Returns the cached result for `key`, or runs `fetch` to produce it.
    ///
    /// At most one `fetch` for a given key runs at a time; callers arriving
    /// while it is in flight wait for its result. If it fails, the next waiter
    /// runs its own `fetch`.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Option<RegistryRecord>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<RegistryRecord>>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(key.to_owned()).or_default().clone()
        };

        if let Some(cached) = slot.get() {
            tracing::trace!(target: TRACING_TARGET_CACHE, tax_id = %key, "Cache hit");
            return Ok(cached.clone());
        }

        let value = slot.get_or_try_init(fetch).await?;
        Ok(value.clone())
    }

    /// Returns the cached result for `key` without looking it up.
    pub async fn get(&self, key: &str) -> Option<Option<RegistryRecord>> {
        let slots = self.slots.lock().await;
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Returns the number of tax IDs with a completed lookup.
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }

    /// Returns true if no lookup has completed yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every cached result.
    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::Error;
    use crate::client::tests::{FOUND, MockTransport, SEARCH_PAGE};

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let cache = Arc::new(LookupCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks = (0..8).map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch("131563856", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(Some(RegistryRecord::new("131563856").with_field("Estado", "ACTIVO")))
                    })
                    .await
            })
        });

        for result in futures::future::join_all(tasks).await {
            let record = result.unwrap().unwrap().unwrap();
            assert!(record.is_active());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_cached() {
        let cache = LookupCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache
                .get_or_fetch("999999999", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert!(result.is_none());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("999999999").await, Some(None));
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = LookupCache::new();

        let error = cache
            .get_or_fetch("131563856", || async {
                Err(Error::registry_transport().with_message("timeout"))
            })
            .await
            .unwrap_err();
        assert_eq!(error.kind, crate::ErrorKind::RegistryTransport);
        assert!(cache.is_empty().await);

        let record = cache
            .get_or_fetch("131563856", || async { Ok(Some(RegistryRecord::new("131563856"))) })
            .await
            .unwrap();
        assert!(record.is_some());
    }

    #[tokio::test]
    async fn test_lookup_through_client() {
        let transport = MockTransport::new(SEARCH_PAGE, FOUND);
        let sessions = transport.sessions.clone();
        let client = RegistryClient::new(transport);
        let cache = LookupCache::new();

        let first = cache.lookup(&client, "131-56385-6").await.unwrap();
        let second = cache.lookup(&client, "131563856").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(sessions.load(Ordering::SeqCst), 1);
    }
}
