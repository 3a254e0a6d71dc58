//! # Entity Cache Facade
//!
//! Typed convenience layer over the table repository, one instance per
//! entity type, carrying that type's staleness policy.
//!
//! ## Stale-While-Revalidate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Read Path (never blocks on network)                    │
//! │                                                                         │
//! │  UI picker calls read_through(fetch)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Snapshot returned IMMEDIATELY from the local store                    │
//! │       │                                                                 │
//! │       ├── fresh → done, revalidation = None                            │
//! │       │                                                                 │
//! │       └── stale or never populated                                     │
//! │               │                                                         │
//! │               ▼                                                         │
//! │          Revalidation task spawned (fetch → save)                      │
//! │          Its JoinHandle is returned, so callers and tests can          │
//! │          await completion deterministically.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use vela_core::CacheRecord;

use crate::error::StoreResult;
use crate::store::LocalStore;

// =============================================================================
// Cache Policy
// =============================================================================

/// Staleness policy for one entity type.
///
/// Explicit configuration rather than a hardcoded constant, so the policy
/// is testable and tunable per entity type.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Age beyond which the snapshot is considered stale.
    pub stale_after: Duration,
}

impl Default for CachePolicy {
    /// 5 minutes: the observed window before a picker silently re-fetches.
    fn default() -> Self {
        CachePolicy {
            stale_after: Duration::from_secs(300),
        }
    }
}

// =============================================================================
// Read-Through Outcome
// =============================================================================

/// Result of a read-through: the instant snapshot plus the optional
/// background revalidation task.
pub struct ReadThrough<T> {
    /// Whatever was cached at call time (`None` if never populated).
    pub snapshot: Option<Vec<T>>,

    /// Handle of the spawned revalidation, when one was needed.
    pub revalidation: Option<JoinHandle<StoreResult<()>>>,
}

// =============================================================================
// Entity Cache
// =============================================================================

/// Typed cache facade for one entity type.
///
/// The presentation layer goes through this (or the sync engine); it never
/// talks to the table repository directly.
///
/// ## Usage
/// ```rust,ignore
/// let customers: EntityCache<Customer> = EntityCache::new(store.clone());
///
/// // Instant, possibly-stale snapshot
/// let cached = customers.get_cached().await?;
///
/// // Save a fresh snapshot (atomic whole-table replace)
/// customers.save(&fresh).await?;
/// ```
pub struct EntityCache<T> {
    store: LocalStore,
    policy: CachePolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityCache<T> {
    fn clone(&self) -> Self {
        EntityCache {
            store: self.store.clone(),
            policy: self.policy,
            _marker: PhantomData,
        }
    }
}

impl<T> EntityCache<T>
where
    T: CacheRecord + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Creates a cache facade with the default 5-minute staleness policy.
    pub fn new(store: LocalStore) -> Self {
        Self::with_policy(store, CachePolicy::default())
    }

    /// Creates a cache facade with an explicit staleness policy.
    pub fn with_policy(store: LocalStore, policy: CachePolicy) -> Self {
        EntityCache {
            store,
            policy,
            _marker: PhantomData,
        }
    }

    /// Returns the cached snapshot, stale or not.
    ///
    /// `None` means the table has never been populated. A populated table
    /// whose last sync returned zero records comes back as `Some(vec![])`.
    pub async fn get_cached(&self) -> StoreResult<Option<Vec<T>>> {
        let table = self.store.tables().get(T::KIND).await?;
        if !table.is_populated() {
            return Ok(None);
        }

        let mut records = Vec::with_capacity(table.records.len());
        for value in table.records {
            records.push(serde_json::from_value(value)?);
        }
        Ok(Some(records))
    }

    /// Age of the cached snapshot. `None` means never synced, which every
    /// staleness check treats as infinitely stale.
    pub async fn cache_age(&self) -> StoreResult<Option<Duration>> {
        let table = self.store.tables().get(T::KIND).await?;
        Ok(table.last_synced_at.map(|ts| {
            // Clock skew can make this negative; clamp to zero.
            (Utc::now() - ts).to_std().unwrap_or_default()
        }))
    }

    /// Whether the snapshot is stale per this cache's policy.
    pub async fn is_stale(&self) -> StoreResult<bool> {
        self.is_stale_within(self.policy.stale_after).await
    }

    /// Whether the snapshot is older than the given threshold.
    pub async fn is_stale_within(&self, threshold: Duration) -> StoreResult<bool> {
        Ok(match self.cache_age().await? {
            None => true,
            Some(age) => age >= threshold,
        })
    }

    /// Saves a fresh snapshot (atomic whole-table replace, resets age).
    pub async fn save(&self, records: &[T]) -> StoreResult<()> {
        let mut values = Vec::with_capacity(records.len());
        for record in records {
            values.push(serde_json::to_value(record)?);
        }
        self.store.tables().replace(T::KIND, &values).await
    }

    /// Read-through with optional background revalidation.
    ///
    /// Returns the current snapshot immediately. When the snapshot is stale
    /// (or missing), `fetch` is run in a spawned task and its result saved;
    /// the task's handle is returned so the caller can observe completion.
    /// The caller never blocks on the network.
    pub async fn read_through<F, Fut>(&self, fetch: F) -> StoreResult<ReadThrough<T>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = StoreResult<Vec<T>>> + Send,
    {
        let snapshot = self.get_cached().await?;
        let stale = self.is_stale().await?;

        let revalidation = if stale {
            debug!(kind = %T::KIND, "Cache stale, spawning revalidation");
            let cache = self.clone();
            Some(tokio::spawn(async move {
                let records = fetch().await?;
                cache.save(&records).await
            }))
        } else {
            None
        };

        Ok(ReadThrough {
            snapshot,
            revalidation,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalStore, StoreConfig};
    use chrono::Utc;
    use vela_core::Customer;

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: id.into(),
            name: name.into(),
            phone: None,
            email: None,
            balance_cents: 0,
            updated_at: Utc::now(),
        }
    }

    async fn test_cache() -> EntityCache<Customer> {
        let store = LocalStore::open(StoreConfig::in_memory()).await.unwrap();
        EntityCache::new(store)
    }

    #[tokio::test]
    async fn test_never_populated_reads_none() {
        let cache = test_cache().await;
        assert!(cache.get_cached().await.unwrap().is_none());
        assert!(cache.cache_age().await.unwrap().is_none());
        assert!(cache.is_stale().await.unwrap());
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let cache = test_cache().await;

        let records = vec![customer("c1", "John Carter"), customer("c2", "Mary Shaw")];
        cache.save(&records).await.unwrap();

        let cached = cache.get_cached().await.unwrap().unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].id, "c1");
        assert_eq!(cached[1].name, "Mary Shaw");
    }

    #[tokio::test]
    async fn test_save_resets_age() {
        let cache = test_cache().await;
        cache.save(&[customer("c1", "John")]).await.unwrap();

        let age = cache.cache_age().await.unwrap().unwrap();
        assert!(age < Duration::from_secs(5));
        assert!(!cache.is_stale().await.unwrap());

        // Against a zero threshold any age counts as stale.
        assert!(cache.is_stale_within(Duration::ZERO).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_through_fresh_skips_revalidation() {
        let cache = test_cache().await;
        cache.save(&[customer("c1", "John")]).await.unwrap();

        let outcome = cache
            .read_through(|| async { Ok(vec![customer("zz", "Never Fetched")]) })
            .await
            .unwrap();

        // Fresh snapshot: no revalidation task, cache untouched.
        assert_eq!(outcome.snapshot.unwrap().len(), 1);
        assert!(outcome.revalidation.is_none());
        let cached = cache.get_cached().await.unwrap().unwrap();
        assert_eq!(cached[0].id, "c1");
    }

    #[tokio::test]
    async fn test_read_through_revalidates_when_empty() {
        let cache = test_cache().await;

        let outcome = cache
            .read_through(|| async { Ok(vec![customer("c1", "John")]) })
            .await
            .unwrap();

        // Snapshot was empty at call time, revalidation observable.
        assert!(outcome.snapshot.is_none());
        outcome.revalidation.unwrap().await.unwrap().unwrap();

        let cached = cache.get_cached().await.unwrap().unwrap();
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_not_none() {
        let cache = test_cache().await;
        cache.save(&[]).await.unwrap();

        let cached = cache.get_cached().await.unwrap();
        assert_eq!(cached.unwrap().len(), 0);
    }
}
