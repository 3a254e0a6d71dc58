//! # Table Repository
//!
//! Whole-table snapshot reads and atomic replaces over the generic cache
//! schema.
//!
//! ## Whole-Table Replace
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Replace Discipline                                   │
//! │                                                                         │
//! │  ❌ WRONG: merge individual records in place                            │
//! │     (readers can observe a half-written table, conflicts need          │
//! │      field-level resolution)                                           │
//! │                                                                         │
//! │  ✅ CORRECT: replace the whole table in one transaction                 │
//! │     BEGIN;                                                             │
//! │       DELETE FROM cache_records WHERE kind = ?;                        │
//! │       INSERT ... (one row per record, in server order);                │
//! │       UPSERT cache_meta (row_count, last_synced_at = now);             │
//! │     COMMIT;                                                            │
//! │                                                                         │
//! │  A reader sees the old snapshot or the new one, never a mix, and       │
//! │  re-running the same sync yields byte-identical content.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use vela_core::EntityKind;

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Snapshot & Stats Types
// =============================================================================

/// One table's cached snapshot plus its sync metadata.
#[derive(Debug, Clone)]
pub struct CacheTable {
    /// Records in server order. Empty when never populated OR when the last
    /// sync legitimately returned zero records - check
    /// [`CacheTable::is_populated`] to tell them apart.
    pub records: Vec<serde_json::Value>,

    /// When the table was last replaced. `None` means never populated.
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl CacheTable {
    /// Whether the table has ever been populated by a sync.
    pub fn is_populated(&self) -> bool {
        self.last_synced_at.is_some()
    }
}

/// Metadata for one cached table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Number of cached records.
    pub count: i64,

    /// When the table was last replaced.
    pub last_synced_at: DateTime<Utc>,
}

/// Cache statistics across all tables; the App Initializer uses these to
/// decide whether offline operation is viable.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    tables: HashMap<EntityKind, TableStats>,
}

impl CacheStats {
    /// Stats for one table, if it has ever been populated.
    pub fn get(&self, kind: EntityKind) -> Option<&TableStats> {
        self.tables.get(&kind)
    }

    /// Record count for one table (0 when never populated).
    pub fn count(&self, kind: EntityKind) -> i64 {
        self.tables.get(&kind).map(|s| s.count).unwrap_or(0)
    }

    /// The offline-adequacy policy: the app can do something useful offline
    /// as soon as it has products or customers cached.
    pub fn has_minimal_data(&self) -> bool {
        self.count(EntityKind::Products) > 0 || self.count(EntityKind::Customers) > 0
    }

    /// Total cached records across all tables.
    pub fn total_records(&self) -> i64 {
        self.tables.values().map(|s| s.count).sum()
    }
}

// =============================================================================
// Table Repository
// =============================================================================

/// Repository for snapshot-granularity cache operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = store.tables();
/// let table = repo.get(EntityKind::Products).await?;
/// repo.replace(EntityKind::Products, &fresh_records).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    /// Creates a new TableRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// Returns the current snapshot of one table.
    ///
    /// A never-populated table comes back with no records and
    /// `last_synced_at = None`.
    pub async fn get(&self, kind: EntityKind) -> StoreResult<CacheTable> {
        let kind_name = kind.table_name();

        let meta_row = sqlx::query("SELECT last_synced_at FROM cache_meta WHERE kind = ?1")
            .bind(kind_name)
            .fetch_optional(&self.pool)
            .await?;

        let last_synced_at = match meta_row {
            Some(row) => Some(parse_timestamp(row.get::<String, _>("last_synced_at"))?),
            None => None,
        };

        let rows = sqlx::query(
            "SELECT payload FROM cache_records WHERE kind = ?1 ORDER BY position",
        )
        .bind(kind_name)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.get("payload");
            records.push(serde_json::from_str(&payload)?);
        }

        debug!(kind = %kind, count = records.len(), "Loaded cache table");

        Ok(CacheTable {
            records,
            last_synced_at,
        })
    }

    /// Atomically replaces one table with a fresh snapshot.
    ///
    /// ## Contract
    /// - Every record must carry a string `id` field; otherwise the whole
    ///   replace fails with [`StoreError::InvalidRecord`] and the previous
    ///   snapshot stays intact.
    /// - Duplicate ids within one snapshot keep the last occurrence.
    /// - On success `last_synced_at` is set to now; the call does not return
    ///   until the transaction is committed (durability-before-success).
    pub async fn replace(
        &self,
        kind: EntityKind,
        records: &[serde_json::Value],
    ) -> StoreResult<()> {
        let kind_name = kind.table_name();

        // Validate and serialize up front, before touching the database.
        let mut rows: Vec<(String, String)> = Vec::with_capacity(records.len());
        let mut distinct: HashSet<&str> = HashSet::with_capacity(records.len());
        for record in records {
            let id = record
                .get("id")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| StoreError::InvalidRecord {
                    table: kind_name.to_string(),
                })?;
            distinct.insert(id);
            rows.push((id.to_string(), serde_json::to_string(record)?));
        }
        let row_count = distinct.len() as i64;

        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cache_records WHERE kind = ?1")
            .bind(kind_name)
            .execute(&mut *tx)
            .await?;

        for (position, (id, payload)) in rows.iter().enumerate() {
            sqlx::query(
                "INSERT OR REPLACE INTO cache_records (kind, entity_id, position, payload) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(kind_name)
            .bind(id)
            .bind(position as i64)
            .bind(payload)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO cache_meta (kind, row_count, last_synced_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(kind) DO UPDATE SET row_count = ?2, last_synced_at = ?3",
        )
        .bind(kind_name)
        .bind(row_count)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))?;

        debug!(kind = %kind, count = row_count, "Replaced cache table");
        Ok(())
    }

    /// Returns `{count, last_synced_at}` for every populated table.
    pub async fn stats(&self) -> StoreResult<CacheStats> {
        let rows = sqlx::query("SELECT kind, row_count, last_synced_at FROM cache_meta")
            .fetch_all(&self.pool)
            .await?;

        let mut tables = HashMap::new();
        for row in rows {
            let kind_name: String = row.get("kind");
            // Unknown kinds (from a newer schema) are skipped, not fatal.
            let Ok(kind) = EntityKind::from_str(&kind_name) else {
                continue;
            };
            tables.insert(
                kind,
                TableStats {
                    count: row.get::<i64, _>("row_count"),
                    last_synced_at: parse_timestamp(row.get::<String, _>("last_synced_at"))?,
                },
            );
        }

        Ok(CacheStats { tables })
    }

    /// Clears every cached table and all metadata (logout/reset).
    pub async fn clear_all(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cache_records")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cache_meta")
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))?;

        debug!("Cleared all cache tables");
        Ok(())
    }
}

fn parse_timestamp(raw: String) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Internal(format!("Bad timestamp in cache_meta: {e}")))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalStore, StoreConfig};
    use serde_json::json;

    async fn test_store() -> LocalStore {
        LocalStore::open(StoreConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_never_populated_vs_populated_empty() {
        let repo = test_store().await.tables();

        let table = repo.get(EntityKind::Products).await.unwrap();
        assert!(!table.is_populated());
        assert!(table.records.is_empty());

        // A sync that returns zero records still counts as populated.
        repo.replace(EntityKind::Products, &[]).await.unwrap();
        let table = repo.get(EntityKind::Products).await.unwrap();
        assert!(table.is_populated());
        assert!(table.records.is_empty());
    }

    #[tokio::test]
    async fn test_replace_returns_exactly_what_was_saved() {
        let repo = test_store().await.tables();

        let records = vec![
            json!({"id": "a", "name": "Alpha"}),
            json!({"id": "b", "name": "Beta"}),
        ];
        repo.replace(EntityKind::Customers, &records).await.unwrap();

        let table = repo.get(EntityKind::Customers).await.unwrap();
        assert_eq!(table.records, records);
    }

    #[tokio::test]
    async fn test_replace_is_whole_table_not_merge() {
        let repo = test_store().await.tables();

        let first = vec![
            json!({"id": "a", "name": "Alpha"}),
            json!({"id": "b", "name": "Beta"}),
        ];
        repo.replace(EntityKind::Products, &first).await.unwrap();

        // Second snapshot drops "a" and adds "c": no trace of "a" remains.
        let second = vec![
            json!({"id": "b", "name": "Beta v2"}),
            json!({"id": "c", "name": "Gamma"}),
        ];
        repo.replace(EntityKind::Products, &second).await.unwrap();

        let table = repo.get(EntityKind::Products).await.unwrap();
        assert_eq!(table.records, second);
    }

    #[tokio::test]
    async fn test_replace_is_idempotent() {
        let repo = test_store().await.tables();

        let records = vec![json!({"id": "a", "v": 1}), json!({"id": "b", "v": 2})];
        repo.replace(EntityKind::Branches, &records).await.unwrap();
        let first = repo.get(EntityKind::Branches).await.unwrap();

        repo.replace(EntityKind::Branches, &records).await.unwrap();
        let second = repo.get(EntityKind::Branches).await.unwrap();

        assert_eq!(first.records, second.records);
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_last_occurrence() {
        let repo = test_store().await.tables();

        let records = vec![
            json!({"id": "a", "v": "old"}),
            json!({"id": "a", "v": "new"}),
        ];
        repo.replace(EntityKind::Categories, &records).await.unwrap();

        let table = repo.get(EntityKind::Categories).await.unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0]["v"], "new");

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.count(EntityKind::Categories), 1);
    }

    #[tokio::test]
    async fn test_record_without_id_fails_and_keeps_old_snapshot() {
        let repo = test_store().await.tables();

        let good = vec![json!({"id": "a"})];
        repo.replace(EntityKind::Products, &good).await.unwrap();

        let bad = vec![json!({"name": "no id here"})];
        let err = repo.replace(EntityKind::Products, &bad).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord { .. }));

        // Previous snapshot intact.
        let table = repo.get(EntityKind::Products).await.unwrap();
        assert_eq!(table.records, good);
    }

    #[tokio::test]
    async fn test_stats_cover_populated_tables_only() {
        let repo = test_store().await.tables();

        repo.replace(EntityKind::Products, &[json!({"id": "p1"})])
            .await
            .unwrap();
        repo.replace(
            EntityKind::Customers,
            &[json!({"id": "c1"}), json!({"id": "c2"})],
        )
        .await
        .unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.count(EntityKind::Products), 1);
        assert_eq!(stats.count(EntityKind::Customers), 2);
        assert_eq!(stats.count(EntityKind::Branches), 0);
        assert!(stats.get(EntityKind::Branches).is_none());
        assert!(stats.has_minimal_data());
        assert_eq!(stats.total_records(), 3);
    }

    #[tokio::test]
    async fn test_offline_gate_stats() {
        let repo = test_store().await.tables();

        let stats = repo.stats().await.unwrap();
        assert!(!stats.has_minimal_data());

        // Branches alone are not minimal data.
        repo.replace(EntityKind::Branches, &[json!({"id": "b1"})])
            .await
            .unwrap();
        let stats = repo.stats().await.unwrap();
        assert!(!stats.has_minimal_data());

        repo.replace(EntityKind::Customers, &[json!({"id": "c1"})])
            .await
            .unwrap();
        let stats = repo.stats().await.unwrap();
        assert!(stats.has_minimal_data());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let repo = test_store().await.tables();

        repo.replace(EntityKind::Products, &[json!({"id": "p1"})])
            .await
            .unwrap();
        repo.clear_all().await.unwrap();

        let table = repo.get(EntityKind::Products).await.unwrap();
        assert!(!table.is_populated());
        assert!(!repo.stats().await.unwrap().has_minimal_data());
    }

    #[tokio::test]
    async fn test_records_preserve_server_order() {
        let repo = test_store().await.tables();

        let records: Vec<_> = (0..50)
            .map(|i| json!({"id": format!("r-{i}"), "rank": i}))
            .collect();
        repo.replace(EntityKind::RecentTransactions, &records)
            .await
            .unwrap();

        let table = repo.get(EntityKind::RecentTransactions).await.unwrap();
        assert_eq!(table.records, records);
    }
}
