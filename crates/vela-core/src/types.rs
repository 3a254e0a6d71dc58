//! # Domain Types
//!
//! Entity records cached on-device, plus the [`EntityKind`] registry that
//! names every cache table.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cached Entities                                 │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │   SaleRecord    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  sku            │   │  name           │   │  receipt_number │       │
//! │  │  name           │   │  phone          │   │  customer_id    │       │
//! │  │  price_cents    │   │  balance_cents  │   │  total_cents    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Branch      │   │    Category     │   │ PaymentAccount  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Every entity implements CacheRecord: a stable string id plus the       │
//! │  EntityKind of the table it lives in.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// =============================================================================
// Entity Kind
// =============================================================================

/// The six entity tables the offline cache maintains.
///
/// Acts as the registry for table names: the Local Store, Sync Engine, and
/// Search Job Manager all address tables through this enum rather than raw
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Products,
    Customers,
    Branches,
    Categories,
    PaymentAccounts,
    RecentTransactions,
}

impl EntityKind {
    /// All kinds, in the order the Sync Engine refreshes them.
    ///
    /// Products and customers lead because the UI cannot do anything useful
    /// without them; the rest sync concurrently afterwards.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Products,
        EntityKind::Customers,
        EntityKind::Branches,
        EntityKind::Categories,
        EntityKind::PaymentAccounts,
        EntityKind::RecentTransactions,
    ];

    /// Stable table name used in storage and on the remote API path.
    pub const fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Products => "products",
            EntityKind::Customers => "customers",
            EntityKind::Branches => "branches",
            EntityKind::Categories => "categories",
            EntityKind::PaymentAccounts => "payment_accounts",
            EntityKind::RecentTransactions => "recent_transactions",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(EntityKind::Products),
            "customers" => Ok(EntityKind::Customers),
            "branches" => Ok(EntityKind::Branches),
            "categories" => Ok(EntityKind::Categories),
            "payment_accounts" => Ok(EntityKind::PaymentAccounts),
            "recent_transactions" => Ok(EntityKind::RecentTransactions),
            other => Err(CoreError::UnknownEntityKind(other.to_string())),
        }
    }
}

// =============================================================================
// Cache Record Trait
// =============================================================================

/// A record that can live in the offline cache.
///
/// The Local Store keys every row by `(kind, id)`; a re-sync replaces the
/// whole table atomically, so records never need merge logic.
pub trait CacheRecord {
    /// The table this record belongs to.
    const KIND: EntityKind;

    /// Stable unique identifier within the table.
    fn record_id(&self) -> &str;
}

// =============================================================================
// Page
// =============================================================================

/// One page of a paginated remote response.
///
/// Records are kept as raw JSON: the cache stores them opaquely and the typed
/// layer ([`CacheRecord`] implementors) deserializes on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Records in this page.
    pub records: Vec<serde_json::Value>,

    /// Total records available on the server (across all pages).
    pub total_count: u64,
}

impl Page {
    /// An empty page with zero total.
    pub fn empty() -> Self {
        Page {
            records: Vec::new(),
            total_count: 0,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale or trade-in pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown in pickers and receipts.
    pub name: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Category this product belongs to.
    pub category_id: Option<String>,

    /// Current stock level, if tracked.
    pub stock: Option<i64>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// Last server-side update.
    pub updated_at: DateTime<Utc>,
}

impl CacheRecord for Product {
    const KIND: EntityKind = EntityKind::Products;

    fn record_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record for the CRM picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Full display name.
    pub name: String,

    /// Contact phone, if known.
    pub phone: Option<String>,

    /// Contact email, if known.
    pub email: Option<String>,

    /// Store-credit balance in cents (negative means the customer owes).
    pub balance_cents: i64,

    /// Last server-side update.
    pub updated_at: DateTime<Utc>,
}

impl CacheRecord for Customer {
    const KIND: EntityKind = EntityKind::Customers;

    fn record_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Branch
// =============================================================================

/// A store branch/location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
}

impl CacheRecord for Branch {
    const KIND: EntityKind = EntityKind::Branches;

    fn record_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Category
// =============================================================================

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl CacheRecord for Category {
    const KIND: EntityKind = EntityKind::Categories;

    fn record_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Payment Account
// =============================================================================

/// A payment account (cash drawer, bank account, mobile wallet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAccount {
    pub id: String,
    pub name: String,

    /// Account kind: "cash", "bank", "wallet".
    pub kind: String,
}

impl CacheRecord for PaymentAccount {
    const KIND: EntityKind = EntityKind::PaymentAccounts;

    fn record_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Sale Record (recent transaction)
// =============================================================================

/// A recently completed sale, cached for offline receipt lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable receipt number.
    pub receipt_number: String,

    /// Customer this sale belongs to, if any.
    pub customer_id: Option<String>,

    /// Sale total in cents.
    pub total_cents: i64,

    /// When the sale was completed.
    pub created_at: DateTime<Utc>,
}

impl CacheRecord for SaleRecord {
    const KIND: EntityKind = EntityKind::RecentTransactions;

    fn record_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
