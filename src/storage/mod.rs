//! Storage interfaces and implementations for persisting orders.

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::{SqliteStorage, SqliteStorageConfig};

use crate::domain::{Order, OrderUpdate, PaymentStatus};
use async_trait::async_trait;

/// OrderFilter narrows an order listing. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    /// Lower-cased buyer email.
    pub buyer_email: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub sort: OrderSort,
}

/// SortField names the order attributes a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    TotalAmount,
    OrderNumber,
    PaymentStatus,
}

impl SortField {
    pub const ALL: [SortField; 5] = [
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::TotalAmount,
        SortField::OrderNumber,
        SortField::PaymentStatus,
    ];
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortField::CreatedAt => write!(f, "createdAt"),
            SortField::UpdatedAt => write!(f, "updatedAt"),
            SortField::TotalAmount => write!(f, "totalAmount"),
            SortField::OrderNumber => write!(f, "orderNumber"),
            SortField::PaymentStatus => write!(f, "paymentStatus"),
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|field| field.to_string() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid sortBy. Must be one of: {}",
                    SortField::ALL.map(|f| f.to_string()).join(", ")
                )
            })
    }
}

/// OrderSort orders a listing. Ties fall back to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for OrderSort {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

/// DeleteOutcome reports what a conditional delete did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// The order exists but its payment was captured, so it was kept.
    Completed,
}

/// OrderStore defines the interface for persisting orders.
///
/// Every mutation touches a single order and is atomic on its own; there is
/// no cross-order locking.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert persists a new order.
    /// Fails with `Duplicate` if the order number or gateway payment id is taken.
    async fn insert(&self, order: &Order) -> Result<Order, StorageError>;

    /// FindByID retrieves an order by its internal id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StorageError>;

    /// FindByOrderNumber retrieves an order by its human-readable number.
    async fn find_by_order_number(&self, number: &str) -> Result<Option<Order>, StorageError>;

    /// FindByPaymentID retrieves the order linked to a gateway payment intent.
    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, StorageError>;

    /// FindByCaptureReference retrieves the order holding a gateway capture reference.
    async fn find_by_capture_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StorageError>;

    /// UpdateFields applies a partial update and returns the updated order,
    /// or None if no order has this id.
    async fn update_fields(
        &self,
        id: &str,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, StorageError>;

    /// DeleteUnlessCompleted removes an order in one atomic step, unless its
    /// payment status is completed at the moment of deletion.
    async fn delete_unless_completed(&self, id: &str) -> Result<DeleteOutcome, StorageError>;

    /// List returns one page of matching orders in the filter's sort order,
    /// plus the total match count.
    async fn list(
        &self,
        filter: &OrderFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Order>, u64), StorageError>;

    /// Close closes the storage connection.
    async fn close(&self) -> Result<(), StorageError>;
}

/// StorageError represents errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Number of rows to skip for a 1-based page.
pub(crate) fn page_offset(page: u32, limit: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(limit)
}
