//! SQLite implementation of OrderStore.

use crate::domain::{
    FulfillmentStatus, LineItem, Order, OrderUpdate, PaymentProvider, PaymentStatus,
    ShippingAddress,
};
use crate::storage::{
    DeleteOutcome, OrderFilter, OrderStore, SortField, StorageError, page_offset,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};

const ORDER_COLUMNS: &str = "id, order_number, items, subtotal, shipping, total_amount, currency, \
     buyer_email, shipping_address, payment_provider, payment_status, payment_id, \
     capture_reference, fulfillment_status, tracking_number, notes, created_at, updated_at";

/// SqliteStorage implements OrderStore using SQLite.
pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

/// SqliteStorageConfig holds SQLite storage configuration.
#[derive(Debug, Clone)]
pub struct SqliteStorageConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
}

impl Default for SqliteStorageConfig {
    fn default() -> Self {
        Self {
            path: "ecostyle.db".to_string(),
            max_connections: 5,
        }
    }
}

impl SqliteStorage {
    /// Creates a new SQLite storage instance.
    pub async fn new(config: SqliteStorageConfig) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let storage = Self { pool };

        storage.migrate().await?;

        info!(path = %config.path, "SQLite storage initialized");
        Ok(storage)
    }

    /// Creates the schema if it does not exist yet.
    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                order_number TEXT NOT NULL UNIQUE,
                items TEXT NOT NULL,
                subtotal TEXT NOT NULL,
                shipping TEXT NOT NULL,
                total_amount TEXT NOT NULL,
                currency TEXT NOT NULL,
                buyer_email TEXT,
                shipping_address TEXT,
                payment_provider TEXT NOT NULL,
                payment_status TEXT NOT NULL,
                payment_id TEXT UNIQUE,
                capture_reference TEXT,
                fulfillment_status TEXT NOT NULL,
                tracking_number TEXT,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_orders_buyer_email ON orders(buyer_email)",
            "CREATE INDEX IF NOT EXISTS idx_orders_payment_status ON orders(payment_status)",
            "CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_orders_capture_reference ON orders(capture_reference)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<Order>, StorageError> {
        let sql = format!("SELECT {} FROM orders WHERE {} = ?", ORDER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(parse_order_row).transpose()
    }
}

/// Formats timestamps with a fixed width so they sort lexicographically.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Maps unique-constraint violations to `StorageError::Duplicate`.
fn map_write_error(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StorageError::Duplicate(db.message().to_string())
        }
        other => StorageError::Database(other),
    }
}

/// Money is stored as TEXT, so amounts are cast for numeric ordering.
fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::CreatedAt => "created_at",
        SortField::UpdatedAt => "updated_at",
        SortField::TotalAmount => "CAST(total_amount AS REAL)",
        SortField::OrderNumber => "order_number",
        SortField::PaymentStatus => "payment_status",
    }
}

fn to_json<T: serde::Serialize>(value: &T, field: &str) -> Result<String, StorageError> {
    serde_json::to_string(value)
        .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", field, e)))
}

#[async_trait]
impl OrderStore for SqliteStorage {
    async fn insert(&self, order: &Order) -> Result<Order, StorageError> {
        let items = to_json(&order.items, "items")?;
        let address = order
            .shipping_address
            .as_ref()
            .map(|a| to_json(a, "shipping_address"))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, items, subtotal, shipping, total_amount, currency,
                buyer_email, shipping_address, payment_provider, payment_status, payment_id,
                capture_reference, fulfillment_status, tracking_number, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(items)
        .bind(order.subtotal.to_string())
        .bind(order.shipping.to_string())
        .bind(order.total_amount.to_string())
        .bind(&order.currency)
        .bind(&order.buyer_email)
        .bind(address)
        .bind(order.payment_provider.to_string())
        .bind(order.payment_status.to_string())
        .bind(&order.payment_id)
        .bind(&order.capture_reference)
        .bind(order.fulfillment_status.to_string())
        .bind(&order.tracking_number)
        .bind(&order.notes)
        .bind(format_timestamp(order.created_at))
        .bind(format_timestamp(order.updated_at))
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        debug!(
            id = %order.id,
            order_number = %order.order_number,
            payment_status = %order.payment_status,
            "Order saved"
        );

        Ok(order.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StorageError> {
        self.find_one("id", id).await
    }

    async fn find_by_order_number(&self, number: &str) -> Result<Option<Order>, StorageError> {
        self.find_one("order_number", number).await
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, StorageError> {
        self.find_one("payment_id", payment_id).await
    }

    async fn find_by_capture_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StorageError> {
        self.find_one("capture_reference", reference).await
    }

    async fn update_fields(
        &self,
        id: &str,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, StorageError> {
        let address = update
            .shipping_address
            .as_ref()
            .map(|a| to_json(a, "shipping_address"))
            .transpose()?;

        // Single statement, so each update is atomic without explicit locking
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                payment_status = COALESCE(?1, payment_status),
                fulfillment_status = COALESCE(?2, fulfillment_status),
                payment_id = COALESCE(?3, payment_id),
                capture_reference = COALESCE(?4, capture_reference),
                buyer_email = COALESCE(?5, buyer_email),
                shipping_address = COALESCE(?6, shipping_address),
                tracking_number = COALESCE(?7, tracking_number),
                notes = COALESCE(?8, notes),
                updated_at = ?9
            WHERE id = ?10
            "#,
        )
        .bind(update.payment_status.map(|s| s.to_string()))
        .bind(update.fulfillment_status.map(|s| s.to_string()))
        .bind(&update.payment_id)
        .bind(&update.capture_reference)
        .bind(&update.buyer_email)
        .bind(address)
        .bind(&update.tracking_number)
        .bind(&update.notes)
        .bind(format_timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        debug!(id = %id, "Order updated");
        self.find_by_id(id).await
    }

    async fn delete_unless_completed(&self, id: &str) -> Result<DeleteOutcome, StorageError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ? AND payment_status != ?")
            .bind(id)
            .bind(PaymentStatus::Completed.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            debug!(id = %id, "Order deleted");
            return Ok(DeleteOutcome::Deleted);
        }

        let remaining: Option<(String,)> = sqlx::query_as("SELECT id FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match remaining {
            Some(_) => DeleteOutcome::Completed,
            None => DeleteOutcome::NotFound,
        })
    }

    async fn list(
        &self,
        filter: &OrderFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Order>, u64), StorageError> {
        let status = filter.payment_status.map(|s| s.to_string());
        let offset = i64::try_from(page_offset(page, limit))
            .map_err(|_| StorageError::InvalidData("page out of range".to_string()))?;

        let sql = format!(
            r#"
            SELECT {} FROM orders
            WHERE (?1 IS NULL OR buyer_email = ?1) AND (?2 IS NULL OR payment_status = ?2)
            ORDER BY {} {}, created_at DESC, rowid DESC
            LIMIT ?3 OFFSET ?4
            "#,
            ORDER_COLUMNS,
            sort_column(filter.sort.field),
            if filter.sort.descending { "DESC" } else { "ASC" }
        );

        let rows = sqlx::query(&sql)
            .bind(&filter.buyer_email)
            .bind(&status)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let orders = rows.iter().map(parse_order_row).collect::<Result<Vec<_>, _>>()?;

        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as count FROM orders
            WHERE (?1 IS NULL OR buyer_email = ?1) AND (?2 IS NULL OR payment_status = ?2)
            "#,
        )
        .bind(&filter.buyer_email)
        .bind(&status)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;
        Ok((orders, u64::try_from(count).unwrap_or_default()))
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}

fn parse_decimal(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Decimal, StorageError> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw)
        .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", column, e)))
}

fn parse_timestamp(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, StorageError> {
    let raw: String = row.try_get(column)?;
    Ok(DateTime::parse_from_rfc3339(&raw)
        .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", column, e)))?
        .with_timezone(&Utc))
}

/// Parses an order from a database row.
fn parse_order_row(row: &sqlx::sqlite::SqliteRow) -> Result<Order, StorageError> {
    let items_json: String = row.try_get("items")?;
    let items: Vec<LineItem> = serde_json::from_str(&items_json)
        .map_err(|e| StorageError::InvalidData(format!("Invalid items: {}", e)))?;

    let address_json: Option<String> = row.try_get("shipping_address")?;
    let shipping_address = address_json
        .map(|json| serde_json::from_str::<ShippingAddress>(&json))
        .transpose()
        .map_err(|e| StorageError::InvalidData(format!("Invalid shipping_address: {}", e)))?;

    let provider: String = row.try_get("payment_provider")?;
    let payment_provider = match provider.as_str() {
        "paypal" => PaymentProvider::PayPal,
        other => {
            return Err(StorageError::InvalidData(format!(
                "Unknown payment provider: {}",
                other
            )));
        }
    };

    let payment_status_str: String = row.try_get("payment_status")?;
    let payment_status =
        PaymentStatus::from_str(&payment_status_str).map_err(StorageError::InvalidData)?;

    let fulfillment_str: String = row.try_get("fulfillment_status")?;
    let fulfillment_status =
        FulfillmentStatus::from_str(&fulfillment_str).map_err(StorageError::InvalidData)?;

    Ok(Order {
        id: row.try_get("id")?,
        order_number: row.try_get("order_number")?,
        items,
        subtotal: parse_decimal(row, "subtotal")?,
        shipping: parse_decimal(row, "shipping")?,
        total_amount: parse_decimal(row, "total_amount")?,
        currency: row.try_get("currency")?,
        buyer_email: row.try_get("buyer_email")?,
        shipping_address,
        payment_provider,
        payment_status,
        payment_id: row.try_get("payment_id")?,
        capture_reference: row.try_get("capture_reference")?,
        fulfillment_status,
        tracking_number: row.try_get("tracking_number")?,
        notes: row.try_get("notes")?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}
