//! In-memory implementation of OrderStore.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Order, OrderUpdate, PaymentStatus};
use crate::storage::{
    DeleteOutcome, OrderFilter, OrderStore, SortField, StorageError, page_offset,
};

/// A thread-safe in-memory order store.
///
/// Used when SQLite storage is disabled and in tests. Orders are lost on restart.
#[derive(Default, Clone)]
pub struct MemoryStorage {
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl MemoryStorage {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryStorage {
    async fn insert(&self, order: &Order) -> Result<Order, StorageError> {
        let mut orders = self.orders.write().await;

        if orders.contains_key(&order.id) {
            return Err(StorageError::Duplicate(format!("order id {}", order.id)));
        }
        if orders.values().any(|o| o.order_number == order.order_number) {
            return Err(StorageError::Duplicate(format!(
                "order number {}",
                order.order_number
            )));
        }
        if let Some(ref payment_id) = order.payment_id {
            if orders.values().any(|o| o.payment_id.as_ref() == Some(payment_id)) {
                return Err(StorageError::Duplicate(format!("payment id {}", payment_id)));
            }
        }

        orders.insert(order.id.clone(), order.clone());
        Ok(order.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StorageError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn find_by_order_number(&self, number: &str) -> Result<Option<Order>, StorageError> {
        let orders = self.orders.read().await;
        Ok(orders.values().find(|o| o.order_number == number).cloned())
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, StorageError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn find_by_capture_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StorageError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.capture_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn update_fields(
        &self,
        id: &str,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, StorageError> {
        let mut orders = self.orders.write().await;

        if let Some(ref payment_id) = update.payment_id {
            let taken = orders
                .values()
                .any(|o| o.id != id && o.payment_id.as_ref() == Some(payment_id));
            if taken {
                return Err(StorageError::Duplicate(format!("payment id {}", payment_id)));
            }
        }

        Ok(orders.get_mut(id).map(|order| {
            order.apply(update);
            order.clone()
        }))
    }

    async fn delete_unless_completed(&self, id: &str) -> Result<DeleteOutcome, StorageError> {
        let mut orders = self.orders.write().await;

        match orders.get(id) {
            None => Ok(DeleteOutcome::NotFound),
            Some(order) if order.payment_status == PaymentStatus::Completed => {
                Ok(DeleteOutcome::Completed)
            }
            Some(_) => {
                orders.remove(id);
                Ok(DeleteOutcome::Deleted)
            }
        }
    }

    async fn list(
        &self,
        filter: &OrderFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Order>, u64), StorageError> {
        let orders = self.orders.read().await;

        let mut matching: Vec<&Order> = orders
            .values()
            .filter(|o| {
                filter
                    .buyer_email
                    .as_ref()
                    .is_none_or(|email| o.buyer_email.as_ref() == Some(email))
            })
            .filter(|o| {
                filter
                    .payment_status
                    .is_none_or(|status| o.payment_status == status)
            })
            .collect();

        matching.sort_by(|a, b| {
            let ordering = match filter.sort.field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::TotalAmount => a.total_amount.cmp(&b.total_amount),
                SortField::OrderNumber => a.order_number.cmp(&b.order_number),
                SortField::PaymentStatus => a
                    .payment_status
                    .to_string()
                    .cmp(&b.payment_status.to_string()),
            };
            let ordering = if filter.sort.descending {
                ordering.reverse()
            } else {
                ordering
            };
            ordering.then_with(|| b.created_at.cmp(&a.created_at))
        });

        let total = matching.len() as u64;
        let skip = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let page_items = matching
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok((page_items, total))
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
