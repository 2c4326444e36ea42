// Hosted-table storage behind a trait, with an in-memory implementation.
//
// Subscription upserts are keyed by subscription id, which makes
// concurrent redeliveries of the same event idempotent. Ordering between
// different events for one subscription is the webhook handler's job
// (it compares event clocks before writing).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use bankcheck_billing::types::{OrderRow, SubscriptionRow};

/// Storage error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Row not found")]
    NotFound,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// CRUD over the hosted tables the functions write to.
#[async_trait]
pub trait TableStore: Send + Sync {
    // ── Subscriptions ───────────────────────────────────────────────
    async fn upsert_subscription(&self, row: SubscriptionRow) -> Result<(), StoreError>;
    async fn find_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRow>, StoreError>;
    /// Most recent active-or-trialing subscription for a customer,
    /// ordered by period end descending.
    async fn latest_active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<SubscriptionRow>, StoreError>;

    // ── Orders ──────────────────────────────────────────────────────
    async fn insert_order(&self, row: OrderRow) -> Result<(), StoreError>;
    async fn find_order(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<OrderRow>, StoreError>;

    // ── Customer mapping ────────────────────────────────────────────
    async fn link_customer(&self, user_id: &str, customer_id: &str) -> Result<(), StoreError>;
    async fn user_for_customer(&self, customer_id: &str) -> Result<Option<String>, StoreError>;
    async fn customer_for_user(&self, user_id: &str) -> Result<Option<String>, StoreError>;

    // ── Generic rows (admin endpoints) ──────────────────────────────
    async fn list_rows(&self, table: &str) -> Result<Vec<serde_json::Value>, StoreError>;
    async fn insert_row(
        &self,
        table: &str,
        row: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError>;
    async fn update_row(
        &self,
        table: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError>;
    async fn delete_row(&self, table: &str, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    subscriptions: HashMap<String, SubscriptionRow>,
    orders: Vec<OrderRow>,
    customer_to_user: HashMap<String, String>,
    user_to_customer: HashMap<String, String>,
    rows: HashMap<String, Vec<serde_json::Value>>,
}

/// In-memory table store.
///
/// All data lives in a `HashMap` behind `tokio::sync::RwLock`; it is
/// lost when the store is dropped. Used in tests and demo deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscription rows (for tests).
    pub async fn subscription_count(&self) -> usize {
        self.tables.read().await.subscriptions.len()
    }

    /// Number of order rows (for tests).
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn upsert_subscription(&self, row: SubscriptionRow) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .subscriptions
            .insert(row.subscription_id.clone(), row);
        Ok(())
    }

    async fn find_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRow>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.subscriptions.get(subscription_id).cloned())
    }

    async fn latest_active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<SubscriptionRow>, StoreError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&SubscriptionRow> = tables
            .subscriptions
            .values()
            .filter(|s| s.customer_id == customer_id && s.status.is_active())
            .collect();
        matching.sort_by(|a, b| b.current_period_end.cmp(&a.current_period_end));
        Ok(matching.first().map(|s| (*s).clone()))
    }

    async fn insert_order(&self, row: OrderRow) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.orders.push(row);
        Ok(())
    }

    async fn find_order(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<OrderRow>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .find(|o| o.checkout_session_id == checkout_session_id)
            .cloned())
    }

    async fn link_customer(&self, user_id: &str, customer_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .customer_to_user
            .insert(customer_id.to_string(), user_id.to_string());
        tables
            .user_to_customer
            .insert(user_id.to_string(), customer_id.to_string());
        Ok(())
    }

    async fn user_for_customer(&self, customer_id: &str) -> Result<Option<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.customer_to_user.get(customer_id).cloned())
    }

    async fn customer_for_user(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.user_to_customer.get(user_id).cloned())
    }

    async fn list_rows(&self, table: &str) -> Result<Vec<serde_json::Value>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.rows.get(table).cloned().unwrap_or_default())
    }

    async fn insert_row(
        &self,
        table: &str,
        mut row: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError> {
        let obj = row
            .as_object_mut()
            .ok_or_else(|| StoreError::Serialization("Row must be a JSON object".into()))?;
        if !obj.contains_key("id") {
            obj.insert(
                "id".to_string(),
                serde_json::Value::String(bankcheck_core::id::generate_id()),
            );
        }
        let mut tables = self.tables.write().await;
        tables
            .rows
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update_row(
        &self,
        table: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError> {
        let patch_obj = patch
            .as_object()
            .ok_or_else(|| StoreError::Serialization("Patch must be a JSON object".into()))?;

        let mut tables = self.tables.write().await;
        let rows = tables.rows.get_mut(table).ok_or(StoreError::NotFound)?;
        let row = rows
            .iter_mut()
            .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id))
            .ok_or(StoreError::NotFound)?;

        if let Some(obj) = row.as_object_mut() {
            for (key, value) in patch_obj {
                if key != "id" {
                    obj.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(row.clone())
    }

    async fn delete_row(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let rows = tables.rows.get_mut(table).ok_or(StoreError::NotFound)?;
        let before = rows.len();
        rows.retain(|r| r.get("id").and_then(|v| v.as_str()) != Some(id));
        if rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
