pub mod db;
pub mod queue;

use async_trait::async_trait;

use crate::reconcile::{Order, OrderItem};

/// Destination for reconciled rows. Each call is its own unit of work; nothing
/// ties the order insert to the item insert that follows it.
#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn insert_orders(&self, rows: &[Order]) -> Result<u64, sqlx::Error>;
    async fn insert_order_items(&self, rows: &[OrderItem]) -> Result<u64, sqlx::Error>;
}
