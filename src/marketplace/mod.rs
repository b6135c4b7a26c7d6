//! Marketplace read side: the order list and order detail calls the sync job makes.
pub mod models;
pub mod provider;

pub use models::{ShopeeAddress, ShopeeOrder, ShopeeOrderDetail, ShopeeOrderItem, ShopeeResponse};
pub use provider::ShopeeProvider;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("{endpoint}: transport failure: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint}: unexpected HTTP status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("{endpoint}: could not decode response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Read operations the order sync needs from a marketplace.
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    /// First page of orders for `shop_id` created within `[time_from, time_to]`.
    async fn list_orders(
        &self,
        shop_id: &str,
        time_from: &str,
        time_to: &str,
    ) -> Result<ShopeeResponse, MarketplaceError>;

    /// Full detail, including line items, for the given order serial numbers.
    async fn order_details(
        &self,
        shop_id: &str,
        order_sns: &[String],
    ) -> Result<ShopeeOrderDetail, MarketplaceError>;
}
