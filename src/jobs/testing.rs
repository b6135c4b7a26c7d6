//! In-memory collaborators for exercising the handler without network or database.
use async_trait::async_trait;
use std::sync::Mutex;

use crate::database_ops::OrderSink;
use crate::marketplace::models::{OrderDetailData, OrderListData};
use crate::marketplace::{
    MarketplaceClient, MarketplaceError, ShopeeOrder, ShopeeOrderDetail, ShopeeResponse,
};
use crate::reconcile::{Order, OrderItem};

#[derive(Default)]
pub struct FakeMarketplace {
    orders: Vec<ShopeeOrder>,
    details: Vec<ShopeeOrder>,
    more: bool,
    detail_error: Option<fn() -> MarketplaceError>,
    list_requests: Mutex<usize>,
    detail_requests: Mutex<Vec<Vec<String>>>,
    shop_ids: Mutex<Vec<String>>,
}

impl FakeMarketplace {
    pub fn with_orders(orders: Vec<ShopeeOrder>) -> Self {
        Self {
            orders,
            ..Default::default()
        }
    }

    pub fn with_details(mut self, details: Vec<ShopeeOrder>) -> Self {
        self.details = details;
        self
    }

    pub fn with_more(mut self, more: bool) -> Self {
        self.more = more;
        self
    }

    pub fn failing_details(mut self, err: fn() -> MarketplaceError) -> Self {
        self.detail_error = Some(err);
        self
    }

    pub fn list_requests(&self) -> usize {
        *self.list_requests.lock().unwrap()
    }

    pub fn detail_requests(&self) -> Vec<Vec<String>> {
        self.detail_requests.lock().unwrap().clone()
    }

    /// Shop ids sent with every call, list then detail.
    pub fn shop_ids(&self) -> Vec<String> {
        self.shop_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketplaceClient for FakeMarketplace {
    async fn list_orders(
        &self,
        shop_id: &str,
        _time_from: &str,
        _time_to: &str,
    ) -> Result<ShopeeResponse, MarketplaceError> {
        self.shop_ids.lock().unwrap().push(shop_id.to_string());
        *self.list_requests.lock().unwrap() += 1;
        Ok(ShopeeResponse {
            data: OrderListData {
                order_list: self.orders.clone(),
                more: self.more,
                next_cursor: String::new(),
            },
            ..Default::default()
        })
    }

    async fn order_details(
        &self,
        shop_id: &str,
        order_sns: &[String],
    ) -> Result<ShopeeOrderDetail, MarketplaceError> {
        self.shop_ids.lock().unwrap().push(shop_id.to_string());
        self.detail_requests.lock().unwrap().push(order_sns.to_vec());
        if let Some(err) = self.detail_error {
            return Err(err());
        }
        Ok(ShopeeOrderDetail {
            data: OrderDetailData {
                order_list: self.details.clone(),
            },
            ..Default::default()
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    fail_orders: bool,
    fail_items: bool,
    calls: Mutex<usize>,
    orders: Mutex<Vec<Order>>,
    items: Mutex<Vec<OrderItem>>,
}

impl RecordingSink {
    pub fn failing_orders() -> Self {
        Self {
            fail_orders: true,
            ..Default::default()
        }
    }

    pub fn failing_items() -> Self {
        Self {
            fail_items: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    pub fn items(&self) -> Vec<OrderItem> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderSink for RecordingSink {
    async fn insert_orders(&self, rows: &[Order]) -> Result<u64, sqlx::Error> {
        *self.calls.lock().unwrap() += 1;
        if self.fail_orders {
            return Err(sqlx::Error::Protocol("orders table unavailable".into()));
        }
        self.orders.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn insert_order_items(&self, rows: &[OrderItem]) -> Result<u64, sqlx::Error> {
        *self.calls.lock().unwrap() += 1;
        if self.fail_items {
            return Err(sqlx::Error::Protocol("order_items table unavailable".into()));
        }
        self.items.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}
