use serde::{Deserialize, Serialize};

/// Envelope returned by `GET /api/v2/order/get_order_list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopeeResponse {
    pub code: String,
    pub message: String,
    pub data: OrderListData,
    pub request_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderListData {
    pub order_list: Vec<ShopeeOrder>,
    /// Set when more pages exist; only the first page is consumed.
    pub more: bool,
    pub next_cursor: String,
}

/// Envelope returned by `GET /api/v2/order/get_order_detail`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopeeOrderDetail {
    pub code: String,
    pub message: String,
    pub data: OrderDetailData,
    pub request_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDetailData {
    pub order_list: Vec<ShopeeOrder>,
}

/// One order as reported by the marketplace. Both endpoints share this shape;
/// only the detail endpoint fills `item_list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopeeOrder {
    pub order_sn: String,
    pub order_status: String,
    pub create_time: i64,
    pub update_time: i64,
    pub buyer_username: String,
    pub recipient_address: ShopeeAddress,
    pub item_list: Vec<ShopeeOrderItem>,
    pub payment_method: String,
    pub total_amount: f64,
    pub shipping_carrier: String,
    pub tracking_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopeeAddress {
    pub name: String,
    pub phone: String,
    pub full_address: String,
    pub district: String,
    pub city: String,
    pub zipcode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopeeOrderItem {
    pub item_id: i64,
    pub item_name: String,
    pub item_sku: String,
    pub model_name: String,
    pub model_quantity_purchased: i32,
    pub model_original_price: f64,
    pub model_discounted_price: f64,
}
