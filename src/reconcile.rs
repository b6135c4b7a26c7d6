//! Order reconciliation: turns marketplace orders and their detail records into
//! `orders` / `order_items` rows keyed by a freshly minted internal id.
//!
//! Details are matched to orders by `order_sn` through a lookup built once per
//! call, so cost stays linear in `orders + details`. When `details` carries the
//! same `order_sn` more than once, the last entry wins.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::marketplace::{ShopeeOrder, ShopeeOrderItem};

/// Currency tag stamped on every order; the marketplace record does not carry one.
pub const ORDER_CURRENCY: &str = "THB";

/// Row destined for the `orders` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shop_id: Uuid,
    pub channel: String,
    pub external_order_id: String,
    pub status: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    pub total_price: f64,
    pub currency: String,
}

/// Row destined for the `order_items` table. `order_id` is the parent's internal id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub order_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
}

/// Owner and channel applied uniformly to every reconciled order.
#[derive(Debug, Clone, Copy)]
pub struct OrderOwner<'a> {
    pub user_id: Uuid,
    pub shop_id: Uuid,
    pub channel: &'a str,
}

#[derive(Debug, Default)]
pub struct Reconciled {
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
}

pub fn reconcile(orders: &[ShopeeOrder], details: &[ShopeeOrder], owner: OrderOwner<'_>) -> Reconciled {
    let items_by_sn: HashMap<&str, &[ShopeeOrderItem]> = details
        .iter()
        .map(|d| (d.order_sn.as_str(), d.item_list.as_slice()))
        .collect();

    let mut out = Reconciled {
        orders: Vec::with_capacity(orders.len()),
        items: Vec::new(),
    };

    for o in orders {
        let order_id = Uuid::new_v4();
        out.orders.push(Order {
            id: order_id,
            user_id: owner.user_id,
            shop_id: owner.shop_id,
            channel: owner.channel.to_string(),
            external_order_id: o.order_sn.clone(),
            status: o.order_status.clone(),
            customer_name: o.buyer_username.clone(),
            customer_address: o.recipient_address.full_address.clone(),
            customer_phone: o.recipient_address.phone.clone(),
            total_price: o.total_amount,
            currency: ORDER_CURRENCY.to_string(),
        });

        if let Some(items) = items_by_sn.get(o.order_sn.as_str()) {
            out.items.extend(items.iter().map(|item| OrderItem {
                order_id,
                sku: item.item_sku.clone(),
                name: item.item_name.clone(),
                quantity: item.model_quantity_purchased,
                price: item.model_original_price,
            }));
        }
    }

    out
}
