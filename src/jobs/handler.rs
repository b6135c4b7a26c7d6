use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{SyncError, SyncOrderPayload};
use crate::database_ops::OrderSink;
use crate::marketplace::MarketplaceClient;
use crate::reconcile::{reconcile, OrderOwner};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub orders_fetched: usize,
    pub details_fetched: usize,
    pub orders_inserted: u64,
    pub items_inserted: u64,
    /// The marketplace reported further pages, which were not fetched.
    pub more_available: bool,
}

/// Runs one `order:sync` job: list orders, fetch their details, reconcile,
/// then write orders followed by items. The first failure ends the job; rows
/// already written stay written.
#[derive(Clone)]
pub struct OrderSyncHandler {
    marketplace: Arc<dyn MarketplaceClient>,
    sink: Arc<dyn OrderSink>,
}

impl OrderSyncHandler {
    pub fn new(marketplace: Arc<dyn MarketplaceClient>, sink: Arc<dyn OrderSink>) -> Self {
        Self { marketplace, sink }
    }

    /// Entry point for a raw queue payload.
    pub async fn handle(&self, payload: &Value) -> Result<SyncSummary, SyncError> {
        let payload = SyncOrderPayload::from_value(payload)?;
        self.sync(&payload).await
    }

    #[instrument(skip(self, payload), fields(shop_id = %payload.shop_id, channel = %payload.channel))]
    pub async fn sync(&self, payload: &SyncOrderPayload) -> Result<SyncSummary, SyncError> {
        let validated = payload.validate()?;
        let shop_id = validated.shop_id.to_string();

        let listing = self
            .marketplace
            .list_orders(&shop_id, &payload.time_from, &payload.time_to)
            .await?;
        let orders = listing.data.order_list;
        let mut summary = SyncSummary {
            orders_fetched: orders.len(),
            more_available: listing.data.more,
            ..Default::default()
        };

        if orders.is_empty() {
            info!("no orders in window");
            return Ok(summary);
        }
        if summary.more_available {
            warn!(
                fetched = orders.len(),
                next_cursor = %listing.data.next_cursor,
                "marketplace reports more orders; only the first page is synced"
            );
        }

        let order_sns: Vec<String> = orders.iter().map(|o| o.order_sn.clone()).collect();
        let details = self
            .marketplace
            .order_details(&shop_id, &order_sns)
            .await?
            .data
            .order_list;
        summary.details_fetched = details.len();

        let owner = OrderOwner {
            user_id: validated.user_id,
            shop_id: validated.shop_id,
            channel: &payload.channel,
        };
        let rows = reconcile(&orders, &details, owner);

        if !rows.orders.is_empty() {
            summary.orders_inserted = self
                .sink
                .insert_orders(&rows.orders)
                .await
                .map_err(|source| SyncError::Persistence {
                    table: "orders",
                    source,
                })?;
        }
        if !rows.items.is_empty() {
            summary.items_inserted = self
                .sink
                .insert_order_items(&rows.items)
                .await
                .map_err(|source| SyncError::Persistence {
                    table: "order_items",
                    source,
                })?;
        }

        info!(
            orders = summary.orders_inserted,
            items = summary.items_inserted,
            "order sync complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{FakeMarketplace, RecordingSink};
    use crate::marketplace::{MarketplaceError, ShopeeOrder, ShopeeOrderItem};
    use serde_json::json;

    const USER: &str = "e4f82e53-d3fc-408f-b1c0-bac74d832847";
    const SHOP: &str = "ad27896f-444f-4d7e-b737-0f78c0ba75b5";

    fn payload() -> Value {
        json!({
            "user_id": USER,
            "channel": "Shopee",
            "shop_id": SHOP,
            "time_from": "12345678",
            "time_to": "87654321"
        })
    }

    fn order(sn: &str) -> ShopeeOrder {
        ShopeeOrder {
            order_sn: sn.to_string(),
            ..Default::default()
        }
    }

    fn detail(sn: &str, skus: &[&str]) -> ShopeeOrder {
        ShopeeOrder {
            order_sn: sn.to_string(),
            item_list: skus
                .iter()
                .map(|s| ShopeeOrderItem {
                    item_sku: s.to_string(),
                    model_quantity_purchased: 1,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn handler(market: &Arc<FakeMarketplace>, sink: &Arc<RecordingSink>) -> OrderSyncHandler {
        OrderSyncHandler::new(market.clone(), sink.clone())
    }

    #[tokio::test]
    async fn syncs_orders_and_items() {
        let market = Arc::new(
            FakeMarketplace::with_orders(vec![order("A"), order("B")])
                .with_details(vec![detail("B", &["X", "Y"])]),
        );
        let sink = Arc::new(RecordingSink::default());

        let summary = handler(&market, &sink).handle(&payload()).await.unwrap();

        assert_eq!(summary.orders_fetched, 2);
        assert_eq!(summary.details_fetched, 1);
        assert_eq!(summary.orders_inserted, 2);
        assert_eq!(summary.items_inserted, 2);
        assert_eq!(market.detail_requests(), vec![vec!["A".to_string(), "B".to_string()]]);

        let orders = sink.orders();
        let items = sink.items();
        assert_eq!(orders[0].shop_id.to_string(), SHOP);
        assert_eq!(orders[0].user_id.to_string(), USER);
        assert!(items.iter().all(|i| i.order_id == orders[1].id));
    }

    #[tokio::test]
    async fn empty_listing_skips_details_and_writes() {
        let market = Arc::new(FakeMarketplace::with_orders(vec![]));
        let sink = Arc::new(RecordingSink::default());

        let summary = handler(&market, &sink).handle(&payload()).await.unwrap();

        assert_eq!(summary, SyncSummary::default());
        assert!(market.detail_requests().is_empty());
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn orders_without_details_skip_item_insert() {
        let market = Arc::new(FakeMarketplace::with_orders(vec![order("A")]));
        let sink = Arc::new(RecordingSink::default());

        let summary = handler(&market, &sink).handle(&payload()).await.unwrap();

        assert_eq!(summary.orders_inserted, 1);
        assert_eq!(summary.items_inserted, 0);
        assert_eq!(sink.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_identifier_stops_before_marketplace() {
        let market = Arc::new(FakeMarketplace::with_orders(vec![order("A")]));
        let sink = Arc::new(RecordingSink::default());
        let mut body = payload();
        body["user_id"] = json!("nope");

        let err = handler(&market, &sink).handle(&body).await.unwrap_err();

        assert!(matches!(err, SyncError::InvalidIdentifier { field: "user_id", .. }));
        assert_eq!(market.list_requests(), 0);
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn undecodable_payload_is_rejected() {
        let market = Arc::new(FakeMarketplace::with_orders(vec![]));
        let sink = Arc::new(RecordingSink::default());

        let err = handler(&market, &sink).handle(&json!("garbage")).await.unwrap_err();

        assert!(matches!(err, SyncError::Payload(_)));
        assert_eq!(market.list_requests(), 0);
    }

    #[tokio::test]
    async fn detail_failure_aborts_before_writes() {
        let market = Arc::new(
            FakeMarketplace::with_orders(vec![order("A")]).failing_details(|| {
                MarketplaceError::Status {
                    endpoint: "get_order_detail",
                    status: 503,
                    body: "down".into(),
                }
            }),
        );
        let sink = Arc::new(RecordingSink::default());

        let err = handler(&market, &sink).handle(&payload()).await.unwrap_err();

        assert!(matches!(err, SyncError::Marketplace(MarketplaceError::Status { status: 503, .. })));
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn order_insert_failure_skips_items() {
        let market = Arc::new(
            FakeMarketplace::with_orders(vec![order("A")]).with_details(vec![detail("A", &["X"])]),
        );
        let sink = Arc::new(RecordingSink::failing_orders());

        let err = handler(&market, &sink).handle(&payload()).await.unwrap_err();

        assert!(matches!(err, SyncError::Persistence { table: "orders", .. }));
        assert_eq!(sink.calls(), 1);
        assert!(sink.items().is_empty());
    }

    #[tokio::test]
    async fn item_insert_failure_leaves_orders_written() {
        let market = Arc::new(
            FakeMarketplace::with_orders(vec![order("A")]).with_details(vec![detail("A", &["X"])]),
        );
        let sink = Arc::new(RecordingSink::failing_items());

        let err = handler(&market, &sink).handle(&payload()).await.unwrap_err();

        assert!(matches!(err, SyncError::Persistence { table: "order_items", .. }));
        assert_eq!(sink.orders().len(), 1);
        assert!(sink.items().is_empty());
    }

    #[tokio::test]
    async fn marketplace_receives_canonical_shop_id() {
        let market = Arc::new(
            FakeMarketplace::with_orders(vec![order("A")]).with_details(vec![detail("A", &["X"])]),
        );
        let sink = Arc::new(RecordingSink::default());
        let mut body = payload();
        body["shop_id"] = json!(format!("  {}  ", SHOP.to_uppercase()));

        handler(&market, &sink).handle(&body).await.unwrap();

        assert_eq!(market.shop_ids(), vec![SHOP.to_string(), SHOP.to_string()]);
        assert_eq!(sink.orders()[0].shop_id.to_string(), SHOP);
    }

    #[tokio::test]
    async fn more_pages_are_reported_not_followed() {
        let market = Arc::new(FakeMarketplace::with_orders(vec![order("A")]).with_more(true));
        let sink = Arc::new(RecordingSink::default());

        let summary = handler(&market, &sink).handle(&payload()).await.unwrap();

        assert!(summary.more_available);
        assert_eq!(market.list_requests(), 1);
    }
}
