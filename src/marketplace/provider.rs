use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{MarketplaceClient, MarketplaceError, ShopeeOrderDetail, ShopeeResponse};
use crate::util::env::{env_opt, env_parse};

/// Mock Open API endpoint the worker talks to unless `SHOPEE_BASE_URL` says otherwise.
pub const DEFAULT_BASE_URL: &str = "https://d14452c0-14dd-48ba-b5c0-fc4efc3147a3.mock.pstmn.io";
pub const DEFAULT_PAGE_SIZE: u32 = 20;

const ORDER_LIST_PATH: &str = "/api/v2/order/get_order_list";
const ORDER_DETAIL_PATH: &str = "/api/v2/order/get_order_detail";

fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

/// Shopee Open API v2 order reader.
///
/// Key endpoints:
/// - GET /api/v2/order/get_order_list?shop_id=&time_from=&time_to=&page_size=
/// - GET /api/v2/order/get_order_detail?shop_id=&order_sn_list=a,b,c
#[derive(Debug, Clone)]
pub struct ShopeeProvider {
    base_url: String,
    page_size: u32,
    http: Client,
}

impl ShopeeProvider {
    pub fn new(base_url: Option<&str>, timeout_secs: Option<u64>) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = timeout_secs.unwrap_or(15);
        let http = Client::builder()
            .user_agent("order-sync/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
            http,
        })
    }

    /// Builds a provider from `SHOPEE_BASE_URL`, `SHOPEE_TIMEOUT_SECS` and `SHOPEE_PAGE_SIZE`.
    pub fn from_env() -> Result<Self> {
        let base_url = env_opt("SHOPEE_BASE_URL");
        let timeout = env_parse::<u64>("SHOPEE_TIMEOUT_SECS", 15);
        let page_size = env_parse::<u32>("SHOPEE_PAGE_SIZE", DEFAULT_PAGE_SIZE);
        Ok(Self::new(base_url.as_deref(), Some(timeout))?.with_page_size(page_size))
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketplaceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(endpoint, %url, "marketplace request");

        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| MarketplaceError::Transport { endpoint, source })?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|source| MarketplaceError::Transport { endpoint, source })?;

        if !status.is_success() {
            return Err(MarketplaceError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate_for_log(String::from_utf8_lossy(&body).into_owned(), 256),
            });
        }

        serde_json::from_slice(&body).map_err(|source| MarketplaceError::Decode { endpoint, source })
    }
}

#[async_trait]
impl MarketplaceClient for ShopeeProvider {
    #[instrument(skip(self))]
    async fn list_orders(
        &self,
        shop_id: &str,
        time_from: &str,
        time_to: &str,
    ) -> Result<ShopeeResponse, MarketplaceError> {
        let query = [
            ("shop_id", shop_id.to_string()),
            ("time_from", time_from.to_string()),
            ("time_to", time_to.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        self.get_json("get_order_list", ORDER_LIST_PATH, &query).await
    }

    #[instrument(skip(self, order_sns), fields(orders = order_sns.len()))]
    async fn order_details(
        &self,
        shop_id: &str,
        order_sns: &[String],
    ) -> Result<ShopeeOrderDetail, MarketplaceError> {
        let query = [
            ("shop_id", shop_id.to_string()),
            ("order_sn_list", order_sns.join(",")),
        ];
        self.get_json("get_order_detail", ORDER_DETAIL_PATH, &query).await
    }
}
