use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use order_sync::database_ops::db::Db;
use order_sync::jobs::worker::{self, WorkerConfig};
use order_sync::jobs::OrderSyncHandler;
use order_sync::marketplace::ShopeeProvider;
use order_sync::util::env::{self as env_util, STORE_URL_KEYS};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    env_util::init_env();
    order_sync::util::tracing::init_tracing("info,sqlx=warn")?;
    env_util::bootstrap_cli("order-sync");

    // Missing store credentials are fatal before anything else starts.
    env_util::preflight_check(
        "order-sync",
        &[&STORE_URL_KEYS[..]],
        &[
            "SUPABASE_DB_URL",
            "DATABASE_URL",
            "QUEUE_DATABASE_URL",
            "SHOPEE_BASE_URL",
            "WORKER_CONCURRENCY",
            "WORKER_LEASE_SECS",
        ],
    )?;

    let config = WorkerConfig::from_env();
    let max_connections: u32 =
        env_util::env_parse("DB_MAX_CONNECTIONS", config.default_pool_size());

    let store_url = env_util::db_url_prefer_session()?;
    let store = Db::connect(&store_url, max_connections)
        .await
        .context("connecting to order store")?;

    let queue_pool = if env_util::env_opt("QUEUE_DATABASE_URL").is_some() {
        let queue_url = env_util::queue_db_url()?;
        Db::connect(&queue_url, max_connections)
            .await
            .context("connecting to job queue")?
            .pool
    } else {
        store.pool.clone()
    };

    let marketplace = ShopeeProvider::from_env()?;
    info!(base_url = marketplace.base_url(), "marketplace client ready");

    let handler = Arc::new(OrderSyncHandler::new(
        Arc::new(marketplace),
        Arc::new(store),
    ));

    worker::run(queue_pool, handler, config).await
}
