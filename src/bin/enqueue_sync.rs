use anyhow::{Context, Result};
use clap::Parser;
use order_sync::database_ops::queue::{self, DEFAULT_MAX_ATTEMPTS};
use order_sync::jobs::{SyncOrderPayload, SYNC_ORDERS_KIND};
use order_sync::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "enqueue_sync", version, about = "Queue an order:sync job for one shop")]
struct Args {
    /// Owning user (UUID).
    #[arg(long)]
    user_id: String,
    /// Shop to sync (UUID).
    #[arg(long)]
    shop_id: String,
    #[arg(long, default_value = "Shopee")]
    channel: String,
    /// Window start, passed to the marketplace as-is.
    #[arg(long)]
    time_from: String,
    /// Window end, passed to the marketplace as-is.
    #[arg(long)]
    time_to: String,
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    order_sync::util::tracing::init_tracing("info,sqlx=warn")?;
    env_util::bootstrap_cli("enqueue_sync");
    let args = Args::parse();

    let payload = SyncOrderPayload {
        user_id: args.user_id,
        channel: args.channel,
        shop_id: args.shop_id,
        time_from: args.time_from,
        time_to: args.time_to,
    };
    // Refuse to queue a job the worker would reject.
    payload.validate()?;

    let db_url = env_util::queue_db_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&db_url)
        .await
        .context("connecting to job queue")?;

    let body = serde_json::to_value(&payload)?;
    let id = queue::enqueue(&pool, SYNC_ORDERS_KIND, &body, args.max_attempts).await?;
    println!("Enqueued {SYNC_ORDERS_KIND} job {id} for shop {}", payload.shop_id);
    Ok(())
}
