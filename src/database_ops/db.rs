use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool, QueryBuilder,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

use super::OrderSink;
use crate::reconcile::{Order, OrderItem};
use crate::util::env::env_flag;

// Postgres caps a statement at 65535 bind parameters; stay well below it.
const MAX_ROWS_PER_INSERT: usize = 1000;

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options =
            PgConnectOptions::from_str(database_url).context("invalid database URL")?;

        if database_url.contains("sslmode=require") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        if !env_flag("USE_PREPARED", false) {
            // PgBouncer txn mode safe
            connect_options = connect_options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await
            .context("failed to connect to database")?;
        info!("connected to db");

        // Off by default: production schemas are owned by the dashboard's migrations.
        if env_flag("AUTO_MIGRATE", false) {
            info!("running migrations (AUTO_MIGRATE=on)");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to apply migrations")?;
        } else {
            info!("AUTO_MIGRATE disabled; skipping migrations");
        }
        Ok(Self { pool })
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn bulk_insert_orders(&self, rows: &[Order]) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for chunk in rows.chunks(MAX_ROWS_PER_INSERT) {
            let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(
                "INSERT INTO orders (id, user_id, shop_id, channel, external_order_id, status, customer_name, customer_address, customer_phone, total_price, currency) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(r.id)
                    .push_bind(r.user_id)
                    .push_bind(r.shop_id)
                    .push_bind(&r.channel)
                    .push_bind(&r.external_order_id)
                    .push_bind(&r.status)
                    .push_bind(&r.customer_name)
                    .push_bind(&r.customer_address)
                    .push_bind(&r.customer_phone)
                    .push_bind(r.total_price)
                    .push_bind(&r.currency);
            });
            inserted += qb
                .build()
                .persistent(false)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        info!(inserted, "inserted orders");
        Ok(inserted)
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn bulk_insert_order_items(&self, rows: &[OrderItem]) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for chunk in rows.chunks(MAX_ROWS_PER_INSERT) {
            let mut qb: QueryBuilder<'_, sqlx::Postgres> =
                QueryBuilder::new("INSERT INTO order_items (order_id, sku, name, quantity, price) ");
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(r.order_id)
                    .push_bind(&r.sku)
                    .push_bind(&r.name)
                    .push_bind(r.quantity)
                    .push_bind(r.price);
            });
            inserted += qb
                .build()
                .persistent(false)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        info!(inserted, "inserted order items");
        Ok(inserted)
    }
}

#[async_trait]
impl OrderSink for Db {
    async fn insert_orders(&self, rows: &[Order]) -> Result<u64, sqlx::Error> {
        self.bulk_insert_orders(rows).await
    }

    async fn insert_order_items(&self, rows: &[OrderItem]) -> Result<u64, sqlx::Error> {
        self.bulk_insert_order_items(rows).await
    }
}
