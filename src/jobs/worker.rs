//! Queue worker: claims `sync_jobs` rows and feeds them to the order sync handler.
use anyhow::{anyhow, Result};
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    task::{self, JoinSet},
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use super::{OrderSyncHandler, SyncSummary, SYNC_ORDERS_KIND};
use crate::database_ops::queue::{self, JobRow};
use crate::util::env::{env_opt, env_parse};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    /// How long a `running` job may stay locked before another worker reclaims it.
    pub lease: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("pid-{}", std::process::id()),
            concurrency: 10,
            poll_interval: Duration::from_secs(2),
            error_backoff: Duration::from_secs(5),
            lease: Duration::from_secs(900),
        }
    }
}

impl WorkerConfig {
    /// Reads `WORKER_ID`, `WORKER_CONCURRENCY`, `WORKER_POLL_INTERVAL_SECS`,
    /// `WORKER_ERROR_BACKOFF_SECS`, `WORKER_LEASE_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            worker_id: env_opt("WORKER_ID").unwrap_or(defaults.worker_id),
            concurrency: env_parse("WORKER_CONCURRENCY", defaults.concurrency).max(1),
            poll_interval: Duration::from_secs(
                env_parse("WORKER_POLL_INTERVAL_SECS", defaults.poll_interval.as_secs()).max(1),
            ),
            error_backoff: Duration::from_secs(env_parse(
                "WORKER_ERROR_BACKOFF_SECS",
                defaults.error_backoff.as_secs(),
            )),
            lease: Duration::from_secs(
                env_parse("WORKER_LEASE_SECS", defaults.lease.as_secs()).max(1),
            ),
        }
    }

    /// Pool size default: two connections per job slot, at least five.
    pub fn default_pool_size(&self) -> u32 {
        u32::try_from(self.concurrency)
            .unwrap_or(u32::MAX)
            .saturating_mul(2)
            .max(5)
    }
}

/// Routes a claimed job to its handler by kind.
pub async fn process_job(handler: &OrderSyncHandler, job: &JobRow) -> Result<SyncSummary> {
    match job.kind.as_str() {
        SYNC_ORDERS_KIND => Ok(handler.handle(&job.payload).await?),
        other => Err(anyhow!("unsupported job kind {other:?}")),
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(e) = res {
                            warn!(error = %e, "failed to listen for ctrl-c");
                        }
                    }
                    _ = term.recv() => info!("received SIGTERM"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
    }
}

/// Records a crashed job task as a failed attempt so the queue can redeliver it.
async fn reap(
    pool: &PgPool,
    in_flight: &mut HashMap<task::Id, i64>,
    res: Result<(task::Id, ()), task::JoinError>,
) {
    match res {
        Ok((task_id, ())) => {
            in_flight.remove(&task_id);
        }
        Err(join_err) => {
            let job_id = in_flight.remove(&join_err.id());
            error!(job_id = ?job_id, error = %join_err, "worker task panicked");
            if let Some(job_id) = job_id {
                let reason = format!("task panicked: {join_err}");
                if let Err(db_err) = queue::fail(pool, job_id, &reason).await {
                    error!(job_id, error = %db_err, "failed to record job failure");
                }
            }
        }
    }
}

/// Claims and runs jobs until Ctrl-C or SIGTERM, then waits for in-flight jobs to finish.
pub async fn run(pool: PgPool, handler: Arc<OrderSyncHandler>, config: WorkerConfig) -> Result<()> {
    let worker_id = Arc::new(config.worker_id.clone());
    let kinds = vec![SYNC_ORDERS_KIND.to_string()];

    info!(
        worker_id = %worker_id,
        concurrency = config.concurrency,
        poll_secs = config.poll_interval.as_secs(),
        lease_secs = config.lease.as_secs(),
        "order sync worker started"
    );

    let mut set: JoinSet<()> = JoinSet::new();
    let mut in_flight: HashMap<task::Id, i64> = HashMap::new();
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        while set.len() < config.concurrency {
            match queue::claim_next(&pool, worker_id.as_str(), &kinds, config.lease).await {
                Ok(Some(job)) => {
                    let job_id = job.id;
                    let pool = pool.clone();
                    let handler = handler.clone();
                    let worker_id = worker_id.clone();
                    let handle = set.spawn(async move {
                        info!(
                            job_id = job.id,
                            kind = %job.kind,
                            attempt = job.attempts,
                            max_attempts = job.max_attempts,
                            worker = %worker_id,
                            "processing job"
                        );
                        match process_job(&handler, &job).await {
                            Ok(summary) => match queue::complete(&pool, job.id).await {
                                Ok(()) => info!(
                                    job_id = job.id,
                                    orders = summary.orders_inserted,
                                    items = summary.items_inserted,
                                    more_available = summary.more_available,
                                    "job completed"
                                ),
                                Err(db_err) => {
                                    error!(job_id = job.id, error = %db_err, "failed to mark job complete")
                                }
                            },
                            Err(err) => {
                                error!(job_id = job.id, kind = %job.kind, error = %err, "job failed");
                                if let Err(db_err) = queue::fail(&pool, job.id, &format!("{err:#}")).await {
                                    error!(job_id = job.id, error = %db_err, "failed to record job failure");
                                }
                            }
                        }
                    });
                    in_flight.insert(handle.id(), job_id);
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "error claiming job; backing off");
                    tokio::time::sleep(config.error_backoff).await;
                    break;
                }
            }
        }

        tokio::select! {
            Some(res) = set.join_next_with_id(), if !set.is_empty() => {
                reap(&pool, &mut in_flight, res).await;
            }
            _ = ticker.tick() => {
                if set.is_empty() {
                    debug!(worker_id = %worker_id, "idle tick");
                }
            }
            () = &mut shutdown => {
                info!(in_flight = set.len(), "shutdown requested; draining in-flight jobs");
                break;
            }
        }
    }

    while let Some(res) = set.join_next_with_id().await {
        reap(&pool, &mut in_flight, res).await;
    }
    info!("order sync worker stopped");
    Ok(())
}
