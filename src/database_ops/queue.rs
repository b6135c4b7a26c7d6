//! Postgres-backed job queue (`sync_jobs`).
//!
//! Workers claim with `FOR UPDATE SKIP LOCKED`, so any number of worker
//! processes can share the table. Redelivery lives here: a failed job is
//! re-queued with a linear backoff until it runs out of attempts.
use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub kind: String,
    pub payload: Value,
    pub attempts: i32,
    pub max_attempts: i32,
}

#[instrument(skip(pool, payload))]
pub async fn enqueue(pool: &PgPool, kind: &str, payload: &Value, max_attempts: i32) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO sync_jobs (kind, payload, max_attempts) VALUES ($1, $2, $3) RETURNING id",
    )
    .persistent(false)
    .bind(kind)
    .bind(payload)
    .bind(max_attempts.max(1))
    .fetch_one(pool)
    .await
    .context("failed to enqueue job")?;
    debug!(job_id = id, kind, "job enqueued");
    Ok(id)
}

/// Claims the oldest runnable job of one of `kinds`.
///
/// A `running` row whose lock is older than `lease` belonged to a worker that
/// died mid-job; it is claimed again if it has attempts left, otherwise it is
/// closed out as `failed`.
pub async fn claim_next(
    pool: &PgPool,
    worker_id: &str,
    kinds: &[String],
    lease: Duration,
) -> Result<Option<JobRow>> {
    let lease_secs = lease.as_secs_f64();
    let mut tx = pool.begin().await?;

    let expired = sqlx::query(
        "UPDATE sync_jobs \
         SET status='failed', finished_at=now(), locked_at=NULL, locked_by=NULL, \
             last_error=COALESCE(last_error, 'lease expired'), updated_at=now() \
         WHERE status='running' AND kind = ANY($1) AND attempts >= max_attempts \
           AND locked_at < now() - make_interval(secs => $2)",
    )
    .persistent(false)
    .bind(kinds)
    .bind(lease_secs)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if expired > 0 {
        warn!(expired, "closed out abandoned jobs with no attempts left");
    }

    let rec = sqlx::query(
        "SELECT id, kind, payload, attempts, max_attempts, status FROM sync_jobs \
         WHERE kind = ANY($1) AND ( \
               (status='queued' AND scheduled_at <= now()) \
            OR (status='running' AND locked_at < now() - make_interval(secs => $2)) \
         ) \
         ORDER BY scheduled_at ASC, id ASC \
         FOR UPDATE SKIP LOCKED LIMIT 1",
    )
    .persistent(false)
    .bind(kinds)
    .bind(lease_secs)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = rec else {
        tx.commit().await?;
        return Ok(None);
    };
    let id: i64 = row.try_get("id")?;
    let previous: String = row.try_get("status")?;
    if previous == "running" {
        warn!(job_id = id, worker_id, "reclaiming job with expired lease");
    }
    sqlx::query(
        "UPDATE sync_jobs \
         SET status='running', locked_at=now(), locked_by=$2, attempts=attempts+1, \
             started_at=COALESCE(started_at, now()), updated_at=now() \
         WHERE id=$1",
    )
    .persistent(false)
    .bind(id)
    .bind(worker_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Some(JobRow {
        id,
        kind: row.try_get("kind")?,
        payload: row.try_get("payload")?,
        attempts: row.try_get::<i32, _>("attempts")? + 1,
        max_attempts: row.try_get("max_attempts")?,
    }))
}

pub async fn complete(pool: &PgPool, id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE sync_jobs SET status='done', finished_at=now(), updated_at=now(), last_error=NULL \
         WHERE id=$1",
    )
    .persistent(false)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Records a failure. The job goes back to `queued` after `attempts * 60s`
/// unless it has used up `max_attempts`, in which case it ends as `failed`.
pub async fn fail(pool: &PgPool, id: i64, err: &str) -> Result<()> {
    sqlx::query(
        "UPDATE sync_jobs \
         SET status=CASE WHEN attempts < max_attempts THEN 'queued' ELSE 'failed' END, \
             finished_at=CASE WHEN attempts >= max_attempts THEN now() ELSE NULL END, \
             scheduled_at=CASE WHEN attempts < max_attempts THEN now() + make_interval(secs => (attempts*60)) ELSE scheduled_at END, \
             locked_at=NULL, locked_by=NULL, last_error=$2, updated_at=now() \
         WHERE id=$1",
    )
    .persistent(false)
    .bind(id)
    .bind(err)
    .execute(pool)
    .await?;
    Ok(())
}
