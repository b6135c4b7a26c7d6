use thiserror::Error;

use crate::marketplace::MarketplaceError;

/// Everything that can end an `order:sync` job. None of these are retried by
/// the handler itself; redelivery is up to the queue.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid {field} {value:?}: {source}")]
    InvalidIdentifier {
        field: &'static str,
        value: String,
        #[source]
        source: uuid::Error,
    },

    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),

    #[error("insert into {table} failed: {source}")]
    Persistence {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },
}
