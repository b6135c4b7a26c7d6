//! `order:sync` job: payload, handler, and the queue worker that drives it.
pub mod error;
pub mod handler;
pub mod payload;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use error::SyncError;
pub use handler::{OrderSyncHandler, SyncSummary};
pub use payload::SyncOrderPayload;

/// Queue kind for order sync jobs.
pub const SYNC_ORDERS_KIND: &str = "order:sync";
