pub mod database_ops;
pub mod jobs;
pub mod marketplace;
pub mod reconcile;

pub mod util {
    pub mod env;
    pub mod tracing;
}
