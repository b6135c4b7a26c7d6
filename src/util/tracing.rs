use tracing_subscriber::{fmt::format::FmtSpan, fmt::SubscriberBuilder, EnvFilter};

use crate::util::env::env_flag;

/// Installs the global fmt subscriber shared by every binary.
///
/// `default_filter` applies when `RUST_LOG` is unset. `LOG_SPAN_TIMINGS=1`
/// emits a line when each instrumented span closes (job, marketplace call,
/// bulk insert) with its busy/idle time.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let span_events = if env_flag("LOG_SPAN_TIMINGS", false) {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
