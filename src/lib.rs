pub mod adapter;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod heartbeat;
pub mod metrics;
pub mod models;
pub mod redaction;
pub mod sink;

pub use adapter::MonitoringAdapter;
pub use config::MonitorConfig;
pub use error::MonitorError;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// Note: This function can only be called once. `json` switches the console
/// output to one JSON object per line.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
