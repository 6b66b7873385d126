//! Logging and tracing infrastructure for irtree.
//!
//! The library itself only emits `tracing` events (mostly at debug/trace
//! level on mutation paths). Applications and tests opt into output through
//! the initializers here.

use std::sync::Once;
use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

fn env_filter() -> EnvFilter {
    env_filter_or(&LoggingConfig::default().filter)
}

fn env_filter_or(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Initialize the global tracing subscriber.
///
/// This should be called once at program startup.
/// Subsequent calls are ignored.
pub fn init_tracing() {
    INIT.call_once(|| {
        let fmt_layer = fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        // try_init: a test harness may already have installed a subscriber
        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer)
            .try_init();

        info!("irtree tracing initialized");
    });
}

/// Initialize tracing with JSON output for structured logging.
pub fn init_tracing_json() {
    INIT.call_once(|| {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true);

        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer)
            .try_init();

        info!("irtree tracing initialized (JSON mode)");
    });
}

/// Initialize tracing from configuration. `RUST_LOG` still wins over
/// `config.filter` when set.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(env_filter_or(&config.filter));
        let result = if config.json {
            registry.with(fmt::layer().json().with_target(true)).try_init()
        } else {
            registry.with(fmt::layer().with_target(true)).try_init()
        };
        if let Err(e) = result {
            debug!(error = %e, "tracing subscriber already installed");
        }
        info!(json = config.json, filter = %config.filter, "irtree tracing initialized");
    });
}

/// Macro for creating spans around index-heavy operations
#[macro_export]
macro_rules! span_trace {
    ($name:expr) => {
        tracing::debug_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::debug_span!($name, $($field)*)
    };
}

/// Macro for logging and returning errors
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {{
        let e = $err;
        tracing::debug!(error = %e, "Operation failed");
        e
    }};
    ($err:expr, $msg:expr) => {{
        let e = $err;
        tracing::debug!(error = %e, message = $msg, "Operation failed");
        e
    }};
}
