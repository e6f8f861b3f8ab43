//! Logging setup utilities for the Agora binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers both the library crate that owns the binary and the
/// binary itself. The level can be overridden using the `RUST_LOG` environment
/// variable.
///
/// # Arguments
///
/// * `crate_name` - The library crate to enable (e.g., "agora_client")
/// * `binary_name` - The name of the binary (e.g., "agora-chat")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn")
///
/// # Examples
///
/// ```no_run
/// use agora_shared::logger::setup_logger;
///
/// setup_logger("agora_client", "agora-chat", "info");
/// ```
pub fn setup_logger(crate_name: &str, binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(crate_name, binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build the fallback filter directive used when `RUST_LOG` is not set.
fn default_filter(crate_name: &str, binary_name: &str, default_log_level: &str) -> String {
    format!(
        "{}={},{}={}",
        crate_name.replace('-', "_"),
        default_log_level,
        binary_name.replace('-', "_"),
        default_log_level
    )
}
